//! System property reader and the build-info sections built from it.

use std::collections::HashMap;

use crate::report::section_header;

/// Rendered in place of a missing property when no default is given.
pub const ABSENT: &str = "null";

/// A key/value property store.
pub trait PropertySource {
    /// Raw lookup. `None` and `Some("")` are both treated as absent.
    fn get(&self, key: &str) -> Option<String>;
}

/// The platform property store (`__system_property_get`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProperties;

#[cfg(target_os = "android")]
impl PropertySource for SystemProperties {
    fn get(&self, key: &str) -> Option<String> {
        let c_key = std::ffi::CString::new(key).ok()?;
        let mut value = [0 as libc::c_char; libc::PROP_VALUE_MAX as usize];
        let len = unsafe { libc::__system_property_get(c_key.as_ptr(), value.as_mut_ptr()) };
        if len <= 0 {
            return None;
        }
        let value = unsafe { std::ffi::CStr::from_ptr(value.as_ptr()) };
        Some(value.to_string_lossy().into_owned())
    }
}

#[cfg(not(target_os = "android"))]
impl PropertySource for SystemProperties {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

impl PropertySource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Read `key`, falling back to `default`, or to `"null"` when no default is given.
pub fn get_property(source: &dyn PropertySource, key: &str, default: Option<&str>) -> String {
    match source.get(key) {
        Some(value) if !value.is_empty() => value,
        _ => default.unwrap_or(ABSENT).to_string(),
    }
}

/// Partitions that carry their own copy of the build properties, in print order.
const PARTITIONS: &[&str] = &[
    "build",
    "bootimage",
    "odm",
    "product",
    "system_ext",
    "system",
    "vendor",
];

const SECURITY_PROPS: &[&str] = &[
    "ro.debuggable",
    "init.svc.adbd",
    "ro.secure",
    "ro.boot.flash.locked",
    "sys.oem_unlock_allowed",
];

const OTHER_SYSTEM_INFO_PROPS: &[&str] = &[
    "ro.boot.vbmeta.digest",
    "ro.netflix.bsp_rev",
    "gsm.version.baseband",
];

const BUILD_HOST_PROPS: &[&str] = &[
    "ro.build.host",
    "ro.build.user",
    "ro.config.ringtone",
    "ro.miui.ui.version.name",
];

const OTHER_SYSTEM_PROPS: &[&str] = &[
    "ro.board.platform",
    "ro.product.cpu.abi",
    "ro.boot.verifiedbootstate",
    "ro.boot.vbmeta.device_state",
    "ro.treble.enabled",
];

const USB_PROPS: &[&str] = &[
    "sys.usb.config",
    "sys.usb.state",
    "persist.sys.usb.config",
    "persist.sys.usb.qmmi.func",
];

/// Printed only when the device defines them.
const USB_OPTIONAL_PROPS: &[&str] = &["vendor.usb.mimode", "persist.vendor.usb.config"];

/// `ro.build.<suffix>` followed by `ro.<partition>.build.<suffix>` for every partition.
fn partitioned_keys(suffix: &str) -> Vec<String> {
    std::iter::once(format!("ro.build.{suffix}"))
        .chain(PARTITIONS.iter().map(|p| format!("ro.{p}.build.{suffix}")))
        .collect()
}

fn push_line(out: &mut String, source: &dyn PropertySource, key: &str) {
    out.push_str(key);
    out.push_str(" = ");
    out.push_str(&get_property(source, key, None));
    out.push('\n');
}

fn push_section<K: AsRef<str>>(
    out: &mut String,
    source: &dyn PropertySource,
    title: &str,
    keys: &[K],
) {
    out.push('\n');
    out.push_str(&section_header(title));
    for key in keys {
        push_line(out, source, key.as_ref());
    }
}

fn collect_usb_config(out: &mut String, source: &dyn PropertySource) {
    out.push_str(&section_header("USB Config"));
    for key in USB_PROPS {
        push_line(out, source, key);
    }
    for key in USB_OPTIONAL_PROPS {
        let value = get_property(source, key, None);
        if value != ABSENT {
            out.push_str(&format!("{key} = {value}\n"));
        }
    }
}

/// All build-info sections, in report order.
pub fn collect_build_info(source: &dyn PropertySource) -> String {
    let mut out = String::new();

    collect_usb_config(&mut out, source);
    push_section(&mut out, source, "Security", SECURITY_PROPS);
    push_section(&mut out, source, "Build ID", &partitioned_keys("id"));
    push_section(&mut out, source, "SDK Version", &["ro.build.version.sdk"]);
    push_section(
        &mut out,
        source,
        "Security Patch",
        &["ro.build.version.security_patch"],
    );
    push_section(&mut out, source, "Other System Info", OTHER_SYSTEM_INFO_PROPS);
    push_section(&mut out, source, "Build Date UTC", &partitioned_keys("date.utc"));

    let mut display_keys = vec!["ro.build.display.id".to_string()];
    display_keys.extend(partitioned_keys("tags"));
    push_section(&mut out, source, "Display ID and Tags", &display_keys);

    push_section(&mut out, source, "Build Host and User", BUILD_HOST_PROPS);
    push_section(
        &mut out,
        source,
        "Build Version Incremental",
        &partitioned_keys("version.incremental"),
    );
    push_section(
        &mut out,
        source,
        "Build Description",
        &["ro.build.description"],
    );
    push_section(
        &mut out,
        source,
        "Build Fingerprint",
        &partitioned_keys("fingerprint"),
    );
    push_section(&mut out, source, "Other System Property", OTHER_SYSTEM_PROPS);

    out
}
