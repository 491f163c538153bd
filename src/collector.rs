//! Report aggregation.
//!
//! [`FingerprintCollector`] runs every sub-collector in a fixed order and
//! concatenates their sections. Each section runs under `catch_unwind`; a
//! panicking section is logged and replaced by an inline `Error:` line, and
//! the remaining sections still run.

use std::fs;
use std::panic::{self, AssertUnwindSafe};

use crate::config::CollectorConfig;
use crate::digest::IdentityDigest;
use crate::drm::{read_drm_id, DrmBackend, DrmDeviceId, MediaDrm};
use crate::error::panic_message;
use crate::files::collect_group;
use crate::kernel::{collect_kernel_info, collect_system_config};
use crate::maps::{collect_injection_report, ModuleScan};
use crate::net::{get_primary_mac, log_interfaces, InterfaceSource, SystemInterfaces, MAC_FAILURE};
use crate::props::{collect_build_info, get_property, PropertySource, SystemProperties, ABSENT};
use crate::report::section_header;

/// Inputs to the identity digest, in hashing order.
const DIGEST_PROPS: &[&str] = &[
    "ro.build.fingerprint",
    "ro.product.build.fingerprint",
    "ro.vendor.build.fingerprint",
];

/// A device-state marker derived from values the report already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTag {
    UsbDebugEnabled,
    BootloaderUnlocked,
    DebuggableBuild,
    InsecureBuild,
    SelinuxPermissive,
    InjectionDetected,
}

impl RiskTag {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTag::UsbDebugEnabled => "USB_DEBUG_ENABLED",
            RiskTag::BootloaderUnlocked => "BOOTLOADER_UNLOCKED",
            RiskTag::DebuggableBuild => "DEBUGGABLE_BUILD",
            RiskTag::InsecureBuild => "INSECURE_BUILD",
            RiskTag::SelinuxPermissive => "SELINUX_PERMISSIVE",
            RiskTag::InjectionDetected => "INJECTION_DETECTED",
        }
    }
}

/// Derive risk tags. `selinux_enforce` is the trimmed content of the
/// enforce node, `None` when it could not be read.
pub fn evaluate_risk(
    props: &dyn PropertySource,
    selinux_enforce: Option<&str>,
    scan: Option<&ModuleScan>,
) -> Vec<RiskTag> {
    let mut tags = Vec::new();

    if get_property(props, "sys.usb.config", None).contains("adb") {
        tags.push(RiskTag::UsbDebugEnabled);
    }
    let flash_locked = get_property(props, "ro.boot.flash.locked", None);
    if flash_locked != ABSENT && flash_locked != "1" {
        tags.push(RiskTag::BootloaderUnlocked);
    }
    if get_property(props, "ro.debuggable", None) == "1" {
        tags.push(RiskTag::DebuggableBuild);
    }
    if get_property(props, "ro.secure", None) == "0" {
        tags.push(RiskTag::InsecureBuild);
    }
    if selinux_enforce == Some("0") {
        tags.push(RiskTag::SelinuxPermissive);
    }
    if scan.is_some_and(ModuleScan::is_injected) {
        tags.push(RiskTag::InjectionDetected);
    }
    tags
}

pub fn format_risk_tags(tags: &[RiskTag]) -> String {
    let mut out = String::from("\n");
    out.push_str(&section_header("Risk Tags"));
    if tags.is_empty() {
        out.push_str("[None]\n");
    }
    for tag in tags {
        out.push_str(tag.as_str());
        out.push('\n');
    }
    out
}

/// Run `f`, containing a panic. On panic the message is logged and written
/// to `out` as `\nError: <msg>\n`.
fn guarded<T>(out: &mut String, section: &str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            log::error!("Error in {}: {}", section, msg);
            out.push_str(&format!("\nError: {}\n", msg));
            None
        }
    }
}

fn push_guarded(out: &mut String, section: &str, f: impl FnOnce() -> String) {
    if let Some(text) = guarded(out, section, f) {
        out.push_str(&text);
    }
}

/// Values later sections derive from.
#[derive(Default)]
struct Collected {
    drm_id: Option<DrmDeviceId>,
    scan: Option<ModuleScan>,
}

pub struct FingerprintCollector {
    config: CollectorConfig,
    properties: Box<dyn PropertySource>,
    drm: Box<dyn DrmBackend>,
    interfaces: Box<dyn InterfaceSource>,
}

impl Default for FingerprintCollector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl FingerprintCollector {
    /// Collector over the live device.
    pub fn new(config: CollectorConfig) -> Self {
        Self::with_backends(
            config,
            Box::new(SystemProperties),
            Box::new(MediaDrm),
            Box::new(SystemInterfaces),
        )
    }

    pub fn with_backends(
        config: CollectorConfig,
        properties: Box<dyn PropertySource>,
        drm: Box<dyn DrmBackend>,
        interfaces: Box<dyn InterfaceSource>,
    ) -> Self {
        FingerprintCollector {
            config,
            properties,
            drm,
            interfaces,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Full report: build info, DRM, interface logging, file collection,
    /// risk tags and the identity digest. Never panics.
    pub fn collect_all(&self) -> String {
        self.collect("System Properties", true)
    }

    /// Same report without interface logging, under its own header.
    ///
    /// The digest still needs the primary MAC, so interfaces are enumerated
    /// (with per-interface info logs) and `SIOCGIFHWADDR` probes may run when
    /// enumeration finds no hardware address.
    pub fn collect_native(&self) -> String {
        self.collect("Native Build Info", false)
    }

    /// Device MAC, or [`MAC_FAILURE`].
    pub fn primary_mac(&self) -> String {
        panic::catch_unwind(AssertUnwindSafe(|| get_primary_mac(self.interfaces.as_ref())))
            .unwrap_or_else(|payload| {
                log::error!("Error getting MAC address: {}", panic_message(payload.as_ref()));
                MAC_FAILURE.to_string()
            })
    }

    fn collect(&self, title: &str, with_interfaces: bool) -> String {
        let mut out = String::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.collect_into(&mut out, title, with_interfaces)
        }));
        if let Err(payload) = result {
            let msg = panic_message(payload.as_ref());
            log::error!("Error collecting fingerprints: {}", msg);
            out.push_str(&format!("\nError: {}\n", msg));
        }
        out
    }

    fn collect_into(&self, out: &mut String, title: &str, with_interfaces: bool) {
        let mut collected = Collected::default();
        out.push_str(&section_header(title));

        push_guarded(out, "build info", || collect_build_info(self.properties.as_ref()));

        if let Some((text, id)) = guarded(out, "DRM", || {
            read_drm_id(self.drm.as_ref(), &self.config.drm_scheme)
        }) {
            out.push_str(&text);
            collected.drm_id = id;
        }

        if with_interfaces {
            guarded(out, "network interfaces", || log_interfaces(self.interfaces.as_ref()));
        }

        self.collect_files(out, &mut collected);

        push_guarded(out, "risk tags", || {
            let enforce = fs::read_to_string(&self.config.selinux_enforce_path).ok();
            let enforce = enforce.as_deref().map(str::trim);
            format_risk_tags(&evaluate_risk(
                self.properties.as_ref(),
                enforce,
                collected.scan.as_ref(),
            ))
        });

        push_guarded(out, "digest", || self.identity_digest(&collected).format());
    }

    fn collect_files(&self, out: &mut String, collected: &mut Collected) {
        let cfg = &self.config;
        let groups = [
            ("Hardware & Kernel", &cfg.hardware_files),
            ("Environment & Security", &cfg.environment_files),
            ("Mounts & Inputs", &cfg.mount_files),
        ];
        for (title, paths) in groups {
            push_guarded(out, title, || {
                collect_group(title, paths.as_slice(), cfg.read_mode, cfg.content_cap)
            });
        }

        push_guarded(out, "uname", collect_kernel_info);
        push_guarded(out, "sysconf", collect_system_config);

        if let Some((text, scan)) = guarded(out, "injection scan", || {
            collect_injection_report(&cfg.maps_path, cfg.non_system_limit)
        }) {
            out.push_str(&text);
            collected.scan = scan;
        }
    }

    fn identity_digest(&self, collected: &Collected) -> IdentityDigest {
        let mut digest = IdentityDigest::new();
        for &key in DIGEST_PROPS {
            let value = get_property(self.properties.as_ref(), key, None);
            if value != ABSENT {
                digest.add(key, value);
            }
        }
        if let Some(id) = &collected.drm_id {
            digest.add("drm.deviceUniqueId", &id.raw);
        }
        let mac = self.primary_mac();
        if mac != MAC_FAILURE {
            digest.add("mac", mac);
        }
        digest
    }
}
