//! DRM-derived device identity.
//!
//! Opens a MediaDrm session for the Widevine scheme and reads its
//! `deviceUniqueId` property. The id is stable per device and app signer.

use std::panic;

use crate::codec::{to_base64, to_hex};
use crate::error::panic_message;
use crate::report::section_header;

/// Widevine scheme UUID `edef8ba9-79d6-4ace-a3c8-27dcd51d21ed`.
pub const WIDEVINE_UUID: [u8; 16] = [
    0xed, 0xef, 0x8b, 0xa9, 0x79, 0xd6, 0x4a, 0xce, 0xa3, 0xc8, 0x27, 0xdc, 0xd5, 0x1d, 0x21, 0xed,
];

pub const UNSUPPORTED: &str = "Widevine DRM not supported on this device";

/// Outcome of one device-id query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrmQuery {
    /// The scheme or session creation is not available.
    Unsupported,
    DeviceId(Vec<u8>),
    /// The property read returned a non-OK media status.
    Failed(i32),
}

pub trait DrmBackend {
    /// Open a session for `scheme`, read the unique id, release the session.
    fn query_device_id(&self, scheme: &[u8; 16]) -> DrmQuery;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrmDeviceId {
    pub raw: Vec<u8>,
    pub base64: String,
    pub hex: String,
}

impl DrmDeviceId {
    pub fn new(raw: Vec<u8>) -> Self {
        DrmDeviceId {
            base64: to_base64(&raw),
            hex: to_hex(&raw),
            raw,
        }
    }
}

/// NDK MediaDrm.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaDrm;

#[cfg(all(target_os = "android", feature = "drm"))]
mod ndk {
    use std::ffi::CStr;
    use std::os::raw::c_char;

    use super::DrmQuery;

    const AMEDIA_OK: i32 = 0;
    const PROPERTY_DEVICE_UNIQUE_ID: &CStr = c"deviceUniqueId";

    #[repr(C)]
    struct AMediaDrm {
        _private: [u8; 0],
    }

    #[repr(C)]
    struct AMediaDrmByteArray {
        ptr: *const u8,
        length: usize,
    }

    #[link(name = "mediandk")]
    extern "C" {
        fn AMediaDrm_createByUUID(uuid: *const u8) -> *mut AMediaDrm;
        fn AMediaDrm_release(drm: *mut AMediaDrm);
        fn AMediaDrm_isCryptoSchemeSupported(uuid: *const u8, mime_type: *const c_char) -> bool;
        fn AMediaDrm_getPropertyByteArray(
            drm: *mut AMediaDrm,
            property_name: *const c_char,
            property_value: *mut AMediaDrmByteArray,
        ) -> i32;
    }

    /// Owns an `AMediaDrm*`; released on drop, including during unwinding.
    struct Session(*mut AMediaDrm);

    impl Session {
        fn open(scheme: &[u8; 16]) -> Option<Self> {
            let drm = unsafe { AMediaDrm_createByUUID(scheme.as_ptr()) };
            (!drm.is_null()).then_some(Session(drm))
        }
    }

    impl Drop for Session {
        fn drop(&mut self) {
            unsafe { AMediaDrm_release(self.0) };
        }
    }

    pub(super) fn query(scheme: &[u8; 16]) -> DrmQuery {
        let Some(session) = Session::open(scheme) else {
            return DrmQuery::Unsupported;
        };
        if !unsafe { AMediaDrm_isCryptoSchemeSupported(scheme.as_ptr(), std::ptr::null()) } {
            return DrmQuery::Unsupported;
        }

        let mut value = AMediaDrmByteArray {
            ptr: std::ptr::null(),
            length: 0,
        };
        let status = unsafe {
            AMediaDrm_getPropertyByteArray(session.0, PROPERTY_DEVICE_UNIQUE_ID.as_ptr(), &mut value)
        };
        if status != AMEDIA_OK || value.ptr.is_null() || value.length == 0 {
            return DrmQuery::Failed(status);
        }
        // the array is owned by the session; copy before it is released
        let bytes = unsafe { std::slice::from_raw_parts(value.ptr, value.length) }.to_vec();
        DrmQuery::DeviceId(bytes)
    }
}

impl DrmBackend for MediaDrm {
    #[cfg(all(target_os = "android", feature = "drm"))]
    fn query_device_id(&self, scheme: &[u8; 16]) -> DrmQuery {
        ndk::query(scheme)
    }

    #[cfg(not(all(target_os = "android", feature = "drm")))]
    fn query_device_id(&self, _scheme: &[u8; 16]) -> DrmQuery {
        DrmQuery::Unsupported
    }
}

/// Query the backend, containing any panic. The id is returned separately
/// so the caller can feed it into the identity digest.
pub fn read_drm_id(backend: &dyn DrmBackend, scheme: &[u8; 16]) -> (String, Option<DrmDeviceId>) {
    let mut out = String::from("\n");
    out.push_str(&section_header("DRM Info"));

    let query = panic::catch_unwind(panic::AssertUnwindSafe(|| backend.query_device_id(scheme)));
    let query = match query {
        Ok(query) => query,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            log::error!("Exception in DRM query: {}", msg);
            out.push_str(&format!("Exception occurred: {}\n", msg));
            return (out, None);
        }
    };

    match query {
        DrmQuery::Unsupported => {
            log::info!("{}", UNSUPPORTED);
            out.push_str(UNSUPPORTED);
            out.push('\n');
            (out, None)
        }
        DrmQuery::DeviceId(raw) => {
            let id = DrmDeviceId::new(raw);
            out.push_str(&format!("MediaDrm Device Unique ID (Base64): {}\n", id.base64));
            out.push_str(&format!("MediaDrm Device Unique ID (Hex): {}\n", id.hex));
            out.push_str(&format!("Length: {} bytes\n", id.raw.len()));
            (out, Some(id))
        }
        DrmQuery::Failed(status) => {
            log::warn!("MediaDrm deviceUniqueId read failed, status {}", status);
            out.push_str("Failed to get Device Unique ID\n");
            out.push_str(&format!("Status: {}\n", status));
            (out, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(DrmQuery);

    impl DrmBackend for Fixed {
        fn query_device_id(&self, _scheme: &[u8; 16]) -> DrmQuery {
            self.0.clone()
        }
    }

    struct Panicking;

    impl DrmBackend for Panicking {
        fn query_device_id(&self, _scheme: &[u8; 16]) -> DrmQuery {
            panic!("binder died");
        }
    }

    #[test]
    fn test_unsupported() {
        let (out, id) = read_drm_id(&Fixed(DrmQuery::Unsupported), &WIDEVINE_UUID);
        assert_eq!(
            out,
            "\n=== DRM Info ===\nWidevine DRM not supported on this device\n"
        );
        assert!(id.is_none());
    }

    #[test]
    fn test_device_id_renderings() {
        let (out, id) = read_drm_id(&Fixed(DrmQuery::DeviceId(vec![0xFF])), &WIDEVINE_UUID);
        assert!(out.contains("MediaDrm Device Unique ID (Base64): /w==\n"));
        assert!(out.contains("MediaDrm Device Unique ID (Hex): ff\n"));
        assert!(out.contains("Length: 1 bytes\n"));
        assert_eq!(id.unwrap().raw, vec![0xFF]);
    }

    #[test]
    fn test_failed_status() {
        let (out, id) = read_drm_id(&Fixed(DrmQuery::Failed(-10000)), &WIDEVINE_UUID);
        assert!(out.contains("Failed to get Device Unique ID\nStatus: -10000\n"));
        assert!(id.is_none());
    }

    #[test]
    fn test_panic_is_reported() {
        let (out, id) = read_drm_id(&Panicking, &WIDEVINE_UUID);
        assert!(out.contains("Exception occurred: binder died\n"));
        assert!(id.is_none());
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn test_host_backend_is_unsupported() {
        assert_eq!(MediaDrm.query_device_id(&WIDEVINE_UUID), DrmQuery::Unsupported);
    }
}
