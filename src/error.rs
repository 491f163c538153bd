//! Error type for the fallible steps inside collectors.
//!
//! Collectors themselves never hand these to callers: every failure ends up
//! rendered as text inside the report. The enum exists so the internal
//! plumbing can use `?` and so log lines carry a precise cause.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An address enumeration call (`getifaddrs`) failed.
    #[error("{op} failed (errno: {errno})")]
    Enumeration { op: &'static str, errno: i32 },

    #[error("ioctl(SIOCGIFHWADDR) failed for {interface}: {source}")]
    Ioctl {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("interface {interface} is not Ethernet type (family: {family})")]
    NotEthernet { interface: String, family: u16 },

    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),
}

pub type Result<T> = std::result::Result<T, FingerprintError>;

impl FingerprintError {
    /// Build an `Enumeration` error from the current `errno`.
    pub fn last_os(op: &'static str) -> Self {
        FingerprintError::Enumeration {
            op,
            errno: io::Error::last_os_error().raw_os_error().unwrap_or(0),
        }
    }
}

/// Render a caught panic payload the way collectors print failures.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error occurred".to_string()
    }
}
