//! Native device fingerprint collector for Android.
//!
//! Gathers system properties, the Widevine device unique id, network
//! interface MACs, kernel-exposed files, `uname`/`sysconf` data and an
//! injected-library scan of the process map, and renders them as one text
//! report. The report is served to the app through the JNI natives in
//! [`ffi`]; every collector is also usable directly from Rust.
//!
//! Collection never fails: unreadable files, missing properties and
//! unsupported DRM all become text in the report.

pub mod codec;
pub mod collector;
pub mod config;
pub mod digest;
pub mod drm;
pub mod error;
pub mod ffi;
pub mod files;
pub mod kernel;
pub mod logging;
pub mod maps;
pub mod net;
pub mod props;
pub mod report;

pub use collector::{evaluate_risk, FingerprintCollector, RiskTag};
pub use config::{CollectorConfig, LogConfig, ReadMode};
pub use drm::{read_drm_id, DrmBackend, DrmDeviceId, DrmQuery, MediaDrm};
pub use error::{FingerprintError, Result};
pub use files::{read_fingerprint, FileFingerprint, ProbeStatus};
pub use maps::{scan_modules, ModuleScan};
pub use net::{get_primary_mac, list_interfaces, InterfaceSource, NetworkInterfaceInfo, SystemInterfaces};
pub use props::{get_property, PropertySource, SystemProperties};
pub use report::{parse_sections, Section};
