//! Collector configuration.
//!
//! The default lists are the probe set shipped with the library; callers
//! (mostly tests) can point any list at other paths.

use std::path::PathBuf;

use crate::drm::WIDEVINE_UUID;

/// Core hardware and kernel artifacts.
pub const HARDWARE_FILES: &[&str] = &[
    "/proc/cpuinfo",
    "/proc/version",
    "/proc/meminfo",
    "/proc/iomem",
    "/proc/misc",
    "/sys/devices/soc0/family",
    "/sys/devices/soc0/machine",
    "/sys/class/power_supply/battery/capacity",
    "/sys/class/power_supply/battery/status",
];

/// Environment and security nodes.
pub const ENVIRONMENT_FILES: &[&str] = &[
    "/proc/sys/kernel/random/boot_id",
    "/proc/sys/kernel/osrelease",
    "/sys/fs/selinux/enforce",
    "/proc/sys/kernel/random/entropy_avail",
    "/proc/uptime",
    "/sys/class/thermal/thermal_zone0/temp",
    "/proc/sys/vm/overcommit_memory",
];

/// Mount points and input devices.
pub const MOUNT_FILES: &[&str] = &[
    "/proc/self/mountinfo",
    "/proc/mounts",
    "/proc/filesystems",
    "/proc/bus/input/devices",
    "/proc/net/unix",
];

pub const SELINUX_ENFORCE_PATH: &str = "/sys/fs/selinux/enforce";

/// Trimmed content longer than this many characters is truncated.
pub const DEFAULT_CONTENT_CAP: usize = 2048;

pub const DEFAULT_NON_SYSTEM_LIMIT: usize = 20;

/// How a file fingerprint is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Open the path from this process.
    #[default]
    Direct,
    /// Run `cat <path>` and merge stderr into the content.
    Shell,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub hardware_files: Vec<PathBuf>,
    pub environment_files: Vec<PathBuf>,
    pub mount_files: Vec<PathBuf>,
    pub selinux_enforce_path: PathBuf,
    pub maps_path: PathBuf,
    pub content_cap: usize,
    pub non_system_limit: usize,
    pub read_mode: ReadMode,
    pub drm_scheme: [u8; 16],
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            hardware_files: paths(HARDWARE_FILES),
            environment_files: paths(ENVIRONMENT_FILES),
            mount_files: paths(MOUNT_FILES),
            selinux_enforce_path: PathBuf::from(SELINUX_ENFORCE_PATH),
            maps_path: PathBuf::from("/proc/self/maps"),
            content_cap: DEFAULT_CONTENT_CAP,
            non_system_limit: DEFAULT_NON_SYSTEM_LIMIT,
            read_mode: ReadMode::Direct,
            drm_scheme: WIDEVINE_UUID,
        }
    }
}

/// Android log backend settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub tag: &'static str,
    pub max_level: log::LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            tag: "sphunter",
            max_level: log::LevelFilter::Info,
        }
    }
}
