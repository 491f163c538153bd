//! Injected-library detection over the process module map.
//!
//! `/proc/self/maps` lines look like
//! `7f8a2c000000-7f8a2c021000 r-xp 00000000 fd:05 1234  /system/lib64/libc.so`.
//! The last space-separated field is taken as the mapped path; a path is a
//! module mapping when it names a `.so` or sits under `/bin/` or `/lib/`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::report::section_header;

/// Mapping prefixes that belong to the platform or to installed apps.
const SYSTEM_PREFIXES: &[&str] = &[
    "/system/",
    "/vendor/",
    "/apex/",
    "/product/",
    "/system_ext/",
    "/odm/",
    "/data/dalvik-cache/",
    "/data/app/",
    "/data/data/",
    "[anon:",
    "[stack]",
    "[vdso]",
    "[vsyscall]",
];

/// Lowercase substrings of known injection frameworks and staging dirs.
const SIGNATURES: &[&str] = &[
    "magisk",
    "zygisk",
    "riru",
    "lsposed",
    "edxposed",
    "xposed",
    "/data/local/tmp/",
    "/data/adb/",
    "/sbin/",
    "/dev/",
];

pub fn is_system_library_path(path: &str) -> bool {
    !path.is_empty() && SYSTEM_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub fn is_suspicious_library_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let lower = path.to_lowercase();
    if SIGNATURES.iter().any(|s| lower.contains(s)) {
        return true;
    }
    // an unrecognised shared object outside every system location
    path.contains(".so") && !is_system_library_path(path) && !path.starts_with('[')
}

fn is_module_path(path: &str) -> bool {
    path.contains(".so") || path.contains("/bin/") || path.contains("/lib/")
}

/// Mapped path of one maps line, if it has one worth looking at.
fn mapped_path(line: &str) -> Option<&str> {
    let (_, path) = line.rsplit_once(' ')?;
    let path = path.trim();
    if path.is_empty() || path.starts_with('[') {
        return None;
    }
    Some(path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleScan {
    pub total_mappings: usize,
    pub library_mappings: usize,
    pub suspicious: Vec<String>,
    /// Leading non-system module paths, at most `non_system_limit` of them.
    pub non_system: Vec<String>,
    pub non_system_limit: usize,
}

impl ModuleScan {
    pub fn is_injected(&self) -> bool {
        !self.suspicious.is_empty()
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "Total Mappings: {}\nLibrary Mappings: {}\nSuspicious Libraries Found: {}\n\n",
            self.total_mappings,
            self.library_mappings,
            self.suspicious.len()
        );

        if self.suspicious.is_empty() {
            out.push_str("No suspicious libraries detected.\n");
        } else {
            out.push_str("Suspicious Libraries:\n");
            for lib in &self.suspicious {
                out.push_str(&format!("  - {}\n", lib));
            }
        }
        out.push('\n');

        out.push_str(&format!(
            "Non-System Libraries (first {}):\n",
            self.non_system_limit
        ));
        if self.non_system.is_empty() {
            out.push_str("  [None found]\n");
        } else {
            for lib in &self.non_system {
                out.push_str(&format!("  - {}\n", lib));
            }
        }
        out.push_str("---\n");
        out
    }
}

/// Single pass over a maps listing.
pub fn scan_modules<R: BufRead>(reader: R, non_system_limit: usize) -> ModuleScan {
    let mut scan = ModuleScan {
        non_system_limit,
        ..ModuleScan::default()
    };

    for line in reader.lines().map_while(Result::ok) {
        scan.total_mappings += 1;

        let Some(path) = mapped_path(&line) else {
            continue;
        };
        if !is_module_path(path) {
            continue;
        }

        scan.library_mappings += 1;
        if is_suspicious_library_path(path) {
            scan.suspicious.push(path.to_string());
        }
        if !is_system_library_path(path) && scan.non_system.len() < non_system_limit {
            scan.non_system.push(path.to_string());
        }
    }
    scan
}

pub fn scan_maps_file(path: &Path, non_system_limit: usize) -> io::Result<ModuleScan> {
    let file = File::open(path)?;
    Ok(scan_modules(BufReader::new(file), non_system_limit))
}

/// The detection section. Failure to open the map file is reported inline.
pub fn collect_injection_report(path: &Path, non_system_limit: usize) -> (String, Option<ModuleScan>) {
    let mut out = String::from("\n");
    out.push_str(&section_header("Zygisk Injection Detection"));
    out.push('\n');

    match scan_maps_file(path, non_system_limit) {
        Ok(scan) => {
            if scan.is_injected() {
                log::warn!(
                    "Zygisk injection detected! Found {} suspicious libraries",
                    scan.suspicious.len()
                );
            } else {
                log::info!("No Zygisk injection detected");
            }
            out.push_str(&scan.format());
            (out, Some(scan))
        }
        Err(e) => {
            log::error!("Failed to open {}: {}", path.display(), e);
            out.push_str(&format!("Failed to open {}\n---\n", path.display()));
            (out, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const SAMPLE_MAPS: &str = "\
5d5c8a9000-5d5c8ab000 r--p 00000000 fd:05 1042   /system/bin/app_process64
7a1c000000-7a1c021000 rw-p 00000000 00:00 0 
7a1d400000-7a1d4b1000 r-xp 00000000 07:30 31     /apex/com.android.runtime/lib64/bionic/libc.so
7a1e000000-7a1e010000 r-xp 00000000 fd:05 2211   /data/adb/modules/zygisk_lsposed/lib/arm64-v8a/liblspd.so
7a1e200000-7a1e210000 r-xp 00000000 fd:05 2212   /data/local/tmp/libx.so
7a1e400000-7a1e410000 r-xp 00000000 fd:05 2213   /mnt/expand/libvendorx.so
7a1e600000-7a1e610000 r--p 00000000 00:00 0      [anon:dalvik-main space]
7ffd10000000-7ffd10021000 rw-p 00000000 00:00 0  [stack]
7a1e800000-7a1e810000 r--p 00000000 fd:05 9      /data/app/~~abc==/com.example-1/base.apk
";

    #[test]
    fn test_classification() {
        assert!(is_suspicious_library_path("/data/local/tmp/libx.so"));
        assert!(!is_suspicious_library_path("/system/lib64/libc.so"));
        assert!(is_suspicious_library_path("/system/lib64/libMagiskHelper.so"));
        assert!(is_suspicious_library_path("/mnt/expand/libvendorx.so"));
        assert!(!is_suspicious_library_path("[vdso]"));
        assert!(!is_suspicious_library_path(""));
        assert!(!is_suspicious_library_path("/data/app/com.example-1/lib/arm64/libapp.so"));
    }

    #[test]
    fn test_system_prefixes() {
        assert!(is_system_library_path("/apex/com.android.art/lib64/libart.so"));
        assert!(is_system_library_path("[anon:libc_malloc]"));
        assert!(!is_system_library_path("/data/local/tmp/libx.so"));
        assert!(!is_system_library_path(""));
    }

    #[test]
    fn test_single_suspicious_line() {
        let maps = "7a1e200000-7a1e210000 r-xp 00000000 fd:05 2212   /data/local/tmp/libx.so\n";
        let scan = scan_modules(Cursor::new(maps), 20);
        assert_eq!(scan.suspicious, vec!["/data/local/tmp/libx.so"]);
        assert!(scan.is_injected());

        let maps = "7a1d400000-7a1d4b1000 r-xp 00000000 07:30 31     /system/lib64/libc.so\n";
        let scan = scan_modules(Cursor::new(maps), 20);
        assert!(scan.suspicious.is_empty());
        assert_eq!(scan.library_mappings, 1);
    }

    #[test]
    fn test_scan_counts() {
        let scan = scan_modules(Cursor::new(SAMPLE_MAPS), 20);
        assert_eq!(scan.total_mappings, 9);
        // app_process64, libc.so, liblspd.so, libx.so, libvendorx.so
        assert_eq!(scan.library_mappings, 5);
        assert_eq!(
            scan.suspicious,
            vec![
                "/data/adb/modules/zygisk_lsposed/lib/arm64-v8a/liblspd.so",
                "/data/local/tmp/libx.so",
                "/mnt/expand/libvendorx.so",
            ]
        );
        assert_eq!(scan.non_system.len(), 3);
    }

    #[test]
    fn test_non_system_listing_is_bounded() {
        let mut maps = String::new();
        for i in 0..30 {
            maps.push_str(&format!("1000-2000 r-xp 00000000 fd:05 {i} /mnt/lib{i}.so\n"));
        }
        let scan = scan_modules(Cursor::new(maps), 20);
        assert_eq!(scan.library_mappings, 30);
        assert_eq!(scan.suspicious.len(), 30);
        assert_eq!(scan.non_system.len(), 20);
        assert_eq!(scan.non_system[0], "/mnt/lib0.so");
    }

    #[test]
    fn test_format_clean() {
        let maps = "1000-2000 r-xp 00000000 07:30 31 /system/lib64/libc.so\n";
        let out = scan_modules(Cursor::new(maps), 20).format();
        assert!(out.starts_with("Total Mappings: 1\nLibrary Mappings: 1\nSuspicious Libraries Found: 0\n\n"));
        assert!(out.contains("No suspicious libraries detected.\n"));
        assert!(out.contains("Non-System Libraries (first 20):\n  [None found]\n"));
        assert!(out.ends_with("---\n"));
    }

    #[test]
    fn test_report_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_MAPS.as_bytes()).unwrap();

        let (out, scan) = collect_injection_report(file.path(), 20);
        assert!(out.starts_with("\n=== Zygisk Injection Detection ===\n\n"));
        assert!(out.contains("Suspicious Libraries:\n  - /data/adb/modules/"));
        assert_eq!(scan.unwrap().suspicious.len(), 3);
    }

    #[test]
    fn test_missing_maps_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("maps");
        let (out, scan) = collect_injection_report(&missing, 20);
        assert!(out.contains("Failed to open "));
        assert!(scan.is_none());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_live_self_maps() {
        let scan = scan_maps_file(Path::new("/proc/self/maps"), 20).unwrap();
        assert!(scan.total_mappings > 0);
    }
}
