//! File fingerprint reader.
//!
//! Reads kernel/sysfs artifacts and renders them as `Path / Exit Code /
//! Accessible / Status / Content` blocks. A read never fails: an unreadable
//! path produces a fingerprint with `accessible == false`.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use crate::config::ReadMode;
use crate::report::section_header;

/// Exit status reported for a direct read that failed, matching `cat`.
const DIRECT_FAILURE_STATUS: i32 = 1;

/// Coarse outcome of a probe, derived from how the read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Ok,
    PermissionDenied,
    NotFound,
    Error,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Ok => "OK",
            ProbeStatus::PermissionDenied => "PERM_DENIED",
            ProbeStatus::NotFound => "NOT_FOUND",
            ProbeStatus::Error => "ERROR",
        }
    }

    fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::PermissionDenied => ProbeStatus::PermissionDenied,
            io::ErrorKind::NotFound => ProbeStatus::NotFound,
            _ => ProbeStatus::Error,
        }
    }

    /// Classify a shell read from its exit code and merged output.
    fn from_shell(exit_status: i32, output: &str) -> Self {
        if exit_status == 0 {
            ProbeStatus::Ok
        } else if output.contains("Permission denied") {
            ProbeStatus::PermissionDenied
        } else if output.contains("No such file") {
            ProbeStatus::NotFound
        } else if exit_status == 1 {
            ProbeStatus::PermissionDenied
        } else if exit_status > 1 {
            ProbeStatus::NotFound
        } else {
            ProbeStatus::Error
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub path: String,
    pub content: String,
    pub exit_status: i32,
    pub accessible: bool,
    pub status: ProbeStatus,
}

impl FileFingerprint {
    fn new(path: &Path, content: String, exit_status: i32, status: ProbeStatus) -> Self {
        FileFingerprint {
            path: path.display().to_string(),
            content,
            exit_status,
            accessible: exit_status == 0,
            status,
        }
    }

    /// Render the report block, truncating content beyond `cap` characters.
    pub fn format(&self, cap: usize) -> String {
        let mut out = format!(
            "Path: {}\nExit Code: {}\nAccessible: {}\nStatus: {}\n",
            self.path, self.exit_status, self.accessible, self.status
        );
        let trimmed = trim_content(&self.content);
        if trimmed.is_empty() {
            out.push_str("Content: [EMPTY]\n");
        } else {
            match truncate_chars(trimmed, cap) {
                Some(head) => {
                    out.push_str("Content (truncated): ");
                    out.push_str(head);
                    out.push_str("...\n");
                }
                None => {
                    out.push_str("Content: ");
                    out.push_str(trimmed);
                    out.push('\n');
                }
            }
        }
        out.push_str("---\n");
        out
    }
}

fn trim_content(content: &str) -> &str {
    content.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// The first `cap` characters, or `None` when the text already fits.
fn truncate_chars(text: &str, cap: usize) -> Option<&str> {
    text.char_indices().nth(cap).map(|(idx, _)| &text[..idx])
}

/// Read one path according to `mode`.
pub fn read_fingerprint(path: &Path, mode: ReadMode) -> FileFingerprint {
    let fp = match mode {
        ReadMode::Direct => read_direct(path),
        ReadMode::Shell => read_via_shell(path),
    };
    if !fp.accessible {
        log::debug!(
            "File access failed: {}, exit_code: {} ({})",
            fp.path,
            fp.exit_status,
            fp.status
        );
    }
    fp
}

fn read_direct(path: &Path) -> FileFingerprint {
    match fs::read(path) {
        Ok(bytes) => FileFingerprint::new(
            path,
            String::from_utf8_lossy(&bytes).into_owned(),
            0,
            ProbeStatus::Ok,
        ),
        Err(e) => FileFingerprint::new(
            path,
            String::new(),
            DIRECT_FAILURE_STATUS,
            ProbeStatus::from_io(e.kind()),
        ),
    }
}

fn read_via_shell(path: &Path) -> FileFingerprint {
    let output = match Command::new("cat").arg(path).output() {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Failed to spawn cat for {}: {}", path.display(), e);
            return FileFingerprint::new(path, String::new(), -1, ProbeStatus::Error);
        }
    };

    let mut content = String::from_utf8_lossy(&output.stdout).into_owned();
    content.push_str(&String::from_utf8_lossy(&output.stderr));

    let exit_status = exit_code(&output.status);
    let status = ProbeStatus::from_shell(exit_status, &content);
    FileFingerprint::new(path, content, exit_status, status)
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    // killed by a signal: report the raw wait status
    status.code().unwrap_or_else(|| status.into_raw())
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Read every path in `paths` under a `\n=== title ===\n\n` header.
pub fn collect_group<P: AsRef<Path>>(
    title: &str,
    paths: &[P],
    mode: ReadMode,
    cap: usize,
) -> String {
    let mut out = String::from("\n");
    out.push_str(&section_header(title));
    out.push('\n');
    for path in paths {
        out.push_str(&read_fingerprint(path.as_ref(), mode).format(cap));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_read_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  1\n").unwrap();

        let fp = read_fingerprint(file.path(), ReadMode::Direct);
        assert!(fp.accessible);
        assert_eq!(fp.exit_status, 0);
        assert_eq!(fp.status, ProbeStatus::Ok);

        let block = fp.format(2048);
        assert!(block.contains("Exit Code: 0\nAccessible: true\nStatus: OK\n"));
        assert!(block.contains("Content: 1\n"));
        assert!(block.ends_with("---\n"));
    }

    #[test]
    fn test_missing_file_is_inaccessible() {
        let dir = tempfile::tempdir().unwrap();
        let fp = read_fingerprint(&dir.path().join("absent"), ReadMode::Direct);
        assert!(!fp.accessible);
        assert_ne!(fp.exit_status, 0);
        assert!(fp.content.is_empty());
        assert_eq!(fp.status, ProbeStatus::NotFound);
        assert!(fp.format(2048).contains("Accessible: false\n"));
        assert!(fp.format(2048).contains("Content: [EMPTY]\n"));
    }

    #[test]
    fn test_directory_is_inaccessible() {
        let dir = tempfile::tempdir().unwrap();
        let fp = read_fingerprint(dir.path(), ReadMode::Direct);
        assert!(!fp.accessible);
        assert!(fp.content.is_empty());
    }

    #[test]
    fn test_accessible_iff_exit_zero() {
        let p = Path::new("/x");
        for (status, probe) in [(0, ProbeStatus::Ok), (1, ProbeStatus::Error), (-1, ProbeStatus::Error)] {
            let fp = FileFingerprint::new(p, String::new(), status, probe);
            assert_eq!(fp.accessible, status == 0);
        }
    }

    #[test]
    fn test_truncation_marker() {
        let fp = FileFingerprint::new(Path::new("/x"), "a".repeat(3000), 0, ProbeStatus::Ok);
        let block = fp.format(2048);
        let expected = format!("Content (truncated): {}...\n", "a".repeat(2048));
        assert!(block.contains(&expected));

        // exactly at the cap is not truncated
        let fp = FileFingerprint::new(Path::new("/x"), "b".repeat(2048), 0, ProbeStatus::Ok);
        assert!(!fp.format(2048).contains("truncated"));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let text = "é".repeat(10);
        assert_eq!(truncate_chars(&text, 4), Some("éééé"));
        assert_eq!(truncate_chars(&text, 10), None);
    }

    #[test]
    fn test_trim_before_cap() {
        let padded = format!("\n\n{}\r\n\t ", "c".repeat(2048));
        let fp = FileFingerprint::new(Path::new("/x"), padded, 0, ProbeStatus::Ok);
        assert!(!fp.format(2048).contains("truncated"));
    }

    #[test]
    fn test_shell_status_mapping() {
        assert_eq!(ProbeStatus::from_shell(0, ""), ProbeStatus::Ok);
        assert_eq!(
            ProbeStatus::from_shell(1, "cat: /x: No such file or directory"),
            ProbeStatus::NotFound
        );
        assert_eq!(
            ProbeStatus::from_shell(1, "cat: /x: Permission denied"),
            ProbeStatus::PermissionDenied
        );
        assert_eq!(ProbeStatus::from_shell(1, ""), ProbeStatus::PermissionDenied);
        assert_eq!(ProbeStatus::from_shell(2, ""), ProbeStatus::NotFound);
        assert_eq!(ProbeStatus::from_shell(-1, ""), ProbeStatus::Error);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_shell_read_merges_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let fp = read_fingerprint(&missing, ReadMode::Shell);
        assert!(!fp.accessible);
        assert!(fp.exit_status > 0);
        assert!(fp.content.contains("No such file"));
        assert_eq!(fp.status, ProbeStatus::NotFound);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_shell_read_spawn_failure() {
        let saved = std::env::var_os("PATH");
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("PATH", dir.path().join("no-such-bin"));

        let fp = read_fingerprint(Path::new("/proc/version"), ReadMode::Shell);

        match saved {
            Some(path) => std::env::set_var("PATH", path),
            None => std::env::remove_var("PATH"),
        }
        assert_eq!(fp.exit_status, -1);
        assert!(!fp.accessible);
        assert!(fp.content.is_empty());
        assert_eq!(fp.status, ProbeStatus::Error);
    }

    #[test]
    fn test_collect_group_header() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a"), dir.path().join("b")];
        let out = collect_group("Mounts & Inputs", &paths, ReadMode::Direct, 2048);
        assert!(out.starts_with("\n=== Mounts & Inputs ===\n\n"));
        assert_eq!(out.matches("Accessible: false").count(), 2);
    }
}
