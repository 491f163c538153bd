//! Kernel identification (`uname`) and system configuration (`sysconf`).
//!
//! Both go through syscalls rather than files, so they still answer when
//! `/proc` reads are filtered by the sandbox.

use std::ffi::CStr;
use std::io;

use crate::report::section_header;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub domainname: String,
}

fn field(raw: &[libc::c_char]) -> String {
    // utsname fields are NUL-terminated within their fixed width
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

pub fn uname() -> io::Result<KernelInfo> {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(KernelInfo {
        sysname: field(&uts.sysname),
        nodename: field(&uts.nodename),
        release: field(&uts.release),
        version: field(&uts.version),
        machine: field(&uts.machine),
        domainname: field(&uts.domainname),
    })
}

pub fn collect_kernel_info() -> String {
    let mut out = String::from("\n");
    out.push_str(&section_header("Kernel Info via uname"));
    out.push('\n');

    match uname() {
        Ok(info) => {
            out.push_str(&format!("System Name: {}\n", info.sysname));
            out.push_str(&format!("Node Name: {}\n", info.nodename));
            out.push_str(&format!("Release: {}\n", info.release));
            out.push_str(&format!("Version: {}\n", info.version));
            out.push_str(&format!("Machine: {}\n", info.machine));
            out.push_str(&format!("Domain Name: {}\n", info.domainname));
        }
        Err(e) => {
            let errno = e.raw_os_error().unwrap_or(0);
            log::error!("uname() failed with errno: {}", errno);
            out.push_str(&format!("Failed to get uname info (errno: {})\n", errno));
        }
    }
    out.push_str("---\n");
    out
}

/// `sysconf(name)` if the answer is positive.
fn sysconf(name: libc::c_int) -> Option<i64> {
    let value = unsafe { libc::sysconf(name) };
    (value > 0).then_some(value as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemConfig {
    pub cpus_online: Option<i64>,
    pub cpus_configured: Option<i64>,
    pub page_size: Option<i64>,
    pub clock_ticks: Option<i64>,
    pub phys_pages: Option<i64>,
    pub avail_phys_pages: Option<i64>,
}

impl SystemConfig {
    pub fn query() -> Self {
        SystemConfig {
            cpus_online: sysconf(libc::_SC_NPROCESSORS_ONLN),
            cpus_configured: sysconf(libc::_SC_NPROCESSORS_CONF),
            page_size: sysconf(libc::_SC_PAGESIZE),
            clock_ticks: sysconf(libc::_SC_CLK_TCK),
            phys_pages: sysconf(libc::_SC_PHYS_PAGES),
            avail_phys_pages: sysconf(libc::_SC_AVPHYS_PAGES),
        }
    }

    pub fn format(&self) -> String {
        const UNAVAILABLE: &str = "[UNAVAILABLE]";
        let mut out = String::new();

        let line = |out: &mut String, label: &str, value: Option<i64>, unit: &str| match value {
            Some(v) => out.push_str(&format!("{label}: {v}{unit}\n")),
            None => out.push_str(&format!("{label}: {UNAVAILABLE}\n")),
        };

        line(&mut out, "CPU Cores (Online)", self.cpus_online, "");
        line(&mut out, "CPU Cores (Configured)", self.cpus_configured, "");
        line(&mut out, "Page Size", self.page_size, " bytes");
        line(&mut out, "Clock Ticks per Second", self.clock_ticks, "");

        line(&mut out, "Physical Pages", self.phys_pages, "");
        if let (Some(pages), Some(size)) = (self.phys_pages, self.page_size) {
            out.push_str(&format!(
                "Total Physical Memory: {} MB\n",
                pages.saturating_mul(size) / 1024 / 1024
            ));
        }

        line(&mut out, "Available Physical Pages", self.avail_phys_pages, "");
        if let (Some(pages), Some(size)) = (self.avail_phys_pages, self.page_size) {
            out.push_str(&format!(
                "Available Physical Memory: {} MB\n",
                pages.saturating_mul(size) / 1024 / 1024
            ));
        }

        out
    }
}

pub fn collect_system_config() -> String {
    let mut out = String::from("\n");
    out.push_str(&section_header("System Config via sysconf"));
    out.push('\n');
    out.push_str(&SystemConfig::query().format());
    out.push_str("---\n");
    out
}
