//! Network interface enumeration and MAC selection.
//!
//! Primary path: one walk of `getifaddrs` collecting `AF_PACKET` hardware
//! addresses, a second walk attaching IPv4/IPv6 addresses by name. When the
//! call fails, or yields no link-layer entries (some vendor kernels hide
//! them from untrusted apps), fall back to `SIOCGIFHWADDR` per interface name.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::Result;

/// Returned by [`get_primary_mac`] when every strategy comes up empty.
pub const MAC_FAILURE: &str = "Failed to get MAC address";

/// Names probed directly, in order, once enumeration has nothing usable.
const PROBE_INTERFACES: &[&str] = &["wlan0", "eth0", "wlan1", "usb0"];

const PREFERRED_INTERFACE: &str = "wlan0";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkInterfaceInfo {
    pub name: String,
    /// Colon-separated uppercase hex. Empty when the link has no address.
    pub mac_address: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

/// One entry from the OS address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfAddr {
    Link { name: String, mac: String },
    V4 { name: String, addr: Ipv4Addr },
    /// Rendered with `Ipv6Addr` display, so link-local addresses carry no
    /// `%iface` zone suffix.
    V6 { name: String, addr: Ipv6Addr },
    /// Any other family, or an entry without an address.
    Other { name: String },
}

impl IfAddr {
    pub fn name(&self) -> &str {
        match self {
            IfAddr::Link { name, .. }
            | IfAddr::V4 { name, .. }
            | IfAddr::V6 { name, .. }
            | IfAddr::Other { name } => name,
        }
    }
}

pub trait InterfaceSource {
    /// Walk the address list once, in OS order.
    fn addresses(&self) -> Result<Vec<IfAddr>>;

    /// Query one interface's hardware address. Non-Ethernet links are an error.
    fn hardware_address(&self, name: &str) -> Result<String>;
}

/// The live interface list of this device.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod sys {
    use std::ffi::CStr;
    use std::io;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use std::ptr;

    use super::IfAddr;
    use crate::codec::format_mac;
    use crate::error::{FingerprintError, Result};

    const IFNAMSIZ: usize = 16;
    const SIOCGIFHWADDR: u32 = 0x8927;
    const ARPHRD_ETHER: u16 = 1;

    /// `struct ifreq` restricted to the `ifr_hwaddr` member, padded to the
    /// largest kernel layout.
    #[repr(C)]
    struct IfReqHwAddr {
        ifr_name: [libc::c_char; IFNAMSIZ],
        ifr_hwaddr: libc::sockaddr,
        _pad: [u8; 8],
    }

    /// Frees the `getifaddrs` list on every exit path.
    struct IfAddrsGuard(*mut libc::ifaddrs);

    impl Drop for IfAddrsGuard {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe { libc::freeifaddrs(self.0) };
            }
        }
    }

    pub(super) fn addresses() -> Result<Vec<IfAddr>> {
        let mut head: *mut libc::ifaddrs = ptr::null_mut();
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(FingerprintError::last_os("getifaddrs"));
        }
        let _guard = IfAddrsGuard(head);

        let mut out = Vec::new();
        let mut cur = head;
        while !cur.is_null() {
            let ifa = unsafe { &*cur };
            cur = ifa.ifa_next;
            if ifa.ifa_name.is_null() {
                continue;
            }
            let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
                .to_string_lossy()
                .into_owned();
            if ifa.ifa_addr.is_null() {
                out.push(IfAddr::Other { name });
                continue;
            }

            let family = libc::c_int::from(unsafe { (*ifa.ifa_addr).sa_family });
            let entry = match family {
                libc::AF_PACKET => {
                    let sll = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_ll) };
                    let len = usize::from(sll.sll_halen).min(sll.sll_addr.len());
                    IfAddr::Link {
                        name,
                        mac: format_mac(&sll.sll_addr[..len]),
                    }
                }
                libc::AF_INET => {
                    let sin = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in) };
                    IfAddr::V4 {
                        name,
                        addr: Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                    }
                }
                libc::AF_INET6 => {
                    let sin6 = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in6) };
                    IfAddr::V6 {
                        name,
                        addr: Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                    }
                }
                _ => IfAddr::Other { name },
            };
            out.push(entry);
        }
        Ok(out)
    }

    pub(super) fn hardware_address(name: &str) -> Result<String> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
        if fd < 0 {
            return Err(FingerprintError::Io(io::Error::last_os_error()));
        }
        let sock = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut req: IfReqHwAddr = unsafe { std::mem::zeroed() };
        for (dst, src) in req
            .ifr_name
            .iter_mut()
            .zip(name.as_bytes().iter().take(IFNAMSIZ - 1))
        {
            *dst = *src as libc::c_char;
        }

        if unsafe { libc::ioctl(sock.as_raw_fd(), SIOCGIFHWADDR as _, &mut req as *mut IfReqHwAddr) } < 0 {
            return Err(FingerprintError::Ioctl {
                interface: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        let family = req.ifr_hwaddr.sa_family;
        if family != ARPHRD_ETHER {
            return Err(FingerprintError::NotEthernet {
                interface: name.to_string(),
                family,
            });
        }

        let mut mac = [0u8; 6];
        for (dst, src) in mac.iter_mut().zip(req.ifr_hwaddr.sa_data.iter()) {
            *dst = *src as u8;
        }
        Ok(format_mac(&mac))
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl InterfaceSource for SystemInterfaces {
    fn addresses(&self) -> Result<Vec<IfAddr>> {
        sys::addresses()
    }

    fn hardware_address(&self, name: &str) -> Result<String> {
        sys::hardware_address(name)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
use crate::error::FingerprintError;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl InterfaceSource for SystemInterfaces {
    fn addresses(&self) -> Result<Vec<IfAddr>> {
        Err(FingerprintError::Enumeration {
            op: "getifaddrs",
            errno: 0,
        })
    }

    fn hardware_address(&self, name: &str) -> Result<String> {
        Err(FingerprintError::NotEthernet {
            interface: name.to_string(),
            family: 0,
        })
    }
}

/// One entry per link-layer name, first-seen order.
fn link_layer_entries(entries: &[IfAddr]) -> Vec<NetworkInterfaceInfo> {
    let mut out: Vec<NetworkInterfaceInfo> = Vec::new();
    for entry in entries {
        if let IfAddr::Link { name, mac } = entry {
            match out.iter_mut().find(|i| &i.name == name) {
                Some(existing) => {
                    if existing.mac_address.is_empty() {
                        existing.mac_address = mac.clone();
                    }
                }
                None => {
                    log::info!("Interface: {}, MAC: {}", name, mac);
                    out.push(NetworkInterfaceInfo {
                        name: name.clone(),
                        mac_address: mac.clone(),
                        ..Default::default()
                    });
                }
            }
        }
    }
    out
}

/// Merge IP addresses into the matching entries. Later addresses overwrite earlier ones.
fn attach_addresses(interfaces: &mut [NetworkInterfaceInfo], entries: &[IfAddr]) {
    for entry in entries {
        let Some(info) = interfaces.iter_mut().find(|i| i.name == entry.name()) else {
            continue;
        };
        match entry {
            IfAddr::V4 { addr, .. } => {
                log::info!("Interface: {}, IPv4: {}", info.name, addr);
                info.ipv4 = Some(addr.to_string());
            }
            IfAddr::V6 { addr, .. } => {
                log::info!("Interface: {}, IPv6: {}", info.name, addr);
                info.ipv6 = Some(addr.to_string());
            }
            _ => {}
        }
    }
}

/// Per-name `SIOCGIFHWADDR` over the names of a fresh address walk.
fn list_via_ioctl(source: &dyn InterfaceSource) -> Vec<NetworkInterfaceInfo> {
    let entries = match source.addresses() {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("{}, no interface names for ioctl fallback", e);
            return Vec::new();
        }
    };

    let mut names: Vec<&str> = Vec::new();
    for entry in &entries {
        if !names.contains(&entry.name()) {
            names.push(entry.name());
        }
    }

    let mut interfaces = Vec::new();
    for name in names {
        match source.hardware_address(name) {
            Ok(mac) if !mac.is_empty() => {
                log::info!("Interface (ioctl): {}, MAC: {}", name, mac);
                interfaces.push(NetworkInterfaceInfo {
                    name: name.to_string(),
                    mac_address: mac,
                    ..Default::default()
                });
            }
            Ok(_) => {}
            Err(e) => log::debug!("{}", e),
        }
    }

    attach_addresses(&mut interfaces, &entries);
    interfaces
}

/// Enumerate interfaces with their MAC and IP addresses.
pub fn list_interfaces(source: &dyn InterfaceSource) -> Vec<NetworkInterfaceInfo> {
    let entries = match source.addresses() {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("{}, trying ioctl fallback", e);
            return list_via_ioctl(source);
        }
    };

    let mut interfaces = link_layer_entries(&entries);
    if interfaces.is_empty() {
        log::info!("No MAC addresses found via getifaddrs, trying ioctl fallback");
        return list_via_ioctl(source);
    }

    attach_addresses(&mut interfaces, &entries);
    interfaces
}

/// Pick the device MAC: `wlan0` first, then any non-empty address, then
/// direct probes of well-known names. Returns [`MAC_FAILURE`] otherwise.
pub fn get_primary_mac(source: &dyn InterfaceSource) -> String {
    let interfaces = list_interfaces(source);

    if let Some(info) = interfaces
        .iter()
        .find(|i| i.name == PREFERRED_INTERFACE && !i.mac_address.is_empty())
    {
        return info.mac_address.clone();
    }
    if let Some(info) = interfaces.iter().find(|i| !i.mac_address.is_empty()) {
        return info.mac_address.clone();
    }

    log::info!("Trying ioctl fallback for {}", PROBE_INTERFACES.join(", "));
    for name in PROBE_INTERFACES {
        match source.hardware_address(name) {
            Ok(mac) if !mac.is_empty() => return mac,
            Ok(_) => {}
            Err(e) => log::debug!("{}", e),
        }
    }

    MAC_FAILURE.to_string()
}

/// Write every interface to the log. Nothing is returned.
pub fn log_interfaces(source: &dyn InterfaceSource) {
    let interfaces = list_interfaces(source);

    log::info!("========== Network Interfaces ==========");
    for info in &interfaces {
        log::info!("Interface: {}", info.name);
        log::info!("  MAC: {}", info.mac_address);
        if let Some(ipv4) = &info.ipv4 {
            log::info!("  IPv4: {}", ipv4);
        }
        if let Some(ipv6) = &info.ipv6 {
            log::info!("  IPv6: {}", ipv6);
        }
    }
    log::info!("========================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FingerprintError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeInterfaces {
        entries: Option<Vec<IfAddr>>,
        ioctl: HashMap<&'static str, &'static str>,
        probed: RefCell<Vec<String>>,
    }

    impl InterfaceSource for FakeInterfaces {
        fn addresses(&self) -> Result<Vec<IfAddr>> {
            self.entries.clone().ok_or(FingerprintError::Enumeration {
                op: "getifaddrs",
                errno: 1,
            })
        }

        fn hardware_address(&self, name: &str) -> Result<String> {
            self.probed.borrow_mut().push(name.to_string());
            self.ioctl
                .get(name)
                .map(|m| m.to_string())
                .ok_or_else(|| FingerprintError::NotEthernet {
                    interface: name.to_string(),
                    family: 772,
                })
        }
    }

    fn link(name: &str, mac: &str) -> IfAddr {
        IfAddr::Link {
            name: name.to_string(),
            mac: mac.to_string(),
        }
    }

    fn v4(name: &str, addr: [u8; 4]) -> IfAddr {
        IfAddr::V4 {
            name: name.to_string(),
            addr: Ipv4Addr::from(addr),
        }
    }

    #[test]
    fn test_wlan0_preferred_even_when_later() {
        let source = FakeInterfaces {
            entries: Some(vec![
                link("lo", "00:00:00:00:00:00"),
                link("rmnet0", "AA:BB:CC:DD:EE:01"),
                link("wlan0", "AA:BB:CC:DD:EE:FF"),
            ]),
            ..Default::default()
        };
        assert_eq!(get_primary_mac(&source), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_first_non_empty_without_wlan0() {
        let source = FakeInterfaces {
            entries: Some(vec![link("tun0", ""), link("eth0", "02:00:00:00:00:01")]),
            ..Default::default()
        };
        assert_eq!(get_primary_mac(&source), "02:00:00:00:00:01");
        assert!(source.probed.borrow().is_empty());
    }

    #[test]
    fn test_entries_merge_by_name() {
        let source = FakeInterfaces {
            entries: Some(vec![
                link("wlan0", "AA:BB:CC:DD:EE:FF"),
                link("wlan0", "AA:BB:CC:DD:EE:FF"),
                v4("wlan0", [192, 168, 1, 20]),
                IfAddr::V6 {
                    name: "wlan0".into(),
                    addr: "fe80::1".parse().unwrap(),
                },
                v4("ghost", [10, 0, 0, 1]),
            ]),
            ..Default::default()
        };
        let interfaces = list_interfaces(&source);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].ipv4.as_deref(), Some("192.168.1.20"));
        assert_eq!(interfaces[0].ipv6.as_deref(), Some("fe80::1"));
    }

    #[test]
    fn test_no_link_layer_uses_ioctl_fallback() {
        let source = FakeInterfaces {
            entries: Some(vec![
                IfAddr::Other { name: "lo".into() },
                v4("lo", [127, 0, 0, 1]),
                v4("wlan0", [192, 168, 0, 2]),
            ]),
            ioctl: HashMap::from([("wlan0", "11:22:33:44:55:66")]),
            ..Default::default()
        };
        let interfaces = list_interfaces(&source);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "wlan0");
        assert_eq!(interfaces[0].ipv4.as_deref(), Some("192.168.0.2"));
        // names are probed once each, first-seen order
        assert_eq!(*source.probed.borrow(), vec!["lo", "wlan0"]);
    }

    #[test]
    fn test_probe_order_when_enumeration_fails() {
        let source = FakeInterfaces {
            entries: None,
            ioctl: HashMap::from([("usb0", "0A:0B:0C:0D:0E:0F")]),
            ..Default::default()
        };
        assert_eq!(get_primary_mac(&source), "0A:0B:0C:0D:0E:0F");
        assert_eq!(
            *source.probed.borrow(),
            vec!["wlan0", "eth0", "wlan1", "usb0"]
        );
    }

    #[test]
    fn test_failure_sentinel() {
        let source = FakeInterfaces::default();
        assert_eq!(get_primary_mac(&source), MAC_FAILURE);
    }

    #[test]
    fn test_log_interfaces_does_not_panic() {
        let source = FakeInterfaces {
            entries: Some(vec![link("wlan0", "AA:BB:CC:DD:EE:FF")]),
            ..Default::default()
        };
        log_interfaces(&source);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_live_enumeration() {
        // loopback always exists; the MAC may or may not be visible
        let entries = SystemInterfaces.addresses().unwrap();
        assert!(entries.iter().any(|e| e.name() == "lo"));
        let _ = get_primary_mac(&SystemInterfaces);
    }
}
