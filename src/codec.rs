//! Byte-to-text renderings used in the report.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Standard alphabet, padded Base64. Empty input gives an empty string.
pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Lowercase hex, two digits per byte.
pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Colon-separated uppercase MAC. At most six octets are rendered.
pub fn format_mac(addr: &[u8]) -> String {
    addr.iter()
        .take(6)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}
