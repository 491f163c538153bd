//! SHA-256 identity digest over the stable parts of the fingerprint.
//!
//! Volatile values (uptime, entropy, battery) are left out so the digest
//! stays the same across reboots of an unmodified device.

use sha2::{Digest, Sha256};

use crate::report::section_header;

/// An ordered list of named identity inputs.
#[derive(Debug, Default, Clone)]
pub struct IdentityDigest {
    inputs: Vec<(&'static str, Vec<u8>)>,
}

impl IdentityDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input. Empty values are skipped.
    pub fn add(&mut self, label: &'static str, value: impl AsRef<[u8]>) -> &mut Self {
        let value = value.as_ref();
        if !value.is_empty() {
            self.inputs.push((label, value.to_vec()));
        }
        self
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.inputs.iter().map(|(label, _)| *label).collect()
    }

    /// Lowercase hex SHA-256. Each label and value is length-prefixed so
    /// adjacent inputs cannot run into each other.
    pub fn hex(&self) -> String {
        let mut hasher = Sha256::new();
        for (label, value) in &self.inputs {
            hasher.update((label.len() as u32).to_be_bytes());
            hasher.update(label.as_bytes());
            hasher.update((value.len() as u32).to_be_bytes());
            hasher.update(value);
        }
        hex::encode(hasher.finalize())
    }

    pub fn format(&self) -> String {
        let mut out = String::from("\n");
        out.push_str(&section_header("Fingerprint Digest"));
        if self.inputs.is_empty() {
            out.push_str("Inputs: [None]\n");
        } else {
            out.push_str(&format!("Inputs: {}\n", self.labels().join(", ")));
        }
        out.push_str(&format!("SHA-256: {}\n", self.hex()));
        out
    }
}
