//! Fingerprinting of output arrangements
//!
//! Identical hardware must always produce the same fingerprint, across runs,
//! so that a saved layout can be found again when the hardware returns.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::xrandr::Snapshot;

/// Lowercase hex digest identifying a set of connected outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(snapshot: &Snapshot) -> Self {
        // Property maps iterate in arbitrary order; take values by sorted key.
        let mut per_output: Vec<Vec<&str>> = snapshot
            .connected()
            .map(|output| {
                let mut keys: Vec<&String> = output.properties.keys().collect();
                keys.sort();
                keys.into_iter().map(|key| output.properties[key].as_str()).collect()
            })
            .collect();
        // Reporting order of the outputs themselves must not matter either.
        per_output.sort();

        let mut hasher = Sha256::new();
        for values in per_output {
            for value in values {
                hasher.update(value.as_bytes());
            }
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap a fingerprint read back from storage
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Accept only a complete lowercase or uppercase SHA-256 hex digest
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
