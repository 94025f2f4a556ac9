//! Certificate trust decisions
//!
//! Gemini capsules mostly serve self-signed certificates, so trust follows
//! the trust-on-first-use model: the first fingerprint seen for a
//! `host:port` is pinned, and a different one later is refused.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// Matches the pinned fingerprint (or the store trusts everything).
    Trusted,
    /// Never seen before; the fingerprint is now pinned.
    FirstUse,
    /// Differs from the pinned fingerprint.
    Mismatch { pinned: String },
}

impl TrustDecision {
    pub fn is_trusted(&self) -> bool {
        !matches!(self, TrustDecision::Mismatch { .. })
    }
}

pub trait TrustStore {
    fn check(&self, host: &str, port: u16, fingerprint: &str) -> Result<TrustDecision>;
}

/// Accepts every certificate without pinning.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyTrust;

impl TrustStore for AcceptAnyTrust {
    fn check(&self, _host: &str, _port: u16, _fingerprint: &str) -> Result<TrustDecision> {
        Ok(TrustDecision::Trusted)
    }
}

/// TOFU pins held for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryTrustStore {
    pins: RwLock<HashMap<(String, u16), String>>,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(&self, host: &str, port: u16) -> Option<String> {
        self.pins.read().get(&(host.to_string(), port)).cloned()
    }
}

impl TrustStore for MemoryTrustStore {
    fn check(&self, host: &str, port: u16, fingerprint: &str) -> Result<TrustDecision> {
        let mut pins = self.pins.write();
        let key = (host.to_string(), port);

        Ok(match pins.get(&key) {
            Some(pinned) if pinned == fingerprint => TrustDecision::Trusted,
            Some(pinned) => TrustDecision::Mismatch {
                pinned: pinned.clone(),
            },
            None => {
                pins.insert(key, fingerprint.to_string());
                TrustDecision::FirstUse
            }
        })
    }
}
