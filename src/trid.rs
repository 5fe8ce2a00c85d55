//! Server transaction ID generation.
//!
//! Every response carries a `<svTRID>` that must be unique for the life of
//! the process. IDs are the SHA-256 digest, hex-encoded, of
//! `counter || 0x00 || 32 random bytes`; the counter starts at the
//! wall-clock epoch seconds and advances atomically per call, so even a
//! broken random source cannot produce a repeat.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Process-wide `<svTRID>` generator. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct TridGenerator {
    counter: AtomicU64,
}

impl TridGenerator {
    /// Create a generator with its counter seeded from the current epoch
    /// seconds.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    /// Produce one 64-hex-character identifier.
    pub fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let salt: [u8; 32] = rand::random();

        let mut hasher = Sha256::new();
        hasher.update(n.to_be_bytes());
        hasher.update([0u8]);
        hasher.update(salt);
        let digest = hasher.finalize();

        let mut out = String::with_capacity(64);
        for byte in digest {
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
        out
    }
}

impl Default for TridGenerator {
    fn default() -> Self {
        Self::new()
    }
}
