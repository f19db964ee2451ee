//! Block context and sampling seeds

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak512};
use shared_types::{BlockHeight, Hash};

/// Per-block view handed to every operation by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: BlockHeight,
    /// Block time, unix seconds
    pub time: u64,
    /// Unpredictable per-block entropy from the header
    pub randao_mix: Hash,
}

impl BlockContext {
    pub fn new(height: BlockHeight, time: u64, randao_mix: Hash) -> Self {
        Self {
            height,
            time,
            randao_mix,
        }
    }
}

/// 64-byte sampling seed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Seed(pub [u8; 64]);

impl Seed {
    /// Keccak-512 over the concatenated parts.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Keccak512::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// Child seed for one draw within a block.
    pub fn derive(&self, salt: &[u8]) -> Self {
        Self::from_parts(&[&self.0, salt])
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed({:02x}{:02x}{:02x}{:02x}..)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}
