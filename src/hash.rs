//! Short disambiguation tokens for generated names.
//!
//! Tasks that share a name on different agents get a token derived from the
//! agent id appended to their canonical name. Tokens have a fixed width per
//! algorithm and use the lowercase base32hex alphabet (`0-9a-v`), so they are
//! always legal inside a DNS label.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Token algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Truncated SHA-1 digest, 6 characters.
    #[default]
    Sha1,
    /// FNV-1a 64 folded to 32 bits, 7 characters.
    Fnv64,
}

impl HashAlgorithm {
    /// Width of every token this algorithm produces.
    pub fn width(self) -> usize {
        match self {
            Self::Sha1 => 6,
            Self::Fnv64 => 7,
        }
    }

    /// Hash `s` into a fixed-width token.
    pub fn short_hash(self, s: &str) -> String {
        match self {
            Self::Sha1 => sha1_token(s),
            Self::Fnv64 => fnv64_token(s),
        }
    }
}

/// Encode the low `width * 5` bits of `bits` as base32hex, most significant
/// group first.
fn encode(bits: u64, width: usize) -> String {
    (0..width)
        .rev()
        .map(|group| ALPHABET[((bits >> (group * 5)) & 0x1f) as usize] as char)
        .collect()
}

fn sha1_token(s: &str) -> String {
    let digest = Sha1::digest(s.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    // The first six base32 characters cover the top 30 bits of the digest.
    encode(u64::from(head >> 2), 6)
}

fn fnv64(s: &str) -> u64 {
    s.as_bytes().iter().fold(FNV64_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV64_PRIME)
    })
}

fn fnv64_token(s: &str) -> String {
    let hash = fnv64(s);
    let folded = (hash >> 32) ^ (hash & 0xffff_ffff);
    encode(folded, 7)
}
