use std::fmt::Write as _;

use xxhash_rust::xxh3::Xxh3;

use crate::layer::model::{LayerList, LayerRecord};

const XXH3_SEED: u64 = 0x5d1c_8e0b_47a3_f926;

/// Order- and topology-sensitive fingerprint of a layer list.
///
/// Lists with equal signatures produce graphs with the same wiring, so a value patch is
/// enough to bring one up to date with the other. Names and non-group blend modes are not
/// part of the signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StructuralSignature(String);

impl StructuralSignature {
    /// Full signature text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compact 128-bit digest of the signature text.
    pub fn digest(&self) -> u128 {
        let mut h = StableHasher::new();
        h.write_str(&self.0);
        h.finish()
    }
}

impl std::fmt::Display for StructuralSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.digest())
    }
}

/// Compute the structural signature of `list`.
pub fn compute_signature(list: &LayerList) -> StructuralSignature {
    let mut s = String::with_capacity(list.len() * 16);
    for r in list {
        write_record(&mut s, r);
    }
    StructuralSignature(s)
}

/// Return `true` when a graph built for `old` cannot be value-patched to match `new`.
pub fn needs_full_rebuild(old: &StructuralSignature, new: &StructuralSignature) -> bool {
    old != new
}

fn write_record(s: &mut String, r: &LayerRecord) {
    let base = r
        .clip_base_index
        .map_or_else(|| "-".to_string(), |i| i.to_string());
    let _ = write!(
        s,
        "{}:{}:{}:{}:{}:{}",
        r.id,
        r.kind.code(),
        r.indent,
        u8::from(r.is_clipping_mask),
        u8::from(r.has_mask),
        base
    );
    if r.kind.is_group() {
        let _ = write!(s, ":{}", r.blend_mode.code());
    }
    s.push(';');
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> u128 {
        self.inner.digest128()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/signature.rs"]
mod tests;
