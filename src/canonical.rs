//! Canonical serialization for fit provenance hashes.
//!
//! Network structure and fit parameters are hashed from a canonical,
//! deterministic serialization so that two fits over the same structure with
//! the same parameters report the same fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Callers sort ids and arcs before hashing
//! - No HashMap allowed: Use BTreeMap for maps in hashed data
//! - No raw floats: Quantize floats to integers first (see `estimator::config`)

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
