//! Core types and data structures

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// ElGamal ciphertext (alpha, beta) = (g^r, m * y^r)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ciphertext {
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) alpha: BigUint,
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) beta: BigUint,
}

impl Ciphertext {
    /// Create a new ciphertext
    pub fn new(alpha: BigUint, beta: BigUint) -> Self {
        Ciphertext { alpha, beta }
    }

    /// The neutral element for homomorphic accumulation: an encryption of
    /// g^0 with zero randomness.
    pub fn identity() -> Self {
        Ciphertext::new(BigUint::one(), BigUint::one())
    }

    /// Get the first component (g^r)
    pub fn alpha(&self) -> &BigUint {
        &self.alpha
    }

    /// Get the second component (m * y^r)
    pub fn beta(&self) -> &BigUint {
        &self.beta
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.alpha.to_bytes_be().len() + self.beta.to_bytes_be().len()
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.size_bytes())
    }
}

/// Configuration for key generation and tallying.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Verify ballots of a batch on the rayon pool before folding them in
    pub parallel_verification: bool,
    /// Number of Miller-Rabin rounds for primality testing
    pub primality_test_rounds: usize,
    /// Smallest modulus accepted for freshly generated keys
    pub min_key_bits: u64,
    /// Largest ballot count a restored tally may claim. Decryption walks a
    /// discrete log table up to this count.
    pub max_num_tallied: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        TallyConfig {
            parallel_verification: true,
            primality_test_rounds: 20,
            min_key_bits: 512,
            max_num_tallied: 10_000_000,
        }
    }
}

impl TallyConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
