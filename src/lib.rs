//! # Homomorphic Tallying Library
//!
//! This library provides the cryptographic core of a Helios-style election:
//! - Exponential ElGamal over a safe-prime subgroup
//! - Disjunctive zero-knowledge proofs that every ballot is well formed
//! - Homomorphic accumulation of ballots into an encrypted tally
//! - Verifiable decryption by one or several trustees
//!
//! ## Features
//!
//! - **Ballot verification**: per-choice and per-question range proofs
//! - **Distributed decryption**: trustees publish decryption factors with proofs
//! - **Parallel batch checks**: ballots of a batch are verified on the rayon pool
//! - **Tagged persistence**: tallies and ballots serialize with a versioned `datatype`
//!
//! ## Example
//!
//! ```rust
//! use vtally::{Election, EncryptedVote, KeyPair, Question, Tally};
//!
//! let keypair = KeyPair::generate_for_testing().unwrap();
//! let election = Election::new(
//!     "demo",
//!     vec![Question::new("Pick one", vec!["A".into(), "B".into()], 0, 1)],
//!     keypair.public_key.clone(),
//! )
//! .unwrap();
//!
//! // Cast a ballot for option B
//! let vote = EncryptedVote::from_election_and_answers(&election, &[vec![1]])
//!     .unwrap()
//!     .into_cast();
//!
//! // Fold it into the tally, checking its proofs first
//! let mut tally = Tally::new(&election);
//! tally.add_vote(&vote, true).unwrap();
//!
//! // Decrypt with the single trustee's factors
//! let (factors, _proofs) = tally.decryption_factors_and_proofs(&keypair.secret_key);
//! let counts = tally
//!     .decrypt_from_factors(&[factors], &keypair.public_key)
//!     .unwrap();
//! assert_eq!(counts, vec![vec![0, 1]]);
//! ```

pub mod answer;
pub mod dlog;
pub mod election;
pub mod encryption;
pub mod error;
pub mod homomorphic;
pub mod keys;
pub mod proofs;
pub mod schema;
pub mod serialize;
pub mod tally;
pub mod types;
pub mod utils;
pub mod vote;
pub mod workflow;

// Re-export main types for convenience
pub use answer::EncryptedAnswer;
pub use dlog::DLogTable;
pub use election::{Election, Question};
pub use encryption::ElGamal;
pub use error::{BallotRejection, Result, TallyError};
pub use homomorphic::HomomorphicOperations;
pub use keys::{DecryptionKey, KeyPair, PublicKey, SecretKey};
pub use proofs::{
    disjunctive_challenge_generator, dlog_challenge_generator, fiat_shamir_challenge_generator,
    Commitment, DisjunctiveProof, ProofOfKnowledge, VerifiableOperations, ZkProof,
};
pub use schema::Datatype;
pub use tally::{Tally, TallyRecord};
pub use types::{Ciphertext, TallyConfig};
pub use vote::EncryptedVote;
pub use workflow::{BallotStore, ElectionRecord, Trustee, Voter};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_basic_workflow() {
        let keypair = KeyPair::generate_for_testing();
        assert!(keypair.is_ok());

        let keypair = keypair.unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());

        let m = elgamal.encode_exponent(42);
        let (ct, _) = elgamal.encrypt(&m).unwrap();
        let decrypted = keypair.secret_key.decrypt(&ct).unwrap();

        assert_eq!(m, decrypted);
    }
}
