//! Non-interactive zero-knowledge proofs for ballots and decryptions
//!
//! Every proof here is a Chaum-Pedersen transcript showing that a tuple
//! `(little_g, little_h, big_g, big_h)` shares one discrete log, i.e.
//! `big_g = little_g^w` and `big_h = little_h^w` for the same `w`. Encryption
//! proofs instantiate it with `(g, y, alpha, beta / m)`; decryption proofs with
//! `(g, alpha, y, alpha^x)`. Disjunctive proofs combine one real transcript
//! with simulated ones so that the verifier learns only that one of several
//! plaintexts is encrypted.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encryption::ElGamal;
use crate::error::{Result, TallyError};
use crate::types::Ciphertext;
use crate::utils::{mod_div, mod_exp, random_below, random_exponent};

/// Prover commitment (A, B) = (little_g^w, little_h^w)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment {
    #[serde(rename = "A", with = "crate::serialize::big_uint")]
    pub a: BigUint,
    #[serde(rename = "B", with = "crate::serialize::big_uint")]
    pub b: BigUint,
}

/// Chaum-Pedersen proof of equality of discrete logs
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZkProof {
    pub commitment: Commitment,
    #[serde(with = "crate::serialize::big_uint")]
    pub challenge: BigUint,
    #[serde(with = "crate::serialize::big_uint")]
    pub response: BigUint,
}

/// One transcript per candidate plaintext; exactly one of them is real.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisjunctiveProof {
    pub proofs: Vec<ZkProof>,
}

/// Schnorr proof of knowledge of a discrete log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfKnowledge {
    #[serde(with = "crate::serialize::big_uint")]
    pub commitment: BigUint,
    #[serde(with = "crate::serialize::big_uint")]
    pub challenge: BigUint,
    #[serde(with = "crate::serialize::big_uint")]
    pub response: BigUint,
}

/// Hash the commitments of a disjunctive proof into its overall challenge.
///
/// The input is the comma-joined decimal values `A0,B0,A1,B1,...`.
pub fn disjunctive_challenge_generator(commitments: &[Commitment]) -> BigUint {
    let joined = commitments
        .iter()
        .flat_map(|c| [c.a.to_str_radix(10), c.b.to_str_radix(10)])
        .collect::<Vec<_>>()
        .join(",");

    BigUint::from_bytes_be(&Sha256::digest(joined.as_bytes()))
}

/// Fiat-Shamir challenge for a single Chaum-Pedersen transcript
pub fn fiat_shamir_challenge_generator(commitment: &Commitment) -> BigUint {
    disjunctive_challenge_generator(std::slice::from_ref(commitment))
}

/// Fiat-Shamir challenge for a Schnorr proof of knowledge
pub fn dlog_challenge_generator(commitment: &BigUint) -> BigUint {
    BigUint::from_bytes_be(&Sha256::digest(commitment.to_str_radix(10).as_bytes()))
}

impl ZkProof {
    /// Prove that `(little_g, little_h, little_g^x, little_h^x)` is a DH tuple.
    pub fn generate(
        little_g: &BigUint,
        little_h: &BigUint,
        x: &BigUint,
        p: &BigUint,
        q: &BigUint,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> ZkProof {
        let w = random_exponent(q);
        let commitment = Commitment {
            a: mod_exp(little_g, &w, p),
            b: mod_exp(little_h, &w, p),
        };
        let challenge = challenge_generator(&commitment) % q;
        let response = (w + x * &challenge) % q;

        ZkProof {
            commitment,
            challenge,
            response,
        }
    }

    /// Check the transcript equations without recomputing the challenge:
    /// little_g^response = A * big_g^challenge and
    /// little_h^response = B * big_h^challenge.
    pub fn verify_transcript(
        &self,
        little_g: &BigUint,
        little_h: &BigUint,
        big_g: &BigUint,
        big_h: &BigUint,
        p: &BigUint,
    ) -> bool {
        let first_check = mod_exp(little_g, &self.response, p)
            == (mod_exp(big_g, &self.challenge, p) * &self.commitment.a) % p;
        let second_check = mod_exp(little_h, &self.response, p)
            == (mod_exp(big_h, &self.challenge, p) * &self.commitment.b) % p;

        first_check && second_check
    }

    /// Check the transcript and that its challenge is the one the generator
    /// derives from its commitment.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        little_g: &BigUint,
        little_h: &BigUint,
        big_g: &BigUint,
        big_h: &BigUint,
        p: &BigUint,
        q: &BigUint,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool {
        self.verify_transcript(little_g, little_h, big_g, big_h, p)
            && self.challenge == challenge_generator(&self.commitment) % q
    }
}

/// Trait for verifiable encryption and decryption
pub trait VerifiableOperations {
    /// Prove that `ciphertext` was produced with `randomness`
    fn generate_encryption_proof(
        &self,
        randomness: &BigUint,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> ZkProof;

    /// Forge a transcript claiming `ciphertext` encrypts `plaintext`, for the
    /// given (or a random) challenge
    fn simulate_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        challenge: Option<BigUint>,
    ) -> Result<ZkProof>;

    /// Check that `proof` is a valid transcript for `ciphertext` encrypting `plaintext`
    fn verify_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        proof: &ZkProof,
    ) -> bool;

    /// Prove that `ciphertext` encrypts one of `plaintexts`; it must actually
    /// encrypt `plaintexts[real_index]` under `randomness`
    fn generate_disjunctive_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintexts: &[BigUint],
        real_index: usize,
        randomness: &BigUint,
        challenge_generator: impl Fn(&[Commitment]) -> BigUint,
    ) -> Result<DisjunctiveProof>;

    /// Check a disjunctive proof over `plaintexts`
    fn verify_disjunctive_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintexts: &[BigUint],
        proof: &DisjunctiveProof,
        challenge_generator: impl Fn(&[Commitment]) -> BigUint,
    ) -> bool;

    /// Check that `factor` is alpha^x for the x behind this instance's key
    fn verify_decryption_factor(
        &self,
        ciphertext: &Ciphertext,
        factor: &BigUint,
        proof: &ZkProof,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool;

    /// Check that `ciphertext` decrypts to `plaintext` under this instance's key
    fn verify_decryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        proof: &ZkProof,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool;
}

impl VerifiableOperations for ElGamal {
    fn generate_encryption_proof(
        &self,
        randomness: &BigUint,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> ZkProof {
        let pk = &self.public_key;
        ZkProof::generate(&pk.g, &pk.y, randomness, &pk.p, &pk.q, challenge_generator)
    }

    fn simulate_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        challenge: Option<BigUint>,
    ) -> Result<ZkProof> {
        let pk = &self.public_key;
        let p = &pk.p;

        let challenge = challenge.unwrap_or_else(|| random_below(&pk.q));
        let response = random_below(&pk.q);

        // A = g^response / alpha^challenge
        let a = mod_div(
            &mod_exp(&pk.g, &response, p),
            &mod_exp(&ciphertext.alpha, &challenge, p),
            p,
        )?;

        // B = y^response / (beta / m)^challenge
        let beta_over_m = mod_div(&ciphertext.beta, plaintext, p)?;
        let b = mod_div(
            &mod_exp(&pk.y, &response, p),
            &mod_exp(&beta_over_m, &challenge, p),
            p,
        )?;

        Ok(ZkProof {
            commitment: Commitment { a, b },
            challenge,
            response,
        })
    }

    fn verify_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        proof: &ZkProof,
    ) -> bool {
        let pk = &self.public_key;
        match mod_div(&ciphertext.beta, plaintext, &pk.p) {
            Ok(beta_over_m) => {
                proof.verify_transcript(&pk.g, &pk.y, &ciphertext.alpha, &beta_over_m, &pk.p)
            }
            Err(_) => false,
        }
    }

    fn generate_disjunctive_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintexts: &[BigUint],
        real_index: usize,
        randomness: &BigUint,
        challenge_generator: impl Fn(&[Commitment]) -> BigUint,
    ) -> Result<DisjunctiveProof> {
        if real_index >= plaintexts.len() {
            return Err(TallyError::InvalidParameter(format!(
                "real index {} outside {} plaintexts",
                real_index,
                plaintexts.len()
            )));
        }

        let pk = &self.public_key;
        let q = &pk.q;

        let mut proofs = plaintexts
            .iter()
            .enumerate()
            .map(|(i, plaintext)| {
                if i == real_index {
                    // Placeholder, replaced below once every commitment is known
                    Ok(ZkProof {
                        commitment: Commitment {
                            a: BigUint::zero(),
                            b: BigUint::zero(),
                        },
                        challenge: BigUint::zero(),
                        response: BigUint::zero(),
                    })
                } else {
                    self.simulate_encryption_proof(ciphertext, plaintext, None)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let w = random_exponent(q);
        proofs[real_index].commitment = Commitment {
            a: mod_exp(&pk.g, &w, &pk.p),
            b: mod_exp(&pk.y, &w, &pk.p),
        };

        let commitments: Vec<Commitment> = proofs.iter().map(|p| p.commitment.clone()).collect();
        let total = challenge_generator(&commitments) % q;
        let simulated: BigUint = proofs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != real_index)
            .fold(BigUint::zero(), |acc, (_, p)| acc + &p.challenge)
            % q;

        // real challenge = total - simulated (mod q)
        let challenge = (total + q - simulated) % q;
        let response = (w + randomness * &challenge) % q;
        proofs[real_index].challenge = challenge;
        proofs[real_index].response = response;

        Ok(DisjunctiveProof { proofs })
    }

    fn verify_disjunctive_encryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintexts: &[BigUint],
        proof: &DisjunctiveProof,
        challenge_generator: impl Fn(&[Commitment]) -> BigUint,
    ) -> bool {
        if proof.proofs.len() != plaintexts.len() || plaintexts.is_empty() {
            return false;
        }

        let transcripts_ok = plaintexts
            .iter()
            .zip(&proof.proofs)
            .all(|(plaintext, p)| self.verify_encryption_proof(ciphertext, plaintext, p));
        if !transcripts_ok {
            return false;
        }

        let q = &self.public_key.q;
        let computed_challenge = proof
            .proofs
            .iter()
            .fold(BigUint::zero(), |acc, p| acc + &p.challenge)
            % q;
        let commitments: Vec<Commitment> =
            proof.proofs.iter().map(|p| p.commitment.clone()).collect();
        let expected_challenge = challenge_generator(&commitments) % q;

        computed_challenge == expected_challenge
    }

    fn verify_decryption_factor(
        &self,
        ciphertext: &Ciphertext,
        factor: &BigUint,
        proof: &ZkProof,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool {
        let pk = &self.public_key;
        proof.verify(
            &pk.g,
            &ciphertext.alpha,
            &pk.y,
            factor,
            &pk.p,
            &pk.q,
            challenge_generator,
        )
    }

    fn verify_decryption_proof(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &BigUint,
        proof: &ZkProof,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool {
        match mod_div(&ciphertext.beta, plaintext, &self.public_key.p) {
            Ok(factor) => {
                self.verify_decryption_factor(ciphertext, &factor, proof, challenge_generator)
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{DecryptionKey, KeyPair};
    use crate::utils::random_exponent;

    fn setup() -> (KeyPair, ElGamal) {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());
        (keypair, elgamal)
    }

    #[test]
    fn test_encryption_proof() {
        let (keypair, elgamal) = setup();
        let m = elgamal.encode_exponent(1);
        let r = random_exponent(keypair.public_key.order());
        let ct = elgamal.encrypt_with_randomness(&m, &r).unwrap();

        let proof = elgamal.generate_encryption_proof(&r, fiat_shamir_challenge_generator);
        assert!(elgamal.verify_encryption_proof(&ct, &m, &proof));

        // Wrong plaintext should fail
        let wrong = elgamal.encode_exponent(0);
        assert!(!elgamal.verify_encryption_proof(&ct, &wrong, &proof));
    }

    #[test]
    fn test_simulated_proof_passes_transcript_check() {
        let (_, elgamal) = setup();
        let (ct, _) = elgamal.encrypt(&elgamal.encode_exponent(0)).unwrap();

        // The simulator can fake any plaintext, which is why disjunctive
        // proofs bind the challenges together through the hash.
        let claimed = elgamal.encode_exponent(7);
        let proof = elgamal.simulate_encryption_proof(&ct, &claimed, None).unwrap();
        assert!(elgamal.verify_encryption_proof(&ct, &claimed, &proof));
    }

    #[test]
    fn test_disjunctive_proof_for_each_plaintext() {
        let (keypair, elgamal) = setup();
        let plaintexts: Vec<BigUint> = (0..4).map(|k| elgamal.encode_exponent(k)).collect();

        for k in 0..4 {
            let r = random_exponent(keypair.public_key.order());
            let ct = elgamal.encrypt_with_randomness(&plaintexts[k], &r).unwrap();
            let proof = elgamal
                .generate_disjunctive_encryption_proof(
                    &ct,
                    &plaintexts,
                    k,
                    &r,
                    disjunctive_challenge_generator,
                )
                .unwrap();
            assert!(elgamal.verify_disjunctive_encryption_proof(
                &ct,
                &plaintexts,
                &proof,
                disjunctive_challenge_generator
            ));
        }
    }

    #[test]
    fn test_disjunctive_proof_rejects_value_outside_set() {
        let (keypair, elgamal) = setup();
        let zero_one = vec![elgamal.encode_exponent(0), elgamal.encode_exponent(1)];

        // Encrypt 2 and try every possible claim of being 0 or 1
        let r = random_exponent(keypair.public_key.order());
        let ct = elgamal
            .encrypt_with_randomness(&elgamal.encode_exponent(2), &r)
            .unwrap();
        for real_index in 0..2 {
            let proof = elgamal
                .generate_disjunctive_encryption_proof(
                    &ct,
                    &zero_one,
                    real_index,
                    &r,
                    disjunctive_challenge_generator,
                )
                .unwrap();
            assert!(!elgamal.verify_disjunctive_encryption_proof(
                &ct,
                &zero_one,
                &proof,
                disjunctive_challenge_generator
            ));
        }
    }

    #[test]
    fn test_disjunctive_proof_rejects_tampered_challenge() {
        let (keypair, elgamal) = setup();
        let zero_one = vec![elgamal.encode_exponent(0), elgamal.encode_exponent(1)];
        let r = random_exponent(keypair.public_key.order());
        let ct = elgamal.encrypt_with_randomness(&zero_one[1], &r).unwrap();
        let mut proof = elgamal
            .generate_disjunctive_encryption_proof(&ct, &zero_one, 1, &r, disjunctive_challenge_generator)
            .unwrap();

        proof.proofs[0].challenge += 1u32;
        assert!(!elgamal.verify_disjunctive_encryption_proof(
            &ct,
            &zero_one,
            &proof,
            disjunctive_challenge_generator
        ));

        // Wrong number of transcripts
        let short = DisjunctiveProof {
            proofs: proof.proofs[..1].to_vec(),
        };
        assert!(!elgamal.verify_disjunctive_encryption_proof(
            &ct,
            &zero_one,
            &short,
            disjunctive_challenge_generator
        ));
    }

    #[test]
    fn test_real_index_out_of_range() {
        let (keypair, elgamal) = setup();
        let zero_one = vec![elgamal.encode_exponent(0), elgamal.encode_exponent(1)];
        let r = random_exponent(keypair.public_key.order());
        let ct = elgamal.encrypt_with_randomness(&zero_one[0], &r).unwrap();
        assert!(elgamal
            .generate_disjunctive_encryption_proof(&ct, &zero_one, 2, &r, disjunctive_challenge_generator)
            .is_err());
    }

    #[test]
    fn test_decryption_factor_proof() {
        let (keypair, elgamal) = setup();
        let (ct, _) = elgamal.encrypt(&elgamal.encode_exponent(3)).unwrap();

        let (factor, proof) = keypair.secret_key.decryption_factor_and_proof(&ct);
        assert!(elgamal.verify_decryption_factor(&ct, &factor, &proof, fiat_shamir_challenge_generator));

        let corrupted = &factor + 1u32;
        assert!(!elgamal.verify_decryption_factor(
            &ct,
            &corrupted,
            &proof,
            fiat_shamir_challenge_generator
        ));
    }

    #[test]
    fn test_decryption_proof() {
        let (keypair, elgamal) = setup();
        let m = elgamal.encode_exponent(9);
        let (ct, _) = elgamal.encrypt(&m).unwrap();

        let (plaintext, proof) = keypair.secret_key.prove_decryption(&ct).unwrap();
        assert_eq!(plaintext, m);
        assert!(elgamal.verify_decryption_proof(&ct, &plaintext, &proof, fiat_shamir_challenge_generator));
        assert!(!elgamal.verify_decryption_proof(
            &ct,
            &elgamal.encode_exponent(8),
            &proof,
            fiat_shamir_challenge_generator
        ));
    }

    #[test]
    fn test_proof_json_shape() {
        let proof = ZkProof {
            commitment: Commitment {
                a: BigUint::from(1u32),
                b: BigUint::from(2u32),
            },
            challenge: BigUint::from(3u32),
            response: BigUint::from(4u32),
        };
        let json = serde_json::to_value(DisjunctiveProof {
            proofs: vec![proof.clone()],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "commitment": {"A": "1", "B": "2"},
                "challenge": "3",
                "response": "4"
            }])
        );
        let back: DisjunctiveProof = serde_json::from_value(json).unwrap();
        assert_eq!(back.proofs, vec![proof]);
    }

    #[test]
    fn test_challenge_generators_are_deterministic() {
        let c = Commitment {
            a: BigUint::from(10u32),
            b: BigUint::from(20u32),
        };
        assert_eq!(
            fiat_shamir_challenge_generator(&c),
            disjunctive_challenge_generator(&[c.clone()])
        );
        assert_ne!(
            disjunctive_challenge_generator(&[c.clone()]),
            disjunctive_challenge_generator(&[c.clone(), c])
        );
    }
}
