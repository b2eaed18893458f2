//! One voter's encrypted response to one question

use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::encryption::ElGamal;
use crate::error::{Result, TallyError};
use crate::homomorphic::HomomorphicOperations;
use crate::keys::PublicKey;
use crate::proofs::{disjunctive_challenge_generator, DisjunctiveProof, VerifiableOperations};
use crate::types::Ciphertext;
use crate::utils::mod_exp;

/// Encrypted selections for one question, with their range proofs.
///
/// `randomness` and `answer` are audit data: present only when the voter
/// chose to audit (spoil) the ballot instead of casting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAnswer {
    pub choices: Vec<Ciphertext>,
    pub individual_proofs: Vec<DisjunctiveProof>,
    #[serde(default)]
    pub overall_proof: Option<DisjunctiveProof>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serialize::option_big_uint_vec"
    )]
    pub randomness: Option<Vec<BigUint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<usize>>,
}

impl EncryptedAnswer {
    /// The group encodings `[g^min, ..., g^max]`
    pub fn generate_plaintexts(public_key: &PublicKey, min: usize, max: usize) -> Vec<BigUint> {
        (min..=max)
            .map(|k| mod_exp(&public_key.g, &BigUint::from(k), &public_key.p))
            .collect()
    }

    /// Check every choice encrypts 0 or 1 and, for bounded questions, that
    /// the number of selections lies in `[min, max]`.
    pub fn verify(&self, public_key: &PublicKey, min: usize, max: Option<usize>) -> bool {
        if self.choices.len() != self.individual_proofs.len() {
            return false;
        }

        let elgamal = ElGamal::new(public_key.clone());
        let zero_one = Self::generate_plaintexts(public_key, 0, 1);

        for (i, (choice, proof)) in self.choices.iter().zip(&self.individual_proofs).enumerate() {
            if !elgamal.is_member(choice) {
                debug!("Choice {} is not a subgroup element", i);
                return false;
            }
            if !elgamal.verify_disjunctive_encryption_proof(
                choice,
                &zero_one,
                proof,
                disjunctive_challenge_generator,
            ) {
                debug!("Individual proof for choice {} does not verify", i);
                return false;
            }
        }

        // Approval voting: no bound on the number of selections
        let Some(max) = max else {
            return true;
        };

        let Some(overall_proof) = &self.overall_proof else {
            debug!("Bounded answer is missing its overall proof");
            return false;
        };

        let Ok(product) = elgamal.homomorphic_batch_operation(&self.choices) else {
            return false;
        };

        let plaintexts = Self::generate_plaintexts(public_key, min, max);
        elgamal.verify_disjunctive_encryption_proof(
            &product,
            &plaintexts,
            overall_proof,
            disjunctive_challenge_generator,
        )
    }

    /// Re-encrypt every choice from the disclosed selections and randomness
    /// and compare with the published ciphertexts.
    ///
    /// Returns `false` when the audit data is missing or inconsistent.
    pub fn verify_plaintexts_and_randomness(&self, public_key: &PublicKey) -> bool {
        let (Some(answer), Some(randomness)) = (&self.answer, &self.randomness) else {
            return false;
        };
        if randomness.len() != self.choices.len() || answer.iter().any(|&i| i >= self.choices.len()) {
            return false;
        }

        let elgamal = ElGamal::new(public_key.clone());
        let selected: BTreeSet<usize> = answer.iter().copied().collect();
        if selected.len() != answer.len() {
            return false;
        }

        self.choices
            .iter()
            .zip(randomness)
            .enumerate()
            .all(|(i, (choice, r))| {
                let plaintext = elgamal.encode_exponent(u64::from(selected.contains(&i)));
                elgamal
                    .encrypt_with_randomness(&plaintext, r)
                    .map(|ct| &ct == choice)
                    .unwrap_or(false)
            })
    }

    /// Encrypt a voter's selections (indices into the question's answers)
    /// and build the proofs a bounded or approval question requires.
    pub fn from_selections(
        public_key: &PublicKey,
        num_options: usize,
        selected: &[usize],
        min: usize,
        max: Option<usize>,
    ) -> Result<Self> {
        let selection: BTreeSet<usize> = selected.iter().copied().collect();
        if selection.len() != selected.len() {
            return Err(TallyError::InvalidParameter(
                "Duplicate selection".to_string(),
            ));
        }
        if let Some(&out_of_range) = selection.iter().find(|&&i| i >= num_options) {
            return Err(TallyError::InvalidParameter(format!(
                "Selection {} outside {} answers",
                out_of_range, num_options
            )));
        }
        let upper = max.unwrap_or(num_options);
        if selection.len() < min || selection.len() > upper {
            return Err(TallyError::InvalidParameter(format!(
                "{} selections outside [{}, {}]",
                selection.len(),
                min,
                upper
            )));
        }

        let elgamal = ElGamal::new(public_key.clone());
        let zero_one = Self::generate_plaintexts(public_key, 0, 1);

        let mut choices = Vec::with_capacity(num_options);
        let mut individual_proofs = Vec::with_capacity(num_options);
        let mut randomness = Vec::with_capacity(num_options);

        for i in 0..num_options {
            let real_index = usize::from(selection.contains(&i));
            let (choice, r) = elgamal.encrypt(&zero_one[real_index])?;
            let proof = elgamal.generate_disjunctive_encryption_proof(
                &choice,
                &zero_one,
                real_index,
                &r,
                disjunctive_challenge_generator,
            )?;

            choices.push(choice);
            individual_proofs.push(proof);
            randomness.push(r);
        }

        let overall_proof = match max {
            Some(max) => {
                let product = elgamal.homomorphic_batch_operation(&choices)?;
                let total_randomness = randomness
                    .iter()
                    .fold(BigUint::zero(), |acc, r| acc + r)
                    % &public_key.q;
                let plaintexts = Self::generate_plaintexts(public_key, min, max);

                Some(elgamal.generate_disjunctive_encryption_proof(
                    &product,
                    &plaintexts,
                    selection.len() - min,
                    &total_randomness,
                    disjunctive_challenge_generator,
                )?)
            }
            None => None,
        };

        Ok(EncryptedAnswer {
            choices,
            individual_proofs,
            overall_proof,
            randomness: Some(randomness),
            answer: Some(selection.into_iter().collect()),
        })
    }

    /// Drop the audit data, leaving what gets cast
    pub fn without_audit_data(self) -> Self {
        EncryptedAnswer {
            randomness: None,
            answer: None,
            ..self
        }
    }
}
