//! Homomorphic tally of an election and its verifiable decryption
//!
//! A tally moves through: accumulating (`add_vote`, `add_vote_batch`), closed
//! (the caller stops adding votes), factors requested (one
//! `decryption_factors_and_proofs` call per trustee), and decrypted
//! (`decrypt_from_factors`). Closing the election is the caller's decision;
//! `Tally` does not enforce it.

use log::{debug, error, info, warn};
use num_bigint::BigUint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dlog::DLogTable;
use crate::election::Election;
use crate::encryption::ElGamal;
use crate::error::{BallotRejection, Result, TallyError};
use crate::homomorphic::HomomorphicOperations;
use crate::keys::{DecryptionKey, PublicKey};
use crate::proofs::{Commitment, VerifiableOperations, ZkProof};
use crate::schema::Datatype;
use crate::types::{Ciphertext, TallyConfig};
use crate::vote::EncryptedVote;

/// Persisted form of a tally
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRecord {
    pub tally: Vec<Vec<Ciphertext>>,
    pub num_tallied: u64,
}

/// Running encrypted tally, one ciphertext per answer of every question
#[derive(Clone, Debug)]
pub struct Tally {
    election: Election,
    elgamal: ElGamal,
    tally: Vec<Vec<Ciphertext>>,
    num_tallied: u64,
    config: TallyConfig,
}

impl Tally {
    /// Create an empty tally for `election`
    pub fn new(election: &Election) -> Self {
        Self::with_config(election, TallyConfig::default())
    }

    /// Create an empty tally with custom configuration
    pub fn with_config(election: &Election, config: TallyConfig) -> Self {
        let tally = election
            .questions
            .iter()
            .map(|q| vec![Ciphertext::identity(); q.num_options()])
            .collect();

        Tally {
            election: election.clone(),
            elgamal: ElGamal::new(election.public_key.clone()),
            tally,
            num_tallied: 0,
            config,
        }
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// The encrypted cells, indexed `[question][answer]`
    pub fn tally(&self) -> &[Vec<Ciphertext>] {
        &self.tally
    }

    /// Number of ballots folded in so far
    pub fn num_tallied(&self) -> u64 {
        self.num_tallied
    }

    /// Fold one ballot into the tally.
    ///
    /// With `verify` set, a ballot that does not check out against the
    /// election is rejected with [`TallyError::BadVote`] and the tally is left
    /// untouched. Adding the same ballot twice counts it twice.
    pub fn add_vote(&mut self, vote: &EncryptedVote, verify: bool) -> Result<()> {
        if verify {
            if let Err(rejection) = vote.check(&self.election) {
                warn!(
                    "Rejected ballot for election {}: {}",
                    self.election.uuid, rejection
                );
                return Err(TallyError::BadVote(rejection));
            }
        }

        self.tally = self.folded(vote)?;
        self.num_tallied += 1;
        debug!("Folded ballot {} into tally", self.num_tallied);

        Ok(())
    }

    /// Fold ballots in order.
    ///
    /// When `verify` is set the ballots are checked first, in parallel unless
    /// the configuration disables it. Ballots before the first rejected one
    /// stay counted; the rejected one and everything after it are not.
    pub fn add_vote_batch(&mut self, votes: &[EncryptedVote], verify: bool) -> Result<()> {
        let first_rejection = if verify {
            self.first_rejection(votes)
        } else {
            None
        };
        let admitted = first_rejection.as_ref().map_or(votes.len(), |(index, _)| *index);

        for vote in &votes[..admitted] {
            self.add_vote(vote, false)?;
        }

        match first_rejection {
            Some((index, rejection)) => {
                warn!(
                    "Batch stopped at ballot {} of {}: {}",
                    index,
                    votes.len(),
                    rejection
                );
                Err(TallyError::BadVote(rejection))
            }
            None => Ok(()),
        }
    }

    fn first_rejection(&self, votes: &[EncryptedVote]) -> Option<(usize, BallotRejection)> {
        let election = &self.election;
        if self.config.parallel_verification {
            votes
                .par_iter()
                .enumerate()
                .find_map_first(|(i, vote)| vote.check(election).err().map(|r| (i, r)))
        } else {
            votes
                .iter()
                .enumerate()
                .find_map(|(i, vote)| vote.check(election).err().map(|r| (i, r)))
        }
    }

    /// The tally with `vote` multiplied in, or an error if the shapes differ
    fn folded(&self, vote: &EncryptedVote) -> Result<Vec<Vec<Ciphertext>>> {
        if vote.encrypted_answers.len() != self.tally.len() {
            return Err(TallyError::LengthMismatch(format!(
                "ballot has {} answers, tally has {} questions",
                vote.encrypted_answers.len(),
                self.tally.len()
            )));
        }

        self.tally
            .iter()
            .zip(&vote.encrypted_answers)
            .enumerate()
            .map(|(question_num, (cells, answer))| {
                if answer.choices.len() != cells.len() {
                    return Err(TallyError::LengthMismatch(format!(
                        "question {}: ballot has {} choices, tally has {}",
                        question_num,
                        answer.choices.len(),
                        cells.len()
                    )));
                }

                Ok(cells
                    .iter()
                    .zip(&answer.choices)
                    .map(|(cell, choice)| self.elgamal.homomorphic_operation(cell, choice))
                    .collect())
            })
            .collect()
    }

    /// A trustee's decryption factor for every cell, with proofs that each
    /// factor matches the trustee's public key
    pub fn decryption_factors_and_proofs<K>(&self, key: &K) -> (Vec<Vec<BigUint>>, Vec<Vec<ZkProof>>)
    where
        K: DecryptionKey + ?Sized,
    {
        self.tally
            .iter()
            .map(|cells| -> (Vec<BigUint>, Vec<ZkProof>) {
                cells
                    .iter()
                    .map(|cell| key.decryption_factor_and_proof(cell))
                    .unzip()
            })
            .unzip()
    }

    /// Decrypt every cell with a single trustee's key, returning the counts
    /// and a proof of correct decryption for each.
    ///
    /// Without a supplied table, one is built for this call covering
    /// `[0, num_tallied]`.
    pub fn decrypt_and_prove<K>(
        &self,
        key: &K,
        discrete_logs: Option<&DLogTable>,
    ) -> Result<(Vec<Vec<u64>>, Vec<Vec<ZkProof>>)>
    where
        K: DecryptionKey + ?Sized,
    {
        let scoped;
        let table = match discrete_logs {
            Some(table) => table,
            None => {
                scoped = self.fresh_dlog_table();
                &scoped
            }
        };

        let mut counts = Vec::with_capacity(self.tally.len());
        let mut proofs = Vec::with_capacity(self.tally.len());

        for (question_num, cells) in self.tally.iter().enumerate() {
            let mut question_counts = Vec::with_capacity(cells.len());
            let mut question_proofs = Vec::with_capacity(cells.len());

            for (answer_num, cell) in cells.iter().enumerate() {
                let (plaintext, proof) = key.prove_decryption(cell)?;
                question_counts.push(Self::resolve(table, &plaintext, question_num, answer_num)?);
                question_proofs.push(proof);
            }

            counts.push(question_counts);
            proofs.push(question_proofs);
        }

        info!(
            "Decrypted tally of election {} over {} ballots",
            self.election.uuid, self.num_tallied
        );
        Ok((counts, proofs))
    }

    /// Check that every factor is the cell's alpha raised to the secret behind
    /// `public_key`. A single failing cell fails the whole check, as does a
    /// key that is malformed or outside the election's group.
    pub fn verify_decryption_proofs(
        &self,
        decryption_factors: &[Vec<BigUint>],
        decryption_proofs: &[Vec<ZkProof>],
        public_key: &PublicKey,
        challenge_generator: impl Fn(&Commitment) -> BigUint,
    ) -> bool {
        if let Err(e) = public_key.validate() {
            warn!("Rejected trustee key: {}", e);
            return false;
        }
        if !public_key.same_group(&self.election.public_key) {
            warn!("Trustee key is not in the group of election {}", self.election.uuid);
            return false;
        }

        if self.check_shape("decryption factors", decryption_factors).is_err()
            || self.check_shape("decryption proofs", decryption_proofs).is_err()
        {
            return false;
        }

        let elgamal = ElGamal::new(public_key.clone());
        for (question_num, cells) in self.tally.iter().enumerate() {
            for (answer_num, cell) in cells.iter().enumerate() {
                let factor = &decryption_factors[question_num][answer_num];
                let proof = &decryption_proofs[question_num][answer_num];

                if !elgamal.verify_decryption_factor(cell, factor, proof, &challenge_generator) {
                    warn!(
                        "Decryption proof failed for question {}, answer {}",
                        question_num, answer_num
                    );
                    return false;
                }
            }
        }

        true
    }

    /// Combine every trustee's factors and recover the plaintext counts.
    ///
    /// `factors_by_trustee` holds one tally-shaped factor matrix per trustee.
    /// A count that is not found in `[0, num_tallied]` means the inputs are
    /// corrupt and aborts the decryption.
    pub fn decrypt_from_factors(
        &self,
        factors_by_trustee: &[Vec<Vec<BigUint>>],
        public_key: &PublicKey,
    ) -> Result<Vec<Vec<u64>>> {
        if factors_by_trustee.is_empty() {
            return Err(TallyError::InvalidParameter(
                "No decryption factors supplied".to_string(),
            ));
        }
        for factors in factors_by_trustee {
            self.check_shape("decryption factors", factors)?;
        }

        let table = self.fresh_dlog_table();

        let counts = self
            .tally
            .iter()
            .enumerate()
            .map(|(question_num, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(answer_num, cell)| {
                        let factors: Vec<BigUint> = factors_by_trustee
                            .iter()
                            .map(|f| f[question_num][answer_num].clone())
                            .collect();
                        let plaintext = cell.decrypt(&factors, public_key)?;
                        Self::resolve(&table, &plaintext, question_num, answer_num)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Combined decryption factors of {} trustees for election {}",
            factors_by_trustee.len(),
            self.election.uuid
        );
        Ok(counts)
    }

    fn fresh_dlog_table(&self) -> DLogTable {
        let pk = &self.elgamal.public_key;
        let mut table = DLogTable::new(pk.g.clone(), pk.p.clone());
        table.precompute(self.num_tallied);
        table
    }

    fn resolve(table: &DLogTable, plaintext: &BigUint, question: usize, answer: usize) -> Result<u64> {
        table.lookup(plaintext).ok_or_else(|| {
            error!(
                "No discrete log for question {}, answer {} within {} ballots",
                question,
                answer,
                table.max_exponent()
            );
            TallyError::DiscreteLogNotFound { question, answer }
        })
    }

    fn check_shape<T>(&self, what: &str, matrix: &[Vec<T>]) -> Result<()> {
        let matches = matrix.len() == self.tally.len()
            && matrix
                .iter()
                .zip(&self.tally)
                .all(|(row, cells)| row.len() == cells.len());

        if matches {
            Ok(())
        } else {
            Err(TallyError::LengthMismatch(format!(
                "{} are not shaped like the tally",
                what
            )))
        }
    }

    pub fn to_record(&self) -> TallyRecord {
        TallyRecord {
            tally: self.tally.clone(),
            num_tallied: self.num_tallied,
        }
    }

    /// Restore a persisted tally for `election`
    pub fn from_record(record: TallyRecord, election: &Election) -> Result<Self> {
        Self::from_record_with_config(record, election, TallyConfig::default())
    }

    /// Restore a persisted tally, refusing ballot counts above
    /// `config.max_num_tallied`
    pub fn from_record_with_config(
        record: TallyRecord,
        election: &Election,
        config: TallyConfig,
    ) -> Result<Self> {
        if record.num_tallied > config.max_num_tallied {
            error!(
                "Persisted tally of election {} claims {} ballots, limit is {}",
                election.uuid, record.num_tallied, config.max_num_tallied
            );
            return Err(TallyError::InvalidParameter(format!(
                "num_tallied {} exceeds the limit of {}",
                record.num_tallied, config.max_num_tallied
            )));
        }

        let mut tally = Self::with_config(election, config);
        tally.check_shape("persisted tally cells", &record.tally)?;
        tally.tally = record.tally;
        tally.num_tallied = record.num_tallied;

        Ok(tally)
    }

    /// Serialize with its `legacy/Tally` datatype tag
    pub fn to_json(&self) -> Result<String> {
        Datatype::Tally(self.to_record()).to_json()
    }

    /// Parse a tally carrying the `legacy/Tally` datatype tag
    pub fn from_json(json: &str, election: &Election) -> Result<Self> {
        match Datatype::from_json(json)? {
            Datatype::Tally(record) => Self::from_record(record, election),
            other => Err(TallyError::InvalidParameter(format!(
                "Expected legacy/Tally, got {}",
                other.tag()
            ))),
        }
    }
}
