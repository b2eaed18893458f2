//! Entry points wiring the tally to an election's ballot and trustee records

use log::{info, warn};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::election::Election;
use crate::error::{Result, TallyError};
use crate::keys::{DecryptionKey, PublicKey};
use crate::proofs::{dlog_challenge_generator, fiat_shamir_challenge_generator, ProofOfKnowledge, ZkProof};
use crate::tally::Tally;
use crate::utils::hash_b64;
use crate::vote::EncryptedVote;

/// A registered voter and the ballot they cast, if any
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub uuid: String,
    #[serde(default)]
    pub vote: Option<EncryptedVote>,
}

impl Voter {
    pub fn new(uuid: impl Into<String>) -> Self {
        Voter {
            uuid: uuid.into(),
            vote: None,
        }
    }

    /// Record a cast ballot, replacing any earlier one
    pub fn cast(&mut self, vote: EncryptedVote) {
        self.vote = Some(vote);
    }
}

/// Source of the ballots cast in an election
pub trait BallotStore {
    fn cast_votes(&self) -> Box<dyn Iterator<Item = &EncryptedVote> + '_>;
}

impl BallotStore for [Voter] {
    fn cast_votes(&self) -> Box<dyn Iterator<Item = &EncryptedVote> + '_> {
        Box::new(self.iter().filter_map(|voter| voter.vote.as_ref()))
    }
}

impl BallotStore for Vec<Voter> {
    fn cast_votes(&self) -> Box<dyn Iterator<Item = &EncryptedVote> + '_> {
        self.as_slice().cast_votes()
    }
}

/// A trustee's public record: key, proof of key possession and uploaded
/// partial decryption
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trustee {
    pub uuid: String,
    pub public_key: PublicKey,
    #[serde(default)]
    pub pok: Option<ProofOfKnowledge>,
    #[serde(default, with = "crate::serialize::option_big_uint_matrix")]
    pub decryption_factors: Option<Vec<Vec<BigUint>>>,
    #[serde(default)]
    pub decryption_proofs: Option<Vec<Vec<ZkProof>>>,
}

impl Trustee {
    pub fn new(uuid: impl Into<String>, public_key: PublicKey, pok: Option<ProofOfKnowledge>) -> Self {
        Trustee {
            uuid: uuid.into(),
            public_key,
            pok,
            decryption_factors: None,
            decryption_proofs: None,
        }
    }

    /// Whether the trustee proved knowledge of the secret behind its key
    pub fn verify_public_key(&self) -> bool {
        self.pok
            .as_ref()
            .is_some_and(|pok| self.public_key.verify_sk_proof(pok, dlog_challenge_generator))
    }
}

/// An election and, once computed, its encrypted tally
#[derive(Clone, Debug)]
pub struct ElectionRecord {
    pub election: Election,
    pub encrypted_tally: Option<Tally>,
}

impl ElectionRecord {
    pub fn new(election: Election) -> Self {
        ElectionRecord {
            election,
            encrypted_tally: None,
        }
    }

    fn tally(&self) -> Result<&Tally> {
        self.encrypted_tally.as_ref().ok_or(TallyError::NotTallied)
    }
}

/// The election key: product of every trustee's key
pub fn combine_public_keys(trustees: &[Trustee]) -> Result<PublicKey> {
    let (first, rest) = trustees.split_first().ok_or_else(|| {
        TallyError::InvalidParameter("An election needs at least one trustee".to_string())
    })?;

    rest.iter()
        .try_fold(first.public_key.clone(), |key, trustee| key.combine(&trustee.public_key))
}

pub fn tallied(record: &ElectionRecord) -> bool {
    record.encrypted_tally.is_some()
}

pub fn ready_for_decryption(record: &ElectionRecord) -> bool {
    tallied(record)
}

/// Whether there are trustees and every one has uploaded a partial decryption
pub fn ready_for_decryption_combination(record: &ElectionRecord, trustees: &[Trustee]) -> bool {
    tallied(record)
        && !trustees.is_empty()
        && trustees
            .iter()
            .all(|t| t.decryption_factors.is_some() && t.decryption_proofs.is_some())
}

/// Fold every cast ballot into a fresh tally stored on the record.
///
/// Ballots are verified when cast, so they are not verified again here.
pub fn compute_tally<S>(record: &mut ElectionRecord, store: &S) -> Result<()>
where
    S: BallotStore + ?Sized,
{
    let mut tally = Tally::new(&record.election);
    for vote in store.cast_votes() {
        tally.add_vote(vote, false)?;
    }

    info!(
        "Computed encrypted tally of election {} over {} ballots",
        record.election.uuid,
        tally.num_tallied()
    );
    record.encrypted_tally = Some(tally);

    Ok(())
}

/// Hash of the tagged tally JSON, `None` before tallying
pub fn tally_hash(record: &ElectionRecord) -> Result<Option<String>> {
    match &record.encrypted_tally {
        Some(tally) => Ok(Some(hash_b64(&tally.to_json()?))),
        None => Ok(None),
    }
}

/// Recover the counts from every trustee's factors
pub fn decrypt_tally(record: &ElectionRecord, factors_by_trustee: &[Vec<Vec<BigUint>>]) -> Result<Vec<Vec<u64>>> {
    record
        .tally()?
        .decrypt_from_factors(factors_by_trustee, &record.election.public_key)
}

/// A trustee's factors and proofs for the record's tally
pub fn get_decryption_factors_and_proof<K>(
    record: &ElectionRecord,
    key: &K,
) -> Result<(Vec<Vec<BigUint>>, Vec<Vec<ZkProof>>)>
where
    K: DecryptionKey + ?Sized,
{
    Ok(record.tally()?.decryption_factors_and_proofs(key))
}

/// Check a trustee's uploaded partial decryption; `false` if nothing was uploaded
pub fn verify_encryption_proof(record: &ElectionRecord, trustee: &Trustee) -> Result<bool> {
    let tally = record.tally()?;
    let (Some(factors), Some(proofs)) = (&trustee.decryption_factors, &trustee.decryption_proofs) else {
        return Ok(false);
    };

    Ok(tally.verify_decryption_proofs(
        factors,
        proofs,
        &trustee.public_key,
        fiat_shamir_challenge_generator,
    ))
}

/// Verify every trustee's partial decryption, then combine them.
///
/// The trustees' keys must multiply to the election key.
pub fn combine_decryptions(record: &ElectionRecord, trustees: &[Trustee]) -> Result<Vec<Vec<u64>>> {
    if combine_public_keys(trustees)? != record.election.public_key {
        warn!(
            "Trustee keys do not combine to the key of election {}",
            record.election.uuid
        );
        return Err(TallyError::CryptoError(
            "Trustee keys do not combine to the election key".to_string(),
        ));
    }

    let mut factors_by_trustee = Vec::with_capacity(trustees.len());
    for trustee in trustees {
        if !verify_encryption_proof(record, trustee)? {
            warn!("Partial decryption of trustee {} does not verify", trustee.uuid);
            return Err(TallyError::CryptoError(format!(
                "Partial decryption of trustee {} is missing or invalid",
                trustee.uuid
            )));
        }
        if let Some(factors) = &trustee.decryption_factors {
            factors_by_trustee.push(factors.clone());
        }
    }

    decrypt_tally(record, &factors_by_trustee)
}
