//! A voter's full encrypted ballot

use log::warn;
use serde::{Deserialize, Serialize};

use crate::answer::EncryptedAnswer;
use crate::election::Election;
use crate::error::{BallotRejection, Result, TallyError};
use crate::schema::Datatype;
use crate::utils::hash_b64;

/// One encrypted answer per question, bound to an election
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVote {
    #[serde(rename = "answers")]
    pub encrypted_answers: Vec<EncryptedAnswer>,
    pub election_hash: String,
    pub election_uuid: String,
}

impl EncryptedVote {
    /// Encrypt a ballot: `selections[i]` lists the chosen answers of question `i`.
    pub fn from_election_and_answers(election: &Election, selections: &[Vec<usize>]) -> Result<Self> {
        if selections.len() != election.questions.len() {
            return Err(TallyError::LengthMismatch(format!(
                "{} selections for {} questions",
                selections.len(),
                election.questions.len()
            )));
        }

        let encrypted_answers = election
            .questions
            .iter()
            .zip(selections)
            .map(|(question, selected)| {
                EncryptedAnswer::from_selections(
                    &election.public_key,
                    question.num_options(),
                    selected,
                    question.min,
                    question.max,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EncryptedVote {
            encrypted_answers,
            election_hash: election.hash.clone(),
            election_uuid: election.uuid.clone(),
        })
    }

    /// The ballot as cast, without audit data
    pub fn into_cast(self) -> Self {
        EncryptedVote {
            encrypted_answers: self
                .encrypted_answers
                .into_iter()
                .map(EncryptedAnswer::without_audit_data)
                .collect(),
            ..self
        }
    }

    /// Check the ballot against `election`, reporting the first problem found.
    pub fn check(&self, election: &Election) -> std::result::Result<(), BallotRejection> {
        if self.encrypted_answers.len() != election.questions.len() {
            return Err(BallotRejection::AnswerCountMismatch {
                expected: election.questions.len(),
                found: self.encrypted_answers.len(),
            });
        }

        if self.election_hash != election.hash {
            return Err(BallotRejection::ElectionHashMismatch);
        }

        if self.election_uuid != election.uuid {
            return Err(BallotRejection::ElectionUuidMismatch);
        }

        for (question_num, (answer, question)) in self
            .encrypted_answers
            .iter()
            .zip(&election.questions)
            .enumerate()
        {
            if answer.choices.len() != question.num_options() {
                return Err(BallotRejection::ChoiceCountMismatch {
                    question: question_num,
                    expected: question.num_options(),
                    found: answer.choices.len(),
                });
            }

            if !answer.verify(&election.public_key, question.min, question.max) {
                return Err(BallotRejection::InvalidAnswer {
                    question: question_num,
                });
            }
        }

        Ok(())
    }

    /// Whether the ballot may be admitted to `election`'s tally
    pub fn verify(&self, election: &Election) -> bool {
        match self.check(election) {
            Ok(()) => true,
            Err(rejection) => {
                warn!("Rejected ballot for election {}: {}", election.uuid, rejection);
                false
            }
        }
    }

    /// The ballot tracker: hash of the ballot's JSON
    pub fn get_hash(&self) -> Result<String> {
        Ok(hash_b64(&serde_json::to_string(self)?))
    }

    /// Serialize with its `legacy/EncryptedVote` datatype tag
    pub fn to_json(&self) -> Result<String> {
        Datatype::EncryptedVote(self.clone()).to_json()
    }

    /// Parse a ballot carrying the `legacy/EncryptedVote` datatype tag
    pub fn from_json(json: &str) -> Result<Self> {
        match Datatype::from_json(json)? {
            Datatype::EncryptedVote(vote) => Ok(vote),
            other => Err(TallyError::InvalidParameter(format!(
                "Expected legacy/EncryptedVote, got {}",
                other.tag()
            ))),
        }
    }
}
