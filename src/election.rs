//! Election descriptor consumed by verification and tallying

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::keys::PublicKey;
use crate::utils::hash_b64;

/// One question of an election.
///
/// `max` is required on the wire; `null` there means no upper bound
/// (approval voting).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub short_name: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub min: usize,
    #[serde(deserialize_with = "Option::deserialize")]
    pub max: Option<usize>,
}

impl Question {
    /// A question with at least `min` and at most `max` selections
    pub fn new(question: impl Into<String>, answers: Vec<String>, min: usize, max: usize) -> Self {
        Question {
            question: question.into(),
            short_name: String::new(),
            answers,
            min,
            max: Some(max),
        }
    }

    /// A question where any subset of answers may be selected
    pub fn approval(question: impl Into<String>, answers: Vec<String>) -> Self {
        Question {
            question: question.into(),
            short_name: String::new(),
            answers,
            min: 0,
            max: None,
        }
    }

    pub fn num_options(&self) -> usize {
        self.answers.len()
    }

    fn validate(&self) -> Result<()> {
        if self.answers.is_empty() {
            return Err(TallyError::InvalidParameter(format!(
                "Question '{}' has no answers",
                self.question
            )));
        }
        if let Some(max) = self.max {
            if self.min > max || max > self.answers.len() {
                return Err(TallyError::InvalidParameter(format!(
                    "Question '{}' needs min <= max <= {}, got [{}, {}]",
                    self.question,
                    self.answers.len(),
                    self.min,
                    max
                )));
            }
        } else if self.min > self.answers.len() {
            return Err(TallyError::InvalidParameter(format!(
                "Question '{}' requires more selections than it has answers",
                self.question
            )));
        }
        Ok(())
    }
}

/// A frozen election definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub uuid: String,
    pub hash: String,
    pub questions: Vec<Question>,
    pub public_key: PublicKey,
}

#[derive(Serialize)]
struct HashedFields<'a> {
    uuid: &'a str,
    questions: &'a [Question],
    public_key: &'a PublicKey,
}

impl Election {
    /// Freeze an election, computing its content hash
    pub fn new(uuid: impl Into<String>, questions: Vec<Question>, public_key: PublicKey) -> Result<Self> {
        for question in &questions {
            question.validate()?;
        }

        let uuid = uuid.into();
        let hash = Self::compute_hash(&uuid, &questions, &public_key)?;

        Ok(Election {
            uuid,
            hash,
            questions,
            public_key,
        })
    }

    fn compute_hash(uuid: &str, questions: &[Question], public_key: &PublicKey) -> Result<String> {
        let json = serde_json::to_string(&HashedFields {
            uuid,
            questions,
            public_key,
        })?;
        Ok(hash_b64(&json))
    }

    /// Whether `hash` still matches the election's content
    pub fn hash_is_current(&self) -> Result<bool> {
        Ok(self.hash == Self::compute_hash(&self.uuid, &self.questions, &self.public_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {}", i)).collect()
    }

    #[test]
    fn test_hash_binds_content() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let q = Question::new("Pick one", labels(2), 0, 1);
        let a = Election::new("e1", vec![q.clone()], keypair.public_key.clone()).unwrap();
        let b = Election::new("e2", vec![q], keypair.public_key.clone()).unwrap();

        assert_ne!(a.hash, b.hash);
        assert!(a.hash_is_current().unwrap());

        let mut tampered = a.clone();
        tampered.questions[0].max = Some(2);
        assert!(!tampered.hash_is_current().unwrap());
    }

    #[test]
    fn test_max_must_be_present() {
        let missing: std::result::Result<Question, _> =
            serde_json::from_str(r#"{"answers": ["a", "b"], "min": 0}"#);
        assert!(missing.is_err());

        let approval: Question =
            serde_json::from_str(r#"{"answers": ["a", "b"], "max": null}"#).unwrap();
        assert_eq!(approval.max, None);
        assert_eq!(approval.min, 0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let pk = keypair.public_key;

        let too_many = Question::new("q", labels(2), 0, 3);
        assert!(Election::new("e", vec![too_many], pk.clone()).is_err());

        let inverted = Question::new("q", labels(3), 2, 1);
        assert!(Election::new("e", vec![inverted], pk.clone()).is_err());

        let empty = Question::approval("q", vec![]);
        assert!(Election::new("e", vec![empty], pk).is_err());
    }
}
