//! Error types for the tallying core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TallyError>;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Bad vote: {0}")]
    BadVote(#[from] BallotRejection),

    #[error("No discrete log for the decrypted tally of question {question}, answer {answer}")]
    DiscreteLogNotFound { question: usize, answer: usize },

    #[error("Invalid key size: {0} bits (must be at least {1})")]
    InvalidKeySize(u64, u64),

    #[error("Failed to compute modular inverse")]
    ModularInverseError,

    #[error("Empty list provided for batch operation")]
    EmptyBatch,

    #[error("Mismatched lengths: {0}")]
    LengthMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    #[error("Election has no encrypted tally")]
    NotTallied,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a ballot was refused admission to a tally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BallotRejection {
    #[error("ballot has {found} answers, election has {expected} questions")]
    AnswerCountMismatch { expected: usize, found: usize },

    #[error("answer to question {question} has {found} choices, question has {expected} options")]
    ChoiceCountMismatch {
        question: usize,
        expected: usize,
        found: usize,
    },

    #[error("election hash does not match")]
    ElectionHashMismatch,

    #[error("election uuid does not match")]
    ElectionUuidMismatch,

    #[error("proofs for question {question} do not verify")]
    InvalidAnswer { question: usize },
}
