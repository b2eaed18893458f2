//! Versioned, tagged (de)serialization of persisted objects
//!
//! Every stored document carries a `datatype` field naming its schema. The tag
//! is resolved by serde into a variant, so callers match on types rather than
//! inspecting strings.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tally::TallyRecord;
use crate::vote::EncryptedVote;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "datatype")]
pub enum Datatype {
    #[serde(rename = "legacy/Tally")]
    Tally(TallyRecord),
    #[serde(rename = "legacy/EncryptedVote")]
    EncryptedVote(EncryptedVote),
}

impl Datatype {
    /// The schema identifier written to `datatype`
    pub fn tag(&self) -> &'static str {
        match self {
            Datatype::Tally(_) => "legacy/Tally",
            Datatype::EncryptedVote(_) => "legacy/EncryptedVote",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
