//! Serde adapters that carry big integers as decimal strings.
//!
//! Decimal strings keep values portable to consumers without native big
//! integer support. Deserialization also accepts plain JSON integers.

use num_bigint::BigUint;
use num_traits::Num;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize)]
#[serde(transparent)]
struct SerializeBigUint<'a>(#[serde(serialize_with = "big_uint::serialize")] &'a BigUint);

#[derive(Deserialize)]
#[serde(transparent)]
struct DeserializeBigUint(#[serde(deserialize_with = "big_uint::deserialize")] BigUint);

pub mod big_uint {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrUint {
        String(String),
        Uint(u64),
    }

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_str_radix(10).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StringOrUint::deserialize(deserializer)? {
            StringOrUint::String(s) => BigUint::from_str_radix(&s, 10).map_err(de::Error::custom),
            StringOrUint::Uint(u) => Ok(BigUint::from(u)),
        }
    }
}

/// `Option<Vec<BigUint>>`, used for audit randomness.
pub mod option_big_uint_vec {
    use super::*;

    pub fn serialize<S>(value: &Option<Vec<BigUint>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .as_ref()
            .map(|v| v.iter().map(SerializeBigUint).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<BigUint>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<DeserializeBigUint>> = Deserialize::deserialize(deserializer)?;
        Ok(raw.map(|v| v.into_iter().map(|d| d.0).collect()))
    }
}

/// `Vec<Vec<BigUint>>` shaped like a tally, used for decryption factors.
pub mod big_uint_matrix {
    use super::*;

    pub fn serialize<S>(value: &[Vec<BigUint>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .iter()
            .map(|row| row.iter().map(SerializeBigUint).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<BigUint>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<Vec<DeserializeBigUint>> = Deserialize::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|row| row.into_iter().map(|d| d.0).collect())
            .collect())
    }
}

pub mod option_big_uint_matrix {
    use super::*;

    pub fn serialize<S>(value: &Option<Vec<Vec<BigUint>>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(matrix) => serializer.serialize_some(&Matrix(matrix)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<Vec<BigUint>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<Vec<DeserializeBigUint>>> = Deserialize::deserialize(deserializer)?;
        Ok(raw.map(|m| {
            m.into_iter()
                .map(|row| row.into_iter().map(|d| d.0).collect())
                .collect()
        }))
    }

    #[derive(Serialize)]
    #[serde(transparent)]
    struct Matrix<'a>(#[serde(serialize_with = "super::big_uint_matrix::serialize")] &'a [Vec<BigUint>]);
}
