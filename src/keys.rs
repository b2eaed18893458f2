//! Key generation and management

use num_bigint::BigUint;
use num_traits::{Num, One};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TallyError};
use crate::proofs::{ProofOfKnowledge, ZkProof};
use crate::types::{Ciphertext, TallyConfig};
use crate::utils::{find_subgroup_generator, generate_safe_prime, mod_div, mod_exp, random_exponent};

/// 768-bit safe prime from RFC 2409 (Oakley group 1). 2 generates its
/// subgroup of prime order q = (p - 1) / 2.
const TEST_GROUP_PRIME: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
                                020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
                                4FE1356D6D51C245E485B576625E7EC6F44C42E9A63A3620FFFFFFFFFFFFFFFF";
const TEST_GROUP_GENERATOR: u32 = 2;

/// ElGamal public key over the order-q subgroup of Z_p^*
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) g: BigUint, // Generator of the order-q subgroup
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) p: BigUint, // Prime modulus
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) q: BigUint, // Subgroup order
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) y: BigUint, // g^x mod p
}

impl PublicKey {
    /// Create a new public key
    pub fn new(p: BigUint, q: BigUint, g: BigUint, y: BigUint) -> Self {
        PublicKey { g, p, q, y }
    }

    /// Get the prime modulus
    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /// Get the order of the subgroup generated by `g`
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// Get the generator
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Get the public component (g^x mod p)
    pub fn y(&self) -> &BigUint {
        &self.y
    }

    /// Get the bit size of the modulus
    pub fn bit_size(&self) -> u64 {
        self.p.bits()
    }

    /// Whether both keys live in the same group
    pub fn same_group(&self, other: &PublicKey) -> bool {
        self.p == other.p && self.q == other.q && self.g == other.g
    }

    /// Validate the public key
    pub fn validate(&self) -> Result<()> {
        if self.p <= BigUint::from(2u32) {
            return Err(TallyError::InvalidParameter(
                "Modulus p must be > 2".to_string(),
            ));
        }

        if &self.q * 2u32 + 1u32 != self.p {
            return Err(TallyError::InvalidParameter(
                "Order q must satisfy p = 2q + 1".to_string(),
            ));
        }

        if self.g <= BigUint::one() || self.g >= self.p || !mod_exp(&self.g, &self.q, &self.p).is_one()
        {
            return Err(TallyError::InvalidParameter(
                "Generator g must generate the order-q subgroup".to_string(),
            ));
        }

        if self.y <= BigUint::one() || self.y >= self.p || !mod_exp(&self.y, &self.q, &self.p).is_one()
        {
            return Err(TallyError::InvalidParameter(
                "Public component y must be a non-trivial subgroup element".to_string(),
            ));
        }

        Ok(())
    }

    /// Combine two trustees' keys into the key their joint secret decrypts.
    pub fn combine(&self, other: &PublicKey) -> Result<PublicKey> {
        if !self.same_group(other) {
            return Err(TallyError::InvalidParameter(
                "Cannot combine keys from different groups".to_string(),
            ));
        }

        Ok(PublicKey {
            g: self.g.clone(),
            p: self.p.clone(),
            q: self.q.clone(),
            y: (&self.y * &other.y) % &self.p,
        })
    }

    /// Check a proof that the holder of this key knows its secret exponent.
    pub fn verify_sk_proof(
        &self,
        proof: &ProofOfKnowledge,
        challenge_generator: impl Fn(&BigUint) -> BigUint,
    ) -> bool {
        if self.validate().is_err() {
            return false;
        }

        // g^response = commitment * y^challenge
        let lhs = mod_exp(&self.g, &proof.response, &self.p);
        let rhs = (&proof.commitment * mod_exp(&self.y, &proof.challenge, &self.p)) % &self.p;

        lhs == rhs && proof.challenge == challenge_generator(&proof.commitment) % &self.q
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({} bits)", self.bit_size())
    }
}

/// ElGamal secret key, held by a trustee
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    #[serde(with = "crate::serialize::big_uint")]
    pub(crate) x: BigUint,
    pub(crate) public_key: PublicKey,
}

impl SecretKey {
    /// Create a new secret key
    pub fn new(x: BigUint, public_key: PublicKey) -> Self {
        SecretKey { x, public_key }
    }

    /// Get the secret exponent
    pub fn secret_exponent(&self) -> &BigUint {
        &self.x
    }

    /// alpha^x mod p
    pub fn decryption_factor(&self, ciphertext: &Ciphertext) -> BigUint {
        mod_exp(&ciphertext.alpha, &self.x, &self.public_key.p)
    }

    /// Recover the plaintext group element of a ciphertext.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint> {
        let factor = self.decryption_factor(ciphertext);
        mod_div(&ciphertext.beta, &factor, &self.public_key.p)
    }

    /// Schnorr proof of knowledge of `x`
    pub fn prove_sk(&self, challenge_generator: impl Fn(&BigUint) -> BigUint) -> ProofOfKnowledge {
        let pk = &self.public_key;
        let w = random_exponent(&pk.q);
        let commitment = mod_exp(&pk.g, &w, &pk.p);
        let challenge = challenge_generator(&commitment) % &pk.q;
        let response = (w + &self.x * &challenge) % &pk.q;

        ProofOfKnowledge {
            commitment,
            challenge,
            response,
        }
    }

    /// Chaum-Pedersen proof that log_g(y) == log_alpha(alpha^x)
    fn dh_tuple_proof(&self, ciphertext: &Ciphertext) -> ZkProof {
        let pk = &self.public_key;
        ZkProof::generate(
            &pk.g,
            &ciphertext.alpha,
            &self.x,
            &pk.p,
            &pk.q,
            crate::proofs::fiat_shamir_challenge_generator,
        )
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(***)")
    }
}

/// What the tally needs from a trustee's key to decrypt it verifiably.
pub trait DecryptionKey {
    /// The public half of the key
    fn public_key(&self) -> &PublicKey;

    /// alpha^x for `ciphertext`, with a proof that it matches `public_key().y`
    fn decryption_factor_and_proof(&self, ciphertext: &Ciphertext) -> (BigUint, ZkProof);

    /// The plaintext group element of `ciphertext`, with a proof of correct decryption
    fn prove_decryption(&self, ciphertext: &Ciphertext) -> Result<(BigUint, ZkProof)>;
}

impl DecryptionKey for SecretKey {
    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn decryption_factor_and_proof(&self, ciphertext: &Ciphertext) -> (BigUint, ZkProof) {
        let factor = self.decryption_factor(ciphertext);
        let proof = self.dh_tuple_proof(ciphertext);
        (factor, proof)
    }

    fn prove_decryption(&self, ciphertext: &Ciphertext) -> Result<(BigUint, ZkProof)> {
        let plaintext = self.decrypt(ciphertext)?;
        let proof = self.dh_tuple_proof(ciphertext);
        Ok((plaintext, proof))
    }
}

/// ElGamal key pair
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

impl KeyPair {
    /// Generate a new ElGamal key pair with specified bit size
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vtally::KeyPair;
    ///
    /// let keypair = KeyPair::generate(1024).expect("Failed to generate keys");
    /// ```
    pub fn generate(bit_size: u64) -> Result<Self> {
        Self::generate_with_config(bit_size, &TallyConfig::default())
    }

    /// Generate a key pair over a fresh safe-prime group
    pub fn generate_with_config(bit_size: u64, config: &TallyConfig) -> Result<Self> {
        if bit_size < config.min_key_bits {
            return Err(TallyError::InvalidKeySize(bit_size, config.min_key_bits));
        }

        let (p, _q) = generate_safe_prime(bit_size, config.primality_test_rounds)?;
        let g = find_subgroup_generator(&p);

        Self::from_components(p, g, None)
    }

    /// Generate a key pair quickly for testing, over a fixed 768-bit group.
    pub fn generate_for_testing() -> Result<Self> {
        let p = BigUint::from_str_radix(TEST_GROUP_PRIME, 16)
            .map_err(|e| TallyError::InvalidParameter(e.to_string()))?;
        let g = BigUint::from(TEST_GROUP_GENERATOR);

        Self::from_components(p, g, None)
    }

    /// Create a key pair from a safe prime, a subgroup generator and an
    /// optional secret exponent (drawn at random when absent).
    pub fn from_components(p: BigUint, g: BigUint, x: Option<BigUint>) -> Result<Self> {
        let q = (&p - 1u32) / 2u32;
        let x = x.unwrap_or_else(|| random_exponent(&q));
        let y = mod_exp(&g, &x, &p);

        let public_key = PublicKey { g, p, q, y };
        public_key.validate()?;

        let secret_key = SecretKey {
            x,
            public_key: public_key.clone(),
        };

        Ok(KeyPair {
            public_key,
            secret_key,
        })
    }

    /// Get the bit size of the keys
    pub fn bit_size(&self) -> u64 {
        self.public_key.bit_size()
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({} bits)", self.bit_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::ElGamal;
    use crate::proofs::dlog_challenge_generator;

    #[test]
    fn test_testing_keys_are_valid() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        assert_eq!(keypair.bit_size(), 768);
        keypair.public_key.validate().unwrap();
    }

    #[test]
    fn test_key_validation() {
        let keypair = KeyPair::generate_for_testing().unwrap();

        let mut bad = keypair.public_key.clone();
        bad.y = BigUint::one();
        assert!(bad.validate().is_err());

        // p - 1 has order 2, not q
        let mut bad = keypair.public_key.clone();
        bad.g = &bad.p - 1u32;
        assert!(bad.validate().is_err());

        let invalid_pk = PublicKey::new(
            BigUint::from(2u32),
            BigUint::one(),
            BigUint::one(),
            BigUint::one(),
        );
        assert!(invalid_pk.validate().is_err());
    }

    #[test]
    fn test_key_size_validation() {
        assert!(matches!(
            KeyPair::generate(256),
            Err(TallyError::InvalidKeySize(256, 512))
        ));

        // Lowering the floor still cannot go below the smallest safe prime
        let lax = TallyConfig {
            min_key_bits: 0,
            ..TallyConfig::default()
        };
        assert!(matches!(
            KeyPair::generate_with_config(1, &lax),
            Err(TallyError::InvalidKeySize(1, 3))
        ));
    }

    #[test]
    fn test_safe_prime_generation() {
        let keypair = KeyPair::generate(512).unwrap();
        assert!(keypair.bit_size() >= 511 && keypair.bit_size() <= 513);
        keypair.public_key.validate().unwrap();
    }

    #[test]
    fn test_decrypt_roundtrip() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());

        let m = elgamal.encode_exponent(5);
        let (ct, _) = elgamal.encrypt(&m).unwrap();
        assert_eq!(keypair.secret_key.decrypt(&ct).unwrap(), m);
    }

    #[test]
    fn test_combined_key_decrypts_with_both_factors() {
        let a = KeyPair::generate_for_testing().unwrap();
        let b = KeyPair::generate_for_testing().unwrap();
        let joint = a.public_key.combine(&b.public_key).unwrap();
        let elgamal = ElGamal::new(joint.clone());

        let m = elgamal.encode_exponent(3);
        let (ct, _) = elgamal.encrypt(&m).unwrap();
        let factors = [
            a.secret_key.decryption_factor(&ct),
            b.secret_key.decryption_factor(&ct),
        ];
        assert_eq!(ct.decrypt(&factors, &joint).unwrap(), m);

        // A single trustee cannot decrypt alone
        assert_ne!(ct.decrypt(&factors[..1], &joint).unwrap(), m);
    }

    #[test]
    fn test_combine_rejects_foreign_group() {
        let a = KeyPair::generate_for_testing().unwrap();
        let mut other = a.public_key.clone();
        other.p += 2u32;
        assert!(a.public_key.combine(&other).is_err());
    }

    #[test]
    fn test_proof_of_knowledge() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let proof = keypair.secret_key.prove_sk(dlog_challenge_generator);
        assert!(keypair
            .public_key
            .verify_sk_proof(&proof, dlog_challenge_generator));

        let other = KeyPair::generate_for_testing().unwrap();
        assert!(!other.public_key.verify_sk_proof(&proof, dlog_challenge_generator));
    }

    #[test]
    fn test_proof_of_knowledge_needs_valid_key() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let pk = &keypair.public_key;

        // Order 1 turns every challenge into 0, making the proof free
        let degenerate = PublicKey::new(pk.p.clone(), BigUint::one(), pk.g.clone(), pk.y.clone());
        let forged = ProofOfKnowledge {
            commitment: mod_exp(&pk.g, &BigUint::from(5u32), &pk.p),
            challenge: BigUint::from(0u32),
            response: BigUint::from(5u32),
        };
        assert!(!degenerate.verify_sk_proof(&forged, dlog_challenge_generator));
    }

    #[test]
    fn test_secret_key_display_is_redacted() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        assert_eq!(keypair.secret_key.to_string(), "SecretKey(***)");
    }
}
