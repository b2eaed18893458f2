//! Core ElGamal encryption and decryption operations
//!
//! Votes are encoded "in the exponent": a count `k` is carried as the group
//! element `g^k`, so multiplying ciphertexts adds the counts underneath.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::{Result, TallyError};
use crate::keys::PublicKey;
use crate::types::Ciphertext;
use crate::utils::{mod_div, mod_exp, random_exponent};

/// ElGamal encryption under a fixed public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamal {
    pub public_key: PublicKey,
}

impl ElGamal {
    /// Create a new ElGamal instance
    pub fn new(public_key: PublicKey) -> Self {
        ElGamal { public_key }
    }

    /// Encode a small count as the group element g^k
    pub fn encode_exponent(&self, k: u64) -> BigUint {
        mod_exp(&self.public_key.g, &BigUint::from(k), &self.public_key.p)
    }

    /// Encrypt a group element with fresh randomness, returning the
    /// randomness alongside so that proofs can be built over it
    pub fn encrypt(&self, plaintext: &BigUint) -> Result<(Ciphertext, BigUint)> {
        let r = random_exponent(&self.public_key.q);
        let ciphertext = self.encrypt_with_randomness(plaintext, &r)?;
        Ok((ciphertext, r))
    }

    /// Encrypt with specific randomness: (g^r, m * y^r)
    pub fn encrypt_with_randomness(&self, plaintext: &BigUint, randomness: &BigUint) -> Result<Ciphertext> {
        let pk = &self.public_key;
        if plaintext.is_zero() || plaintext >= &pk.p {
            return Err(TallyError::InvalidParameter(
                "Plaintext must lie in [1, p)".to_string(),
            ));
        }

        let alpha = mod_exp(&pk.g, randomness, &pk.p);
        let beta = (plaintext * mod_exp(&pk.y, randomness, &pk.p)) % &pk.p;

        Ok(Ciphertext::new(alpha, beta))
    }

    /// Encrypt the count `k`, returning the ciphertext and its randomness
    pub fn encrypt_exponent(&self, k: u64) -> Result<(Ciphertext, BigUint)> {
        self.encrypt(&self.encode_exponent(k))
    }

    /// Re-randomize a ciphertext (produces a different encryption of the same plaintext)
    pub fn rerandomize(&self, ciphertext: &Ciphertext) -> Ciphertext {
        let pk = &self.public_key;
        let r = random_exponent(&pk.q);

        let alpha = (&ciphertext.alpha * mod_exp(&pk.g, &r, &pk.p)) % &pk.p;
        let beta = (&ciphertext.beta * mod_exp(&pk.y, &r, &pk.p)) % &pk.p;

        Ciphertext::new(alpha, beta)
    }

    /// Whether both components lie in the order-q subgroup
    pub fn is_member(&self, ciphertext: &Ciphertext) -> bool {
        let pk = &self.public_key;
        [&ciphertext.alpha, &ciphertext.beta]
            .iter()
            .all(|v| !v.is_zero() && *v < &pk.p && mod_exp(v, &pk.q, &pk.p).is_one())
    }
}

impl Ciphertext {
    /// Combine trustees' decryption factors: beta / prod(factor_i).
    ///
    /// The result is the plaintext group element only once every trustee
    /// behind `public_key` has contributed a factor.
    pub fn decrypt(&self, decryption_factors: &[BigUint], public_key: &PublicKey) -> Result<BigUint> {
        let p = &public_key.p;
        let combined = decryption_factors
            .iter()
            .fold(BigUint::one(), |acc, factor| (acc * factor) % p);

        mod_div(&self.beta, &combined, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn setup() -> (KeyPair, ElGamal) {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());
        (keypair, elgamal)
    }

    #[test]
    fn test_encryption_decryption() {
        let (keypair, elgamal) = setup();

        let plaintext = elgamal.encode_exponent(42);
        let (ciphertext, _) = elgamal.encrypt(&plaintext).unwrap();
        let decrypted = keypair.secret_key.decrypt(&ciphertext).unwrap();

        assert_eq!(plaintext, decrypted);
        assert!(elgamal.is_member(&ciphertext));
    }

    #[test]
    fn test_known_randomness_is_deterministic() {
        let (_, elgamal) = setup();
        let m = elgamal.encode_exponent(1);
        let r = BigUint::from(12345u32);

        let ct1 = elgamal.encrypt_with_randomness(&m, &r).unwrap();
        let ct2 = elgamal.encrypt_with_randomness(&m, &r).unwrap();
        assert_eq!(ct1, ct2);
        assert_eq!(ct1.alpha(), &mod_exp(elgamal.public_key.generator(), &r, elgamal.public_key.modulus()));
    }

    #[test]
    fn test_plaintext_out_of_range() {
        let (keypair, elgamal) = setup();
        let r = BigUint::one();
        assert!(elgamal.encrypt_with_randomness(&BigUint::zero(), &r).is_err());
        assert!(elgamal
            .encrypt_with_randomness(keypair.public_key.modulus(), &r)
            .is_err());
    }

    #[test]
    fn test_rerandomization() {
        let (keypair, elgamal) = setup();

        let (ct1, _) = elgamal.encrypt_exponent(7).unwrap();
        let ct2 = elgamal.rerandomize(&ct1);

        // Ciphertexts should be different
        assert_ne!(ct1, ct2);

        // But decrypt to the same plaintext
        let dec1 = keypair.secret_key.decrypt(&ct1).unwrap();
        let dec2 = keypair.secret_key.decrypt(&ct2).unwrap();
        assert_eq!(dec1, dec2);
        assert_eq!(dec1, elgamal.encode_exponent(7));
    }

    #[test]
    fn test_decrypt_from_single_factor() {
        let (keypair, elgamal) = setup();
        let (ct, _) = elgamal.encrypt_exponent(3).unwrap();
        let factor = keypair.secret_key.decryption_factor(&ct);

        assert_eq!(
            ct.decrypt(&[factor], &keypair.public_key).unwrap(),
            elgamal.encode_exponent(3)
        );
    }

    #[test]
    fn test_non_member_detected() {
        let (keypair, elgamal) = setup();
        // p - 1 has order 2
        let outside = keypair.public_key.modulus() - 1u32;
        let ct = Ciphertext::new(outside, BigUint::one());
        assert!(!elgamal.is_member(&ct));
    }
}
