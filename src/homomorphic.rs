//! Homomorphic operations on ciphertexts

use crate::encryption::ElGamal;
use crate::error::{Result, TallyError};
use crate::types::Ciphertext;

/// Trait for homomorphic operations
pub trait HomomorphicOperations {
    /// Component-wise product, an encryption of the sum of the exponents
    fn homomorphic_operation(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Ciphertext;

    /// Batch homomorphic operation on multiple ciphertexts
    fn homomorphic_batch_operation(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext>;
}

impl HomomorphicOperations for ElGamal {
    fn homomorphic_operation(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Ciphertext {
        let p = &self.public_key.p;
        let alpha = (&ct1.alpha * &ct2.alpha) % p;
        let beta = (&ct1.beta * &ct2.beta) % p;

        Ciphertext::new(alpha, beta)
    }

    fn homomorphic_batch_operation(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext> {
        let (first, rest) = ciphertexts.split_first().ok_or(TallyError::EmptyBatch)?;

        Ok(rest
            .iter()
            .fold(first.clone(), |acc, ct| self.homomorphic_operation(&acc, ct)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn test_homomorphic_addition() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());

        let (ct1, _) = elgamal.encrypt_exponent(15).unwrap();
        let (ct2, _) = elgamal.encrypt_exponent(25).unwrap();

        let ct_sum = elgamal.homomorphic_operation(&ct1, &ct2);
        let decrypted = keypair.secret_key.decrypt(&ct_sum).unwrap();

        assert_eq!(decrypted, elgamal.encode_exponent(40));
    }

    #[test]
    fn test_identity_is_neutral() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());

        let (ct, _) = elgamal.encrypt_exponent(4).unwrap();
        assert_eq!(elgamal.homomorphic_operation(&Ciphertext::identity(), &ct), ct);
    }

    #[test]
    fn test_batch_operations() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key.clone());

        let ciphertexts: Vec<_> = [10u64, 20, 15]
            .iter()
            .map(|v| elgamal.encrypt_exponent(*v).unwrap().0)
            .collect();

        let ct_sum = elgamal.homomorphic_batch_operation(&ciphertexts).unwrap();
        let decrypted = keypair.secret_key.decrypt(&ct_sum).unwrap();

        assert_eq!(decrypted, elgamal.encode_exponent(45));
    }

    #[test]
    fn test_empty_batch() {
        let keypair = KeyPair::generate_for_testing().unwrap();
        let elgamal = ElGamal::new(keypair.public_key);
        assert!(matches!(
            elgamal.homomorphic_batch_operation(&[]),
            Err(TallyError::EmptyBatch)
        ));
    }
}
