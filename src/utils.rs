//! Utility functions for group arithmetic and hashing

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use num_bigint::{BigInt, BigUint, RandBigInt, ToBigInt, ToBigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::thread_rng;
use sha2::{Digest, Sha256};

use crate::error::{Result, TallyError};

/// Modular exponentiation: base^exp mod modulus
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Compute modular inverse using extended Euclidean algorithm
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = a.to_bigint()?;
    let m = m.to_bigint()?;
    let (gcd, x, _) = extended_gcd(&a, &m);

    if gcd != BigInt::one() {
        return None;
    }

    // x may be negative; fold it back into [0, m)
    ((x % &m + &m) % &m).to_biguint()
}

/// Extended Euclidean algorithm (using BigInt to handle negative intermediate values)
fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    if a.is_zero() {
        return (b.clone(), BigInt::zero(), BigInt::one());
    }

    let (gcd, x1, y1) = extended_gcd(&(b % a), a);
    let x = y1 - (b / a) * &x1;
    let y = x1;

    (gcd, x, y)
}

/// Divide `a` by `b` in the multiplicative group mod `p`.
pub fn mod_div(a: &BigUint, b: &BigUint, p: &BigUint) -> Result<BigUint> {
    let b_inv = mod_inverse(b, p).ok_or(TallyError::ModularInverseError)?;
    Ok((a * b_inv) % p)
}

/// Generate a safe prime p = 2q + 1 with q prime, returning (p, q).
///
/// The bit size of `p` may land one bit either side of `bit_size`.
pub fn generate_safe_prime(bit_size: u64, rounds: usize) -> Result<(BigUint, BigUint)> {
    // 7 = 2 * 3 + 1 is the smallest safe prime
    if bit_size < 3 {
        return Err(TallyError::InvalidKeySize(bit_size, 3));
    }

    let mut rng = thread_rng();

    let max_iterations = if bit_size <= 512 { 1_000_000 } else { 200_000 };
    let min_bits = bit_size.saturating_sub(1);
    let max_bits = bit_size + 1;

    for _ in 0..max_iterations {
        // q has one bit less than p
        let q_bits = bit_size - 1;
        let mut q = rng.gen_biguint(q_bits);
        q |= BigUint::one();
        q |= BigUint::one() << (q_bits - 1);

        let p = &q * 2u32 + 1u32;
        let p_bits = p.bits();
        if p_bits < min_bits || p_bits > max_bits {
            continue;
        }

        // Sieve both before any modular exponentiation
        if has_small_factor(&q) || has_small_factor(&p) {
            continue;
        }

        if is_probable_prime(&q, rounds) && is_probable_prime(&p, rounds) {
            return Ok((p, q));
        }
    }

    Err(TallyError::CryptoError(format!(
        "Failed to generate {}-bit safe prime after {} iterations",
        bit_size, max_iterations
    )))
}

const SMALL_PRIMES: [u32; 24] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Whether `n` is divisible by a small odd prime other than itself
fn has_small_factor(n: &BigUint) -> bool {
    SMALL_PRIMES.iter().any(|&sp| {
        let sp = BigUint::from(sp);
        n != &sp && (n % &sp).is_zero()
    })
}

/// Miller-Rabin primality test
pub fn is_probable_prime(n: &BigUint, k: usize) -> bool {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if n <= &BigUint::one() {
        return false;
    }
    if n == &two || n == &three {
        return true;
    }
    if n.is_even() || has_small_factor(n) {
        return false;
    }

    let mut rng = thread_rng();
    let n_minus_1 = n - BigUint::one();
    let (s, d) = factor_powers_of_two(&n_minus_1);

    'witness: for _ in 0..k {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = mod_exp(&a, &d, n);

        if x.is_one() || x == n_minus_1 {
            continue;
        }

        for _ in 0..s - 1 {
            x = mod_exp(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Factor out powers of 2 from n
pub fn factor_powers_of_two(n: &BigUint) -> (u64, BigUint) {
    let mut s = 0;
    let mut d = n.clone();

    while d.is_even() && !d.is_zero() {
        d >>= 1;
        s += 1;
    }

    (s, d)
}

/// Find a generator of the order-q subgroup of Z_p^* for a safe prime p = 2q + 1.
///
/// Squaring any element other than 0, 1 and p - 1 lands in the subgroup of
/// quadratic residues, which has prime order q.
pub fn find_subgroup_generator(p: &BigUint) -> BigUint {
    let mut rng = thread_rng();
    let two = BigUint::from(2u32);
    let p_minus_1 = p - BigUint::one();

    loop {
        let h = rng.gen_biguint_range(&two, &p_minus_1);
        let g = mod_exp(&h, &two, p);
        if !g.is_one() {
            return g;
        }
    }
}

/// Random exponent in [1, q)
pub fn random_exponent(q: &BigUint) -> BigUint {
    let mut rng = thread_rng();
    rng.gen_biguint_range(&BigUint::one(), q)
}

/// Random exponent in [0, q)
pub fn random_below(q: &BigUint) -> BigUint {
    let mut rng = thread_rng();
    rng.gen_biguint_below(q)
}

/// SHA-256 of `data`, base64-encoded without padding.
pub fn hash_b64(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    STANDARD_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_inverse() {
        let a = 3u32.to_biguint().unwrap();
        let m = 11u32.to_biguint().unwrap();
        let inv = mod_inverse(&a, &m).unwrap();

        assert_eq!((a * inv) % m, BigUint::one());
    }

    #[test]
    fn test_mod_inverse_not_coprime() {
        let a = 6u32.to_biguint().unwrap();
        let m = 9u32.to_biguint().unwrap();
        assert!(mod_inverse(&a, &m).is_none());
    }

    #[test]
    fn test_mod_div() {
        let p = 23u32.to_biguint().unwrap();
        let a = 5u32.to_biguint().unwrap();
        let b = 7u32.to_biguint().unwrap();
        let q = mod_div(&a, &b, &p).unwrap();
        assert_eq!((q * b) % &p, a);
    }

    #[test]
    fn test_is_probable_prime() {
        for prime in [2u32, 3, 5, 7, 11, 13, 7919] {
            assert!(is_probable_prime(&prime.to_biguint().unwrap(), 20));
        }
        for composite in [0u32, 1, 4, 6, 8, 9, 15, 7917] {
            assert!(!is_probable_prime(&composite.to_biguint().unwrap(), 20));
        }
    }

    #[test]
    fn test_safe_prime_size_floor() {
        for bits in 0..3 {
            assert!(matches!(
                generate_safe_prime(bits, 20),
                Err(TallyError::InvalidKeySize(_, 3))
            ));
        }
        assert_eq!(
            generate_safe_prime(3, 20).unwrap(),
            (BigUint::from(7u32), BigUint::from(3u32))
        );
    }

    #[test]
    fn test_subgroup_generator_has_order_q() {
        // 23 = 2 * 11 + 1
        let p = 23u32.to_biguint().unwrap();
        let q = 11u32.to_biguint().unwrap();
        for _ in 0..10 {
            let g = find_subgroup_generator(&p);
            assert!(mod_exp(&g, &q, &p).is_one());
            assert!(!g.is_one());
        }
    }

    #[test]
    fn test_hash_b64_has_no_padding() {
        let hash = hash_b64("{}");
        assert_eq!(hash.len(), 43);
        assert!(!hash.ends_with('='));
        assert_eq!(hash, hash_b64("{}"));
        assert_ne!(hash, hash_b64("[]"));
    }
}
