// Big-integer arithmetic layer: modular exponentiation, extended Euclid,
// modular inverse, gcd/lcm, Miller-Rabin primality, uniform sampling, and
// prime generation. Everything here operates on `num_bigint_dig::BigInt`
// (see DESIGN.md for why this crate's manifest names `num-bigint-dig`).

use num_bigint_dig::{BigInt, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use once_cell::sync::Lazy;
use rand::{CryptoRng, RngCore};

use crate::error::MathError;

/// Small primes used to trial-divide candidates before running Miller-Rabin.
static SMALL_PRIMES: Lazy<Vec<u32>> = Lazy::new(|| {
    vec![
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
        89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173,
    ]
});

/// Default number of Miller-Rabin witnesses.
pub const DEFAULT_MILLER_RABIN_ROUNDS: usize = 10;

/// Uniform sample in `[0, 2^bits)`.
pub fn random_bits<R: CryptoRng + RngCore>(rng: &mut R, bits: usize) -> Result<BigInt, MathError> {
    if bits == 0 {
        return Err(MathError::BadRange);
    }
    Ok(rng.gen_bigint(bits as u64))
}

/// Uniform sample in `[min, max)`, rejection-sampled over `random_bits`.
pub fn random_range<R: CryptoRng + RngCore>(
    rng: &mut R,
    min: &BigInt,
    max: &BigInt,
) -> Result<BigInt, MathError> {
    if max <= min {
        return Err(MathError::BadRange);
    }
    let span = max - min;
    let bits = bit_length(&span);
    loop {
        let candidate = rng.gen_bigint(bits.max(1));
        if candidate < span {
            return Ok(min + candidate);
        }
    }
}

/// Binary (square-and-multiply) modular exponentiation. Defined for `m >= 1`;
/// returns `0` when `m == 1`
pub fn mod_pow(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> BigInt {
    if modulus.is_one() {
        return BigInt::zero();
    }
    base.modpow(exp, modulus)
}

/// Extended Euclidean algorithm: returns `(g, x, y)` with `a*x + b*y = g`,
/// `g >= 0`.
pub fn ext_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let new_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, new_r);
        let new_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, new_s);
        let new_t = &old_t - &quotient * &t;
        old_t = std::mem::replace(&mut t, new_t);
    }

    if old_r.sign() == Sign::Minus {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Modular multiplicative inverse of `a` modulo `m`, in `[0, m)`.
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Result<BigInt, MathError> {
    let a_mod = a.mod_floor(m);
    let (g, x, _) = ext_gcd(&a_mod, m);
    if g != BigInt::one() {
        return Err(MathError::NoInverse);
    }
    Ok(x.mod_floor(m))
}

/// Standard, non-negative gcd.
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    a.gcd(b)
}

/// Standard lcm; `lcm(0, x) = 0`.
pub fn lcm(a: &BigInt, b: &BigInt) -> BigInt {
    if a.is_zero() || b.is_zero() {
        return BigInt::zero();
    }
    (a * b).abs() / gcd(a, b)
}

/// Bit length of `n` (`0` has bit length `0`).
pub fn bit_length(n: &BigInt) -> usize {
    n.bits() as usize
}

/// `0 <= x < upper`, used to range-check Sigma-protocol transcript fields.
pub fn is_in_range(x: &BigInt, upper: &BigInt) -> bool {
    x.sign() != Sign::Minus && x < upper
}

/// `L(x) = (x-1)/n`. Caller guarantees `x == 1 (mod n)` so the division is
/// exact.
pub fn l_function(x: &BigInt, n: &BigInt) -> BigInt {
    (x - BigInt::one()) / n
}

/// Miller-Rabin primality test with `k` witnesses drawn uniformly from
/// `[2, n-1)`. False-positive probability <= `4^-k`. `2` and `3` are
/// reported prime immediately; `n < 2` and even `n` are rejected.
pub fn is_probable_prime<R: CryptoRng + RngCore>(rng: &mut R, n: &BigInt, k: usize) -> bool {
    if n < &BigInt::from(2) {
        return false;
    }
    if n == &BigInt::from(2) || n == &BigInt::from(3) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    for &p in SMALL_PRIMES.iter() {
        let sp = BigInt::from(p);
        if n == &sp {
            return true;
        }
        if (n % &sp).is_zero() {
            return false;
        }
    }

    let n_minus_1 = n - BigInt::one();
    let mut d = n_minus_1.clone();
    let mut r: u32 = 0;
    while d.is_even() {
        d = d / 2;
        r += 1;
    }

    let two = BigInt::from(2);
    'witness: for _ in 0..k {
        // Uniform witness in [2, n-1).
        let a = match random_range(rng, &two, &n_minus_1) {
            Ok(v) => v,
            Err(_) => two.clone(),
        };
        let mut x = mod_pow(&a, &d, n);
        if x == BigInt::one() || x == n_minus_1 {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = mod_pow(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Samples a `bits`-wide random odd integer of exact bit length and retries
/// until `is_probable_prime` passes
pub fn generate_prime<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<BigInt, MathError> {
    if bits < 2 {
        return Err(MathError::BadRange);
    }
    loop {
        let candidate = random_bits(rng, bits)?;
        let candidate = candidate | (BigInt::one() << (bits - 1));
        let candidate = candidate | BigInt::one();
        if is_probable_prime(rng, &candidate, rounds) {
            return Ok(candidate);
        }
    }
}

/// Generates two independent `bits`-wide primes, rejecting `p == q`.
pub fn generate_two_primes<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<(BigInt, BigInt), MathError> {
    let p = generate_prime(rng, bits, rounds)?;
    loop {
        let q = generate_prime(rng, bits, rounds)?;
        if q != p {
            return Ok((p, q));
        }
        log::debug!("generate_two_primes: regenerating q, collided with p");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn test_mod_pow_basic() {
        let base = BigInt::from(4);
        let exp = BigInt::from(13);
        let modulus = BigInt::from(497);
        assert_eq!(mod_pow(&base, &exp, &modulus), BigInt::from(445));
    }

    #[test]
    fn test_mod_pow_modulus_one_is_zero() {
        let base = BigInt::from(123);
        let exp = BigInt::from(7);
        assert_eq!(mod_pow(&base, &exp, &BigInt::one()), BigInt::zero());
    }

    #[test]
    fn test_ext_gcd_bezout() {
        let a = BigInt::from(240);
        let b = BigInt::from(46);
        let (g, x, y) = ext_gcd(&a, &b);
        assert_eq!(g, BigInt::from(2));
        assert_eq!(&a * &x + &b * &y, g);
    }

    #[test]
    fn test_mod_inverse() {
        let a = BigInt::from(7);
        let m = BigInt::from(100);
        let inv = mod_inverse(&a, &m).unwrap();
        assert_eq!(inv, BigInt::from(43));
        assert!((a.clone() * inv).mod_floor(&m).is_one());
    }

    #[test]
    fn test_mod_inverse_no_inverse() {
        let a = BigInt::from(75);
        let m = BigInt::from(100);
        assert_eq!(mod_inverse(&a, &m), Err(MathError::NoInverse));
    }

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(gcd(&BigInt::from(54), &BigInt::from(24)), BigInt::from(6));
        assert_eq!(lcm(&BigInt::from(4), &BigInt::from(6)), BigInt::from(12));
        assert_eq!(lcm(&BigInt::zero(), &BigInt::from(6)), BigInt::zero());
    }

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(&BigInt::from(0)), 0);
        assert_eq!(bit_length(&BigInt::from(1)), 1);
        assert_eq!(bit_length(&BigInt::from(255)), 8);
        assert_eq!(bit_length(&BigInt::from(256)), 9);
    }

    #[test]
    fn test_is_probable_prime_small_cases() {
        let mut rng = thread_rng();
        assert!(!is_probable_prime(&mut rng, &BigInt::from(0), 10));
        assert!(!is_probable_prime(&mut rng, &BigInt::from(1), 10));
        assert!(is_probable_prime(&mut rng, &BigInt::from(2), 10));
        assert!(is_probable_prime(&mut rng, &BigInt::from(3), 10));
        assert!(!is_probable_prime(&mut rng, &BigInt::from(4), 10));
        assert!(is_probable_prime(&mut rng, &BigInt::from(97), 10));
        assert!(!is_probable_prime(&mut rng, &BigInt::from(91), 10)); // 7*13
        assert!(is_probable_prime(&mut rng, &BigInt::from(7919), 10));
    }

    #[test]
    fn test_generate_prime_and_two_primes() {
        let mut rng = thread_rng();
        let p = generate_prime(&mut rng, 64, DEFAULT_MILLER_RABIN_ROUNDS).unwrap();
        assert_eq!(bit_length(&p), 64);
        assert!(is_probable_prime(&mut rng, &p, DEFAULT_MILLER_RABIN_ROUNDS));

        let (a, b) = generate_two_primes(&mut rng, 64, DEFAULT_MILLER_RABIN_ROUNDS).unwrap();
        assert_ne!(a, b);
        assert!(is_probable_prime(&mut rng, &a, DEFAULT_MILLER_RABIN_ROUNDS));
        assert!(is_probable_prime(&mut rng, &b, DEFAULT_MILLER_RABIN_ROUNDS));
    }

    #[test]
    fn test_random_range_bounds() {
        let mut rng = thread_rng();
        let min = BigInt::from(10);
        let max = BigInt::from(20);
        for _ in 0..50 {
            let v = random_range(&mut rng, &min, &max).unwrap();
            assert!(v >= min && v < max);
        }
        assert_eq!(random_range(&mut rng, &max, &min), Err(MathError::BadRange));
    }

    #[test]
    fn test_l_function() {
        // n = 11, x = 1 + 11*5 = 56, L(x) should be 5.
        let n = BigInt::from(11);
        let x = BigInt::from(56);
        assert_eq!(l_function(&x, &n), BigInt::from(5));
    }
}
