// Paillier public-key cryptosystem.
//
// `PublicKey`/`PrivateKey`, `encrypt`/`decrypt`/homomorphic add/scalar-mul,
// the `g = n+1` optimization. Prime generation is plain (non-safe) via
// `crate::math`, synchronous, with an explicit `PaillierEngine` that holds
// at most one keypair and can be `clear`ed.

use num_bigint_dig::{BigInt, Sign};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};

use crate::error::PaillierError;
use crate::math;

/// `n = p*q`, `g = n+1`, `nSquared = n*n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub n: BigInt,
    pub g: BigInt,
    pub n_squared: BigInt,
}

impl PublicKey {
    pub fn from_n(n: BigInt) -> Self {
        let g = &n + BigInt::one();
        let n_squared = &n * &n;
        PublicKey { n, g, n_squared }
    }

    /// Bit length of `n`, exposed for `publicKeyInfo`.
    pub fn bit_length(&self) -> usize {
        math::bit_length(&self.n)
    }
}

/// `lambda = lcm(p-1, q-1)`, `mu = L(g^lambda mod n^2)^-1 mod n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateKey {
    pub lambda: BigInt,
    pub mu: BigInt,
    pub n: BigInt,
}

impl PrivateKey {
    pub fn bit_length(&self) -> usize {
        math::bit_length(&self.n)
    }
}

/// The outcome of an encryption: the ciphertext plus the randomness used.
/// `randomness` must never outlive the ballot flow that produced it;
/// callers thread it straight into `zkp::generate_vote_proof` and then
/// drop it.
#[derive(Clone, Debug)]
pub struct Encryption {
    pub ciphertext: BigInt,
    pub randomness: BigInt,
}

/// Generates a Paillier key pair. Two distinct `key_bits/2`-bit primes are
/// drawn via `math::generate_two_primes`; fails only if the underlying
/// entropy/prime search fails (`MathError`).
pub fn keygen<R: CryptoRng + RngCore>(
    rng: &mut R,
    key_bits: usize,
    miller_rabin_rounds: usize,
) -> Result<(PublicKey, PrivateKey), PaillierError> {
    if key_bits < 512 || key_bits % 2 != 0 {
        log::warn!(
            "keygen: key_bits={} is below the recommended minimum or not even; proceeding anyway",
            key_bits
        );
    }
    let prime_bits = key_bits / 2;
    let (p, q, n) = loop {
        let (p, q) = math::generate_two_primes(rng, prime_bits, miller_rabin_rounds)?;
        let candidate_n = &p * &q;
        if math::bit_length(&candidate_n) >= key_bits {
            break (p, q, candidate_n);
        }
        log::debug!(
            "keygen: regenerating p, q; n.bits()={} fell short of key_bits={}",
            math::bit_length(&candidate_n),
            key_bits
        );
    };
    let p_minus_1 = &p - BigInt::one();
    let q_minus_1 = &q - BigInt::one();
    let lambda = math::lcm(&p_minus_1, &q_minus_1);

    let public_key = PublicKey::from_n(n.clone());
    let g_pow_lambda = math::mod_pow(&public_key.g, &lambda, &public_key.n_squared);
    let l = math::l_function(&g_pow_lambda, &n);
    let mu = math::mod_inverse(&l, &n)?;

    Ok((public_key, PrivateKey { lambda, mu, n }))
}

/// Encrypts `m` and returns the ciphertext together with the randomness
/// used.
pub fn encrypt<R: CryptoRng + RngCore>(
    rng: &mut R,
    pk: &PublicKey,
    m: &BigInt,
) -> Result<Encryption, PaillierError> {
    if m.sign() == Sign::Minus || m >= &pk.n {
        return Err(PaillierError::PlaintextOutOfRange);
    }

    let r = loop {
        let candidate = math::random_range(rng, &BigInt::one(), &pk.n).map_err(|e| {
            PaillierError::InternalError(format!("failed to sample encryption randomness: {e}"))
        })?;
        if math::gcd(&candidate, &pk.n) == BigInt::one() {
            break candidate;
        }
    };

    let gm = math::mod_pow(&pk.g, m, &pk.n_squared);
    let rn = math::mod_pow(&r, &pk.n, &pk.n_squared);
    let ciphertext = (gm * rn).mod_floor(&pk.n_squared);

    Ok(Encryption {
        ciphertext,
        randomness: r,
    })
}

/// Decrypts ciphertext `c`. Requires `0 < c < n^2`.
pub fn decrypt(sk: &PrivateKey, c: &BigInt) -> Result<BigInt, PaillierError> {
    let n_squared = &sk.n * &sk.n;
    if c.sign() != Sign::Plus || c >= &n_squared {
        return Err(PaillierError::CiphertextOutOfRange);
    }

    let c_pow_lambda = math::mod_pow(c, &sk.lambda, &n_squared);
    let l = math::l_function(&c_pow_lambda, &sk.n);
    Ok((l * &sk.mu).mod_floor(&sk.n))
}

/// Homomorphic addition: `(c1 * c2) mod n^2`, decrypts to `m1 + m2 mod n`.
pub fn add_ciphertexts(pk: &PublicKey, c1: &BigInt, c2: &BigInt) -> Result<BigInt, PaillierError> {
    if !is_valid_ciphertext(pk, c1) || !is_valid_ciphertext(pk, c2) {
        return Err(PaillierError::CiphertextOutOfRange);
    }
    Ok((c1 * c2).mod_floor(&pk.n_squared))
}

/// Homomorphic scalar multiplication: `c^k mod n^2`, decrypts to `k*m mod n`.
pub fn scalar_mul(pk: &PublicKey, c: &BigInt, k: &BigInt) -> Result<BigInt, PaillierError> {
    if !is_valid_ciphertext(pk, c) {
        return Err(PaillierError::CiphertextOutOfRange);
    }
    Ok(math::mod_pow(c, k, &pk.n_squared))
}

/// Left fold of `add_ciphertexts` over `cs`. Fails on an empty list.
pub fn sum_ciphertexts(pk: &PublicKey, cs: &[BigInt]) -> Result<BigInt, PaillierError> {
    let mut iter = cs.iter();
    let first = iter.next().ok_or(PaillierError::EmptyInput)?.clone();
    iter.try_fold(first, |acc, c| add_ciphertexts(pk, &acc, c))
}

/// `0 < c < n^2`.
pub fn is_valid_ciphertext(pk: &PublicKey, c: &BigInt) -> bool {
    c.sign() == Sign::Plus && c < &pk.n_squared
}

/// Stateful engine holding at most one key pair, with explicit lifecycle
/// methods: `keygen`, `clear`, and key loading for the authority side.
#[derive(Default)]
pub struct PaillierEngine {
    public_key: Option<PublicKey>,
    private_key: Option<PrivateKey>,
}

impl PaillierEngine {
    pub fn new() -> Self {
        PaillierEngine {
            public_key: None,
            private_key: None,
        }
    }

    pub fn keygen<R: CryptoRng + RngCore>(
        &mut self,
        rng: &mut R,
        key_bits: usize,
        miller_rabin_rounds: usize,
    ) -> Result<(), PaillierError> {
        let (pk, sk) = keygen(rng, key_bits, miller_rabin_rounds)?;
        self.public_key = Some(pk);
        self.private_key = Some(sk);
        Ok(())
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn load_public_key(&mut self, pk: PublicKey) {
        self.public_key = Some(pk);
    }

    pub fn load_keys(&mut self, pk: PublicKey, sk: PrivateKey) {
        self.public_key = Some(pk);
        self.private_key = Some(sk);
    }

    /// Wipes both keys.
    pub fn clear(&mut self) {
        self.public_key = None;
        self.private_key = None;
    }

    pub fn encrypt<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
        m: &BigInt,
    ) -> Result<Encryption, PaillierError> {
        let pk = self.public_key.as_ref().ok_or(PaillierError::NoPublicKey)?;
        encrypt(rng, pk, m)
    }

    pub fn decrypt(&self, c: &BigInt) -> Result<BigInt, PaillierError> {
        let sk = self
            .private_key
            .as_ref()
            .ok_or(PaillierError::NoPrivateKey)?;
        decrypt(sk, c)
    }
}
