// Non-interactive zero-knowledge proof layer.
//
// A plain struct holds the transcript (commitment, challenge, response),
// built by a function that samples commitments, derives a Fiat-Shamir
// challenge via a hash helper, and computes responses, with delimited,
// length-prefixed multi-input hashing. The Fiat-Shamir oracle is exposed
// as a pluggable `ChallengeHasher` trait with a `sha2::Sha256` default,
// since an ad-hoc non-cryptographic hash would collapse the random-oracle
// assumption this proof system relies on.

use num_bigint_dig::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::ZkpError;
use crate::math;
use crate::paillier::{self, PublicKey};

/// One leg of a disjunctive Sigma-protocol transcript: commitment `a`,
/// challenge share `e`, scalar response `z`, randomness response
/// `rResponse`. Invariants: `0 <= a < n^2`; `0 <= e, z,
/// rResponse < n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigmaTriple {
    pub a: BigInt,
    pub e: BigInt,
    pub z: BigInt,
    pub r_response: BigInt,
}

/// Disjunctive proof that `ciphertext` encrypts 0 or 1, without revealing
/// which.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitProof {
    pub proof0: SigmaTriple,
    pub proof1: SigmaTriple,
    pub ciphertext: BigInt,
}

/// Proof that the homomorphic product of a set of bit ciphertexts encrypts
/// exactly `1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SumProof {
    pub encrypted_sum: BigInt,
    pub expected_sum: BigInt,
    pub a: BigInt,
    pub e: BigInt,
    pub z: BigInt,
    pub r_response: BigInt,
}

/// A full ballot's worth of proofs: one `BitProof` per candidate slot plus
/// the single `SumProof` over their homomorphic aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteProof {
    pub bit_proofs: Vec<BitProof>,
    pub sum_proof: SumProof,
}

/// Outcome of verifying one `BitProof`. Verification never raises an
/// error for a failing or malformed proof; it always reports a reason
/// instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitProofResult {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Outcome of verifying the `SumProof`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SumProofResult {
    pub valid: bool,
    pub reason: Option<String>,
}

/// The Fiat-Shamir random oracle, pluggable so callers can swap the hash
/// without touching the proof logic. Domain-separated by `tag`; output
/// lives in `[0, n)`.
pub trait ChallengeHasher {
    fn challenge(&self, tag: &[u8], n: &BigInt, n_squared: &BigInt, elements: &[&BigInt]) -> BigInt;
}

/// Default `Challenge` oracle: SHA-256 with counter-mode expansion until a
/// digest smaller than `n` is obtained.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Challenge;

impl ChallengeHasher for Sha256Challenge {
    fn challenge(&self, tag: &[u8], n: &BigInt, n_squared: &BigInt, elements: &[&BigInt]) -> BigInt {
        let element_width = (math::bit_length(n_squared) + 7) / 8;
        let element_width = element_width.max(1);
        let target_bytes = ((math::bit_length(n) + 7) / 8).max(1);
        const DIGEST_BYTES: usize = 32;
        let blocks_needed = (target_bytes + DIGEST_BYTES - 1) / DIGEST_BYTES;

        let mut attempt: u64 = 0;
        loop {
            let mut expanded = Vec::with_capacity(blocks_needed * DIGEST_BYTES);
            for block in 0..blocks_needed {
                let mut hasher = Sha256::new();
                hasher.update(tag);
                hasher.update((elements.len() as u64).to_be_bytes());
                for element in elements {
                    let reduced = element.mod_floor(n_squared);
                    hasher.update(fixed_width_be(&reduced, element_width));
                }
                hasher.update(attempt.to_be_bytes());
                hasher.update((block as u32).to_be_bytes());
                expanded.extend_from_slice(&hasher.finalize());
            }
            expanded.truncate(target_bytes);
            let candidate = BigInt::from_bytes_be(Sign::Plus, &expanded);
            if &candidate < n {
                return candidate;
            }
            attempt += 1;
        }
    }
}

fn fixed_width_be(x: &BigInt, width: usize) -> Vec<u8> {
    let bytes = x.to_bytes_be().1;
    if bytes.len() >= width {
        return bytes[bytes.len() - width..].to_vec();
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}

const BIT_VALUE_TAG: &[u8] = b"ballot-crypto/bit-value/v1";
const SUM_EQUALS_ONE_TAG: &[u8] = b"ballot-crypto/sum-equals-one/v1";

fn verify_sigma_equation(pk: &PublicKey, ciphertext: &BigInt, triple: &SigmaTriple) -> bool {
    let lhs = {
        let gz = math::mod_pow(&pk.g, &triple.z, &pk.n_squared);
        let rn = math::mod_pow(&triple.r_response, &pk.n, &pk.n_squared);
        (gz * rn).mod_floor(&pk.n_squared)
    };
    let rhs = {
        let c_pow_e = math::mod_pow(ciphertext, &triple.e, &pk.n_squared);
        (triple.a.clone() * c_pow_e).mod_floor(&pk.n_squared)
    };
    lhs == rhs
}

fn triple_well_formed(pk: &PublicKey, triple: &SigmaTriple) -> bool {
    math::is_in_range(&triple.a, &pk.n_squared)
        && math::is_in_range(&triple.e, &pk.n)
        && math::is_in_range(&triple.z, &pk.n)
        && math::is_in_range(&triple.r_response, &pk.n)
}

/// Produces a disjunctive proof that `enc.ciphertext` encrypts `v`
/// (`v` must be `0` or `1`).
pub fn prove_bit_value<R: CryptoRng + RngCore>(
    rng: &mut R,
    pk: &PublicKey,
    v: u8,
    enc: &paillier::Encryption,
    hasher: &dyn ChallengeHasher,
) -> Result<BitProof, ZkpError> {
    if v > 1 {
        return Err(ZkpError::NotABit(0));
    }
    let v = v as usize;
    let other = 1 - v;
    let c = &enc.ciphertext;
    let n = &pk.n;
    let n_squared = &pk.n_squared;

    let mut a = [BigInt::zero(), BigInt::zero()];
    let mut e = [BigInt::zero(), BigInt::zero()];
    let mut z = [BigInt::zero(), BigInt::zero()];
    let mut r_resp = [BigInt::zero(), BigInt::zero()];

    // Real branch: sample the commitment, defer e/z/r until the challenge
    // is known.
    let s_real = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let r_prime_real = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    a[v] = (math::mod_pow(&pk.g, &s_real, n_squared)
        * math::mod_pow(&r_prime_real, n, n_squared))
    .mod_floor(n_squared);

    // Simulated branch: sample the full transcript and back out a
    // matching commitment.
    let e_sim = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let z_sim = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let r_sim = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let c_pow_e_sim = math::mod_pow(c, &e_sim, n_squared);
    let c_pow_e_sim_inv = math::mod_inverse(&c_pow_e_sim, n_squared).map_err(ZkpError::Math)?;
    a[other] = (math::mod_pow(&pk.g, &z_sim, n_squared)
        * math::mod_pow(&r_sim, n, n_squared)
        * c_pow_e_sim_inv)
        .mod_floor(n_squared);
    e[other] = e_sim;
    z[other] = z_sim;
    r_resp[other] = r_sim;

    let aggregate_challenge = hasher.challenge(BIT_VALUE_TAG, n, n_squared, &[c, &a[0], &a[1]]);
    e[v] = (&aggregate_challenge - &e[other]).mod_floor(n);
    z[v] = (&s_real + &e[v] * BigInt::from(v as u64)).mod_floor(n);
    r_resp[v] = (&r_prime_real * math::mod_pow(&enc.randomness, &e[v], n)).mod_floor(n);

    Ok(BitProof {
        proof0: SigmaTriple {
            a: a[0].clone(),
            e: e[0].clone(),
            z: z[0].clone(),
            r_response: r_resp[0].clone(),
        },
        proof1: SigmaTriple {
            a: a[1].clone(),
            e: e[1].clone(),
            z: z[1].clone(),
            r_response: r_resp[1].clone(),
        },
        ciphertext: c.clone(),
    })
}

/// Verifies a `BitProof`. Always returns a structured result: a malformed
/// or failing proof is reported, never raised.
pub fn verify_bit_proof(
    pk: &PublicKey,
    proof: &BitProof,
    hasher: &dyn ChallengeHasher,
) -> BitProofResult {
    if !paillier::is_valid_ciphertext(pk, &proof.ciphertext)
        || !triple_well_formed(pk, &proof.proof0)
        || !triple_well_formed(pk, &proof.proof1)
    {
        return BitProofResult {
            valid: false,
            reason: Some("malformed bit proof: field out of range".to_string()),
        };
    }

    let recomputed = hasher.challenge(
        BIT_VALUE_TAG,
        &pk.n,
        &pk.n_squared,
        &[&proof.ciphertext, &proof.proof0.a, &proof.proof1.a],
    );
    let split = (&proof.proof0.e + &proof.proof1.e).mod_floor(&pk.n);
    if split != recomputed {
        return BitProofResult {
            valid: false,
            reason: Some("Fiat-Shamir challenge split mismatch".to_string()),
        };
    }

    if !verify_sigma_equation(pk, &proof.ciphertext, &proof.proof0) {
        return BitProofResult {
            valid: false,
            reason: Some("branch 0 (plaintext 0) verification equation failed".to_string()),
        };
    }
    if !verify_sigma_equation(pk, &proof.ciphertext, &proof.proof1) {
        return BitProofResult {
            valid: false,
            reason: Some("branch 1 (plaintext 1) verification equation failed".to_string()),
        };
    }

    BitProofResult {
        valid: true,
        reason: None,
    }
}

/// Produces the sum-equals-one proof over the homomorphic aggregate of
/// `ciphertexts`.
pub fn prove_sum_equals_one<R: CryptoRng + RngCore>(
    rng: &mut R,
    pk: &PublicKey,
    ciphertexts: &[BigInt],
    randomness: &[BigInt],
    hasher: &dyn ChallengeHasher,
) -> Result<SumProof, ZkpError> {
    if ciphertexts.len() != randomness.len() {
        return Err(ZkpError::LengthMismatch);
    }
    let n = &pk.n;
    let n_squared = &pk.n_squared;

    let encrypted_sum = paillier::sum_ciphertexts(pk, ciphertexts).map_err(ZkpError::Paillier)?;
    let combined_randomness = randomness
        .iter()
        .fold(BigInt::one(), |acc, r| (acc * r).mod_floor(n));

    let s = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let r_prime = math::random_range(rng, &BigInt::one(), n).map_err(ZkpError::Math)?;
    let a = (math::mod_pow(&pk.g, &s, n_squared) * math::mod_pow(&r_prime, n, n_squared))
        .mod_floor(n_squared);

    let expected_sum = BigInt::one();
    let e = hasher.challenge(
        SUM_EQUALS_ONE_TAG,
        n,
        n_squared,
        &[&encrypted_sum, &a, &expected_sum],
    );
    let z = (&s + &e).mod_floor(n);
    let r_response = (&r_prime * math::mod_pow(&combined_randomness, &e, n)).mod_floor(n);

    Ok(SumProof {
        encrypted_sum,
        expected_sum,
        a,
        e,
        z,
        r_response,
    })
}

/// Verifies a `SumProof`, recomputing the expected homomorphic aggregate
/// from `ciphertexts` so a forged `encryptedSum` field cannot slip past
/// verification.
pub fn verify_sum_proof(
    pk: &PublicKey,
    proof: &SumProof,
    ciphertexts: &[BigInt],
    hasher: &dyn ChallengeHasher,
) -> SumProofResult {
    let triple = SigmaTriple {
        a: proof.a.clone(),
        e: proof.e.clone(),
        z: proof.z.clone(),
        r_response: proof.r_response.clone(),
    };
    if proof.expected_sum != BigInt::one()
        || !paillier::is_valid_ciphertext(pk, &proof.encrypted_sum)
        || !triple_well_formed(pk, &triple)
    {
        return SumProofResult {
            valid: false,
            reason: Some("malformed sum proof: field out of range".to_string()),
        };
    }

    let expected_sum_ciphertext = match paillier::sum_ciphertexts(pk, ciphertexts) {
        Ok(c) => c,
        Err(_) => {
            return SumProofResult {
                valid: false,
                reason: Some("no ciphertexts to aggregate".to_string()),
            }
        }
    };
    if expected_sum_ciphertext != proof.encrypted_sum {
        return SumProofResult {
            valid: false,
            reason: Some(
                "encryptedSum does not match the homomorphic product of the slot ciphertexts"
                    .to_string(),
            ),
        };
    }

    let recomputed = hasher.challenge(
        SUM_EQUALS_ONE_TAG,
        &pk.n,
        &pk.n_squared,
        &[&proof.encrypted_sum, &proof.a, &proof.expected_sum],
    );
    if recomputed != proof.e {
        return SumProofResult {
            valid: false,
            reason: Some("Fiat-Shamir challenge mismatch".to_string()),
        };
    }

    if !verify_sigma_equation(pk, &proof.encrypted_sum, &triple) {
        return SumProofResult {
            valid: false,
            reason: Some("sum-equals-one verification equation failed".to_string()),
        };
    }

    SumProofResult {
        valid: true,
        reason: None,
    }
}

/// Produces a `BitProof` per slot plus one `SumProof`.
/// Fails with `LengthMismatch` if the three arrays differ in length,
/// `NotABit` if any plaintext is not 0/1, `SumNotOne` if the plaintexts do
/// not sum to exactly one.
pub fn generate_vote_proof<R: CryptoRng + RngCore>(
    rng: &mut R,
    pk: &PublicKey,
    ciphertexts: &[BigInt],
    plaintexts: &[u8],
    randomness: &[BigInt],
    hasher: &dyn ChallengeHasher,
) -> Result<VoteProof, ZkpError> {
    if ciphertexts.len() != plaintexts.len() || plaintexts.len() != randomness.len() {
        return Err(ZkpError::LengthMismatch);
    }
    for (i, &v) in plaintexts.iter().enumerate() {
        if v > 1 {
            return Err(ZkpError::NotABit(i));
        }
    }
    let sum: u64 = plaintexts.iter().map(|&v| v as u64).sum();
    if sum != 1 {
        return Err(ZkpError::SumNotOne);
    }

    let mut bit_proofs = Vec::with_capacity(ciphertexts.len());
    for i in 0..ciphertexts.len() {
        let enc = paillier::Encryption {
            ciphertext: ciphertexts[i].clone(),
            randomness: randomness[i].clone(),
        };
        bit_proofs.push(prove_bit_value(rng, pk, plaintexts[i], &enc, hasher)?);
    }
    let sum_proof = prove_sum_equals_one(rng, pk, ciphertexts, randomness, hasher)?;

    Ok(VoteProof {
        bit_proofs,
        sum_proof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier;
    use rand::thread_rng;

    fn test_keys() -> (PublicKey, paillier::PrivateKey) {
        let mut rng = thread_rng();
        paillier::keygen(&mut rng, 256, 10).unwrap()
    }

    #[test]
    fn test_bit_proof_completeness_for_both_values() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        for v in [0u8, 1u8] {
            let enc = paillier::encrypt(&mut rng, &pk, &BigInt::from(v)).unwrap();
            let proof = prove_bit_value(&mut rng, &pk, v, &enc, &hasher).unwrap();
            let result = verify_bit_proof(&pk, &proof, &hasher);
            assert!(result.valid, "reason: {:?}", result.reason);
        }
    }

    #[test]
    fn test_bit_proof_tamper_fails() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        let enc = paillier::encrypt(&mut rng, &pk, &BigInt::one()).unwrap();
        let mut proof = prove_bit_value(&mut rng, &pk, 1, &enc, &hasher).unwrap();
        proof.proof1.z = &proof.proof1.z + BigInt::one();
        let result = verify_bit_proof(&pk, &proof, &hasher);
        assert!(!result.valid);
    }

    #[test]
    fn test_sum_proof_completeness() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        let encs: Vec<_> = [0u8, 0, 1, 0, 0]
            .iter()
            .map(|&v| paillier::encrypt(&mut rng, &pk, &BigInt::from(v)).unwrap())
            .collect();
        let cs: Vec<BigInt> = encs.iter().map(|e| e.ciphertext.clone()).collect();
        let rs: Vec<BigInt> = encs.iter().map(|e| e.randomness.clone()).collect();

        let proof = prove_sum_equals_one(&mut rng, &pk, &cs, &rs, &hasher).unwrap();
        let result = verify_sum_proof(&pk, &proof, &cs, &hasher);
        assert!(result.valid, "reason: {:?}", result.reason);
    }

    #[test]
    fn test_sum_proof_soundness_on_wrong_sum() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        // Two bits set: sum is 2, not 1 — the proof must fail verification.
        let encs: Vec<_> = [1u8, 1, 0, 0, 0]
            .iter()
            .map(|&v| paillier::encrypt(&mut rng, &pk, &BigInt::from(v)).unwrap())
            .collect();
        let cs: Vec<BigInt> = encs.iter().map(|e| e.ciphertext.clone()).collect();
        let rs: Vec<BigInt> = encs.iter().map(|e| e.randomness.clone()).collect();

        let proof = prove_sum_equals_one(&mut rng, &pk, &cs, &rs, &hasher).unwrap();
        let result = verify_sum_proof(&pk, &proof, &cs, &hasher);
        assert!(!result.valid);
    }

    #[test]
    fn test_generate_vote_proof_full_flow() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        let selection = [false, false, true, false, false];
        let mut ciphertexts = Vec::new();
        let mut plaintexts = Vec::new();
        let mut randomness = Vec::new();
        for &chosen in &selection {
            let v = if chosen { 1u8 } else { 0u8 };
            let enc = paillier::encrypt(&mut rng, &pk, &BigInt::from(v)).unwrap();
            ciphertexts.push(enc.ciphertext);
            plaintexts.push(v);
            randomness.push(enc.randomness);
        }

        let proof =
            generate_vote_proof(&mut rng, &pk, &ciphertexts, &plaintexts, &randomness, &hasher)
                .unwrap();
        assert_eq!(proof.bit_proofs.len(), 5);

        for bp in &proof.bit_proofs {
            assert!(verify_bit_proof(&pk, bp, &hasher).valid);
        }
        assert!(verify_sum_proof(&pk, &proof.sum_proof, &ciphertexts, &hasher).valid);
    }

    #[test]
    fn test_generate_vote_proof_rejects_bad_shapes() {
        let mut rng = thread_rng();
        let (pk, _sk) = test_keys();
        let hasher = Sha256Challenge;

        let enc = paillier::encrypt(&mut rng, &pk, &BigInt::zero()).unwrap();
        let cs = vec![enc.ciphertext.clone()];
        let rs = vec![enc.randomness.clone()];

        // Length mismatch.
        assert_eq!(
            generate_vote_proof(&mut rng, &pk, &cs, &[0, 0], &rs, &hasher).unwrap_err(),
            ZkpError::LengthMismatch
        );

        // Not a bit.
        assert_eq!(
            generate_vote_proof(&mut rng, &pk, &cs, &[2], &rs, &hasher).unwrap_err(),
            ZkpError::NotABit(0)
        );

        // All-zero selection sums to zero, not one.
        let enc2 = paillier::encrypt(&mut rng, &pk, &BigInt::zero()).unwrap();
        let cs2 = vec![enc.ciphertext.clone(), enc2.ciphertext.clone()];
        let rs2 = vec![enc.randomness.clone(), enc2.randomness.clone()];
        assert_eq!(
            generate_vote_proof(&mut rng, &pk, &cs2, &[0, 0], &rs2, &hasher).unwrap_err(),
            ZkpError::SumNotOne
        );
    }
}
