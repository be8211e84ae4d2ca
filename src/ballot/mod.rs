// Ballot orchestrator.
//
// A thin coordinator that holds configuration plus a lower-level engine
// (`paillier::PaillierEngine`) and delegates to it and to `zkp`. Owns the
// one piece of ambient surface neither lower layer has a reason to know
// about: the outbound JSON ballot-submission payload, timestamped with
// `chrono`.

use chrono::{DateTime, Utc};
use num_bigint_dig::BigInt;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{BallotError, PaillierError};
use crate::paillier::{self, PaillierEngine, PublicKey};
use crate::zkp::{self, ChallengeHasher, Sha256Challenge};

/// Configuration for a `BallotEngine`: candidate count, key size, and
/// Miller-Rabin witness count.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub candidate_count: usize,
    pub key_bits: usize,
    pub miller_rabin_rounds: usize,
}

impl EngineConfig {
    /// `keyBits` defaults to 1024 and `millerRabinRounds` to 10;
    /// `candidateCount` has no sensible default and must be supplied.
    pub fn new(candidate_count: usize) -> Self {
        EngineConfig {
            candidate_count,
            key_bits: 1024,
            miller_rabin_rounds: 10,
        }
    }

    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    pub fn with_miller_rabin_rounds(mut self, rounds: usize) -> Self {
        self.miller_rabin_rounds = rounds;
        self
    }
}

/// `engine.publicKeyInfo()` result: integers as decimal strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub n: String,
    pub g: String,
    pub bit_length: usize,
}

/// `engine.privateKeyInfo()` result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateKeyInfo {
    pub lambda: String,
    pub mu: String,
    pub bit_length: usize,
}

/// A complete ballot proof: one `BitProof` per candidate slot plus the
/// aggregate `SumProof`, timestamped at creation.
#[derive(Clone, Debug)]
pub struct BallotProof {
    pub bit_proofs: Vec<zkp::BitProof>,
    pub sum_proof: zkp::SumProof,
    pub timestamp: DateTime<Utc>,
}

/// The package `encryptAndProve` emits and `verify`/`tally` consume.
#[derive(Clone, Debug)]
pub struct BallotPackage {
    pub public_key: PublicKey,
    pub ciphertexts: Vec<BigInt>,
    pub proof: BallotProof,
}

/// Structured verification outcome: never raised, always
/// returned.
#[derive(Clone, Debug)]
pub struct VerificationReport {
    pub overall_valid: bool,
    pub bit_proofs_valid: bool,
    pub bit_proof_results: Vec<zkp::BitProofResult>,
    pub sum_proof_valid: bool,
    pub sum_proof_details: zkp::SumProofResult,
}

impl VerificationReport {
    fn malformed(reason: &str) -> Self {
        VerificationReport {
            overall_valid: false,
            bit_proofs_valid: false,
            bit_proof_results: Vec::new(),
            sum_proof_valid: false,
            sum_proof_details: zkp::SumProofResult {
                valid: false,
                reason: Some(reason.to_string()),
            },
        }
    }
}

/// Verifies a `BallotPackage` against its own embedded public key. Pure
/// and stateless.
pub fn verify(pkg: &BallotPackage, hasher: &dyn ChallengeHasher) -> VerificationReport {
    if pkg.proof.bit_proofs.len() != pkg.ciphertexts.len() {
        return VerificationReport::malformed(
            "bitProofs length does not match the number of ciphertext slots",
        );
    }

    let mut bit_proof_results = Vec::with_capacity(pkg.proof.bit_proofs.len());
    let mut bit_proofs_valid = true;
    for (bit_proof, slot_ciphertext) in pkg.proof.bit_proofs.iter().zip(pkg.ciphertexts.iter()) {
        if &bit_proof.ciphertext != slot_ciphertext {
            bit_proofs_valid = false;
            bit_proof_results.push(zkp::BitProofResult {
                valid: false,
                reason: Some("bit proof ciphertext does not match its package slot".to_string()),
            });
            continue;
        }
        let result = zkp::verify_bit_proof(&pkg.public_key, bit_proof, hasher);
        if !result.valid {
            bit_proofs_valid = false;
        }
        bit_proof_results.push(result);
    }

    let sum_proof_details =
        zkp::verify_sum_proof(&pkg.public_key, &pkg.proof.sum_proof, &pkg.ciphertexts, hasher);
    let sum_proof_valid = sum_proof_details.valid;

    VerificationReport {
        overall_valid: bit_proofs_valid && sum_proof_valid,
        bit_proofs_valid,
        bit_proof_results,
        sum_proof_valid,
        sum_proof_details,
    }
}

/// The client-side coordinator: configuration plus a `PaillierEngine`,
/// delegating proof generation to `zkp`. A small stateful engine with
/// explicit lifecycle methods (`keygen`, `clear`).
pub struct BallotEngine {
    config: EngineConfig,
    paillier: PaillierEngine,
    hasher: Box<dyn ChallengeHasher>,
}

impl BallotEngine {
    pub fn new(config: EngineConfig) -> Self {
        BallotEngine {
            config,
            paillier: PaillierEngine::new(),
            hasher: Box::new(Sha256Challenge),
        }
    }

    /// Swaps in a non-default Fiat-Shamir oracle.
    pub fn with_hasher(config: EngineConfig, hasher: Box<dyn ChallengeHasher>) -> Self {
        BallotEngine {
            config,
            paillier: PaillierEngine::new(),
            hasher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn keygen<R: CryptoRng + RngCore>(&mut self, rng: &mut R) -> Result<(), BallotError> {
        self.paillier
            .keygen(rng, self.config.key_bits, self.config.miller_rabin_rounds)
            .map_err(BallotError::Paillier)
    }

    /// Wipes both keys.
    pub fn clear(&mut self) {
        self.paillier.clear();
    }

    pub fn public_key_info(&self) -> Result<PublicKeyInfo, BallotError> {
        let pk = self.paillier.public_key().ok_or(BallotError::NoPublicKey)?;
        Ok(PublicKeyInfo {
            n: pk.n.to_string(),
            g: pk.g.to_string(),
            bit_length: pk.bit_length(),
        })
    }

    pub fn private_key_info(&self) -> Result<PrivateKeyInfo, BallotError> {
        let sk = self
            .paillier
            .private_key()
            .ok_or(BallotError::NoPrivateKey)?;
        Ok(PrivateKeyInfo {
            lambda: sk.lambda.to_string(),
            mu: sk.mu.to_string(),
            bit_length: sk.bit_length(),
        })
    }

    /// Encrypts each slot, rejects an all-false selection before spending a
    /// proof on it, and bundles the result. Per-slot randomness never
    /// leaves this function.
    pub fn encrypt_and_prove<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
        selection: &[bool],
    ) -> Result<BallotPackage, BallotError> {
        let pk = self
            .paillier
            .public_key()
            .ok_or(BallotError::NoPublicKey)?
            .clone();
        if selection.len() != self.config.candidate_count {
            return Err(BallotError::WrongSelectionLength {
                expected: self.config.candidate_count,
                got: selection.len(),
            });
        }

        let mut ciphertexts = Vec::with_capacity(selection.len());
        let mut plaintexts = Vec::with_capacity(selection.len());
        let mut randomness = Vec::with_capacity(selection.len());
        for &chosen in selection {
            let v: u8 = if chosen { 1 } else { 0 };
            let enc = paillier::encrypt(rng, &pk, &BigInt::from(v)).map_err(BallotError::Paillier)?;
            ciphertexts.push(enc.ciphertext);
            plaintexts.push(v);
            randomness.push(enc.randomness);
        }

        let selected_count: u32 = plaintexts.iter().map(|&v| v as u32).sum();
        if selected_count == 0 {
            return Err(BallotError::EmptySelection);
        }

        let vote_proof =
            zkp::generate_vote_proof(rng, &pk, &ciphertexts, &plaintexts, &randomness, self.hasher.as_ref())
                .map_err(BallotError::Zkp)?;

        Ok(BallotPackage {
            public_key: pk,
            ciphertexts,
            proof: BallotProof {
                bit_proofs: vote_proof.bit_proofs,
                sum_proof: vote_proof.sum_proof,
                timestamp: Utc::now(),
            },
        })
    }

    pub fn verify(&self, pkg: &BallotPackage) -> VerificationReport {
        verify(pkg, self.hasher.as_ref())
    }

    /// Decrypts each slot plus the homomorphic aggregate; the two are
    /// always consistent since `total` is computed from `sumCiphertexts`
    /// over the same `ciphertexts`, never summed client-side.
    pub fn tally(&self, ciphertexts: &[BigInt]) -> Result<(Vec<BigInt>, BigInt), BallotError> {
        let sk = self
            .paillier
            .private_key()
            .ok_or(BallotError::NoPrivateKey)?;
        let pk = self.paillier.public_key().ok_or(BallotError::NoPublicKey)?;

        let per_slot: Result<Vec<BigInt>, PaillierError> =
            ciphertexts.iter().map(|c| paillier::decrypt(sk, c)).collect();
        let per_slot = per_slot.map_err(BallotError::Paillier)?;

        let aggregate = paillier::sum_ciphertexts(pk, ciphertexts).map_err(BallotError::Paillier)?;
        let total = paillier::decrypt(sk, &aggregate).map_err(BallotError::Paillier)?;

        Ok((per_slot, total))
    }
}

// --- JSON submission payload -----------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyPayload {
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub n: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub g: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub n_squared: BigInt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVotePayload {
    pub candidate_id: u32,
    pub candidate_name: String,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub ciphertext: BigInt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigmaTriplePayload {
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub a: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub e: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub z: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub r_response: BigInt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitProofPayload {
    pub candidate_id: u32,
    pub proof0: SigmaTriplePayload,
    pub proof1: SigmaTriplePayload,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub ciphertext: BigInt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SumProofPayload {
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub encrypted_sum: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub expected_sum: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub a: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub e: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub z: BigInt,
    #[serde(with = "crate::serde_support::bigint_decimal")]
    pub r_response: BigInt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkpProofsPayload {
    pub bit_proofs: Vec<BitProofPayload>,
    pub sum_proof: SumProofPayload,
}

/// The stable JSON shape of a ballot submission. `timestamp` serializes
/// as RFC 3339 via `chrono`'s serde support, which is ISO-8601 compliant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSubmission {
    pub timestamp: DateTime<Utc>,
    pub voter_id: String,
    pub session_id: String,
    pub public_key: PublicKeyPayload,
    pub encrypted_votes: Vec<EncryptedVotePayload>,
    pub zkp_proofs: ZkpProofsPayload,
}

impl BallotPackage {
    /// Builds the outbound submission payload. `candidate_names[i]` names
    /// the candidate occupying ciphertext slot `i`.
    pub fn to_submission(
        &self,
        voter_id: impl Into<String>,
        session_id: impl Into<String>,
        candidate_names: &[String],
    ) -> BallotSubmission {
        let public_key = PublicKeyPayload {
            n: self.public_key.n.clone(),
            g: self.public_key.g.clone(),
            n_squared: self.public_key.n_squared.clone(),
        };

        let encrypted_votes = self
            .ciphertexts
            .iter()
            .enumerate()
            .map(|(i, c)| EncryptedVotePayload {
                candidate_id: i as u32,
                candidate_name: candidate_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("candidate-{i}")),
                ciphertext: c.clone(),
            })
            .collect();

        let bit_proofs = self
            .proof
            .bit_proofs
            .iter()
            .enumerate()
            .map(|(i, bp)| BitProofPayload {
                candidate_id: i as u32,
                proof0: SigmaTriplePayload {
                    a: bp.proof0.a.clone(),
                    e: bp.proof0.e.clone(),
                    z: bp.proof0.z.clone(),
                    r_response: bp.proof0.r_response.clone(),
                },
                proof1: SigmaTriplePayload {
                    a: bp.proof1.a.clone(),
                    e: bp.proof1.e.clone(),
                    z: bp.proof1.z.clone(),
                    r_response: bp.proof1.r_response.clone(),
                },
                ciphertext: bp.ciphertext.clone(),
            })
            .collect();

        let sum_proof = SumProofPayload {
            encrypted_sum: self.proof.sum_proof.encrypted_sum.clone(),
            expected_sum: self.proof.sum_proof.expected_sum.clone(),
            a: self.proof.sum_proof.a.clone(),
            e: self.proof.sum_proof.e.clone(),
            z: self.proof.sum_proof.z.clone(),
            r_response: self.proof.sum_proof.r_response.clone(),
        };

        BallotSubmission {
            timestamp: self.proof.timestamp,
            voter_id: voter_id.into(),
            session_id: session_id.into(),
            public_key,
            encrypted_votes,
            zkp_proofs: ZkpProofsPayload {
                bit_proofs,
                sum_proof,
            },
        }
    }
}
