// Error taxonomy for the ballot-crypto core.
//
// Each layer (`math`, `paillier`, `zkp`, `ballot`) owns one `thiserror`
// enum. `BallotError` wraps the lower layers with `#[from]` while
// attaching its own context.

use thiserror::Error;

/// Failures from the big-integer arithmetic layer (`math`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("value out of the required range")]
    BadRange,
    #[error("no modular inverse exists (gcd != 1)")]
    NoInverse,
    #[error("system entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Failures from the Paillier cryptosystem layer (`paillier`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaillierError {
    #[error("plaintext is negative or >= n")]
    PlaintextOutOfRange,
    #[error("ciphertext is not in (0, n^2)")]
    CiphertextOutOfRange,
    #[error("no public key loaded")]
    NoPublicKey,
    #[error("no private key loaded")]
    NoPrivateKey,
    #[error("sumCiphertexts called with an empty list")]
    EmptyInput,
    #[error("key generation failed: {0}")]
    KeygenFailure(#[from] MathError),
    #[error("internal crypto invariant violated: {0}")]
    InternalError(String),
}

/// Failures from the zero-knowledge proof layer (`zkp`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZkpError {
    #[error("ciphertexts, plaintexts and randomness vectors have different lengths")]
    LengthMismatch,
    #[error("plaintext at index {0} is not 0 or 1")]
    NotABit(usize),
    #[error("selection plaintexts do not sum to exactly one")]
    SumNotOne,
    #[error("{0}")]
    Math(#[from] MathError),
    #[error("{0}")]
    Paillier(#[from] PaillierError),
}

/// Failures raised directly to the caller by the ballot orchestrator
/// (`ballot`). Note that proof *verification* failures are never raised
/// here — they surface as fields of a `VerificationReport` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BallotError {
    #[error("no public key loaded in the engine")]
    NoPublicKey,
    #[error("no private key loaded in the engine")]
    NoPrivateKey,
    #[error("selection vector has length {got}, expected {expected}")]
    WrongSelectionLength { expected: usize, got: usize },
    #[error("selection contains no chosen candidate")]
    EmptySelection,
    #[error(transparent)]
    Paillier(#[from] PaillierError),
    #[error(transparent)]
    Zkp(#[from] ZkpError),
}
