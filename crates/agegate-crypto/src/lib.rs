//! AgeGate Crypto — the secure-digest primitive and the anonymous proof
//! tokens derived from verified attempts.

pub mod error;
pub mod hashing;
pub mod proof;

pub use error::CryptoError;
pub use hashing::{hash, Blake3Digest, Hash, SecureDigest};
pub use proof::{proof_summary, ProofGenerator, PROOF_TOKEN_LEN};
