use crate::error::CryptoError;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// A collision-resistant digest primitive supplied by the platform.
pub trait SecureDigest: Send + Sync {
    /// Short algorithm name, e.g. `"blake3"`.
    fn algorithm(&self) -> &'static str;

    /// Digest `data`. Implementations backed by hardware or an OS service
    /// may fail at call time.
    fn digest(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Software BLAKE3 digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digest;

impl SecureDigest for Blake3Digest {
    fn algorithm(&self) -> &'static str {
        "blake3"
    }

    fn digest(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(hash(data).to_vec())
    }
}
