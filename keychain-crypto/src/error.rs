//! Error taxonomy for the crypto layer.
//!
//! Message text is part of the observable contract (the facade's test
//! suite asserts on exact strings for several of these), so wording here
//! is deliberate and should not be "cleaned up" without checking spec
//! scenario B/C/E in the facade crate's test suite.

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("passPhrase must be least 20 characters")]
    PassphraseTooShort,
    #[error("dek.keyLength must be least {min} bytes")]
    DekKeyLengthTooShort { min: usize },
    #[error("dek.salt must be least {min} bytes")]
    DekSaltTooShort { min: usize },
    #[error("dek.iterationCount must be least {min}")]
    DekIterationCountTooLow { min: u32 },
    #[error("Invalid RSA key size {0}")]
    InvalidRsaKeySize(usize),
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),
    #[error("PKCS#8 encoding failed: {0}")]
    Encode(String),
    #[error("PKCS#8 decoding failed: {0}")]
    Decode(String),
    #[error("peer private key envelope is malformed: {0}")]
    PeerEnvelope(String),
    #[error("unsupported peer key type: {0}")]
    UnsupportedPeerKeyType(i32),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
