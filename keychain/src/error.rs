//! `KeychainError` taxonomy. As with [`keychain_crypto::CryptoError`],
//! message text is part of the observable contract and is asserted on
//! directly by the facade's test suite.

use keychain_crypto::CryptoError;
use keychain_datastore::DatastoreError;

#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    #[error("Invalid key name '{0}'")]
    InvalidName(String),

    #[error("Key '{0}' already exists")]
    AlreadyExists(String),

    #[error("Key '{0}' does not exist.")]
    NotFound(String),

    #[error("{0}")]
    BadParameter(String),

    #[error("Cannot read the key, most likely the password is wrong")]
    WrongPassword,

    #[error("{0}")]
    BadInput(String),

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("datastore failure: {0}")]
    Datastore(#[from] DatastoreError),
}

pub type KeychainResult<T> = Result<T, KeychainError>;
