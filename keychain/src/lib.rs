//! A password-protected local keychain: named, RSA private keys encrypted
//! to PKCS#8 under a passphrase-derived DEK, persisted through a pluggable
//! [`keychain_datastore::Datastore`].
//!
//! The facade in [`facade`] is the only public entry point; [`name`]
//! (validation) and [`delay`] (the error-delay smear) are its supporting
//! policy modules. Everything cryptographic lives in the `keychain-crypto`
//! crate, and storage in `keychain-datastore` — this crate only composes
//! them.

mod delay;
mod error;
mod facade;
mod name;

pub use error::{KeychainError, KeychainResult};
pub use facade::{EncryptResult, Keychain, KeyInfo};

pub use keychain_crypto::{DekHash, DekParams};
pub use keychain_datastore::{Datastore, DatastoreError, InMemoryDatastore};

/// Re-exported so callers can build a [`facade::KeychainConfig`] without a
/// separate import; kept as a distinct re-export (rather than folded into
/// `facade::Keychain::new`) to mirror the source's separate config object.
pub use facade::KeychainConfig;
