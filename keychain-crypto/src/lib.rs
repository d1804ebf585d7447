//! DEK derivation, RSA/PKCS#8 key codec, and key-id derivation for the
//! keychain. This crate has no notion of names, storage, or the keychain's
//! state machine — it only turns passphrases into keys and keys into bytes.

mod codec;
mod dek;
mod error;
mod keyid;
mod peer;

pub use codec::{
    decode_encrypted_pem, encode_private_key, generate_rsa, public_key_of, reencrypt_for_export,
    MIN_RSA_BITS,
};
pub use dek::{
    derive_dek, DekHash, DekParams, DEFAULT_HASH, DEFAULT_ITERATION_COUNT, DEFAULT_KEY_LENGTH,
    MIN_ITERATION_COUNT, MIN_KEY_LENGTH, MIN_PASSPHRASE_LEN, MIN_SALT_LEN,
};
pub use error::{CryptoError, CryptoResult};
pub use keyid::{key_id_for_rsa_public_key, key_id_for_spki_der};
pub use peer::decode_marshalled_private_key;

pub use rsa::{RsaPrivateKey, RsaPublicKey};
