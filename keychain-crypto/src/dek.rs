//! Data-encrypting-key derivation.
//!
//! The DEK is a PBKDF2 output rendered as a lowercase hex string and used
//! verbatim as the PKCS#8 password. Parameters follow NIST SP 800-132
//! floors: passphrase >= 20 chars, derived key >= 14 bytes, salt >= 16
//! bytes, iteration count >= 1000.

use crate::error::{CryptoError, CryptoResult};
use hmac::Hmac;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

pub const MIN_PASSPHRASE_LEN: usize = 20;
pub const MIN_KEY_LENGTH: usize = 14;
pub const MIN_SALT_LEN: usize = 16;
pub const MIN_ITERATION_COUNT: u32 = 1000;

pub const DEFAULT_KEY_LENGTH: usize = 64;
pub const DEFAULT_ITERATION_COUNT: u32 = 10_000;
pub const DEFAULT_HASH: DekHash = DekHash::Sha512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DekHash {
    Sha256,
    Sha512,
}

/// Parameters for [`derive_dek`]. Construct with [`DekParams::new`], which
/// enforces the NIST floors up front so a bad config fails at the call site
/// that built it rather than deep inside key generation.
#[derive(Debug, Clone)]
pub struct DekParams {
    pub key_length: usize,
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub hash: DekHash,
}

impl DekParams {
    pub fn new(
        key_length: usize,
        salt: Vec<u8>,
        iterations: u32,
        hash: DekHash,
    ) -> CryptoResult<Self> {
        if key_length < MIN_KEY_LENGTH {
            return Err(CryptoError::DekKeyLengthTooShort {
                min: MIN_KEY_LENGTH,
            });
        }
        if salt.len() < MIN_SALT_LEN {
            return Err(CryptoError::DekSaltTooShort { min: MIN_SALT_LEN });
        }
        if iterations < MIN_ITERATION_COUNT {
            return Err(CryptoError::DekIterationCountTooLow {
                min: MIN_ITERATION_COUNT,
            });
        }
        Ok(Self {
            key_length,
            salt,
            iterations,
            hash,
        })
    }

    pub fn with_defaults(salt: Vec<u8>) -> CryptoResult<Self> {
        Self::new(DEFAULT_KEY_LENGTH, salt, DEFAULT_ITERATION_COUNT, DEFAULT_HASH)
    }
}

/// Derives the DEK for `passphrase` under `params`, returning it as a
/// lowercase hex string. The string is the value actually handed to the
/// PKCS#8 encryptor as its password.
pub fn derive_dek(passphrase: &str, params: &DekParams) -> CryptoResult<Zeroizing<String>> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(CryptoError::PassphraseTooShort);
    }

    let mut out = Zeroizing::new(vec![0u8; params.key_length]);
    match params.hash {
        DekHash::Sha256 => {
            pbkdf2::pbkdf2::<Hmac<Sha256>>(
                passphrase.as_bytes(),
                &params.salt,
                params.iterations,
                &mut out,
            )
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        }
        DekHash::Sha512 => {
            pbkdf2::pbkdf2::<Hmac<Sha512>>(
                passphrase.as_bytes(),
                &params.salt,
                params.iterations,
                &mut out,
            )
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        }
    }

    Ok(Zeroizing::new(hex::encode(&*out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn long_passphrase() -> String {
        "correct horse battery staple extra".to_string()
    }

    #[test]
    fn rejects_short_passphrase() {
        let params = DekParams::with_defaults(vec![0u8; 16]).unwrap();
        let err = derive_dek("too short", &params).unwrap_err();
        assert_eq!(err.to_string(), "passPhrase must be least 20 characters");
    }

    #[test]
    fn rejects_short_key_length() {
        let err = DekParams::new(8, vec![0u8; 16], 10_000, DekHash::Sha512).unwrap_err();
        assert_eq!(err.to_string(), "dek.keyLength must be least 14 bytes");
    }

    #[test]
    fn rejects_short_salt() {
        let err = DekParams::new(64, vec![0u8; 4], 10_000, DekHash::Sha512).unwrap_err();
        assert_eq!(err.to_string(), "dek.salt must be least 16 bytes");
    }

    #[test]
    fn rejects_low_iteration_count() {
        let err = DekParams::new(64, vec![0u8; 16], 1, DekHash::Sha512).unwrap_err();
        assert_eq!(err.to_string(), "dek.iterationCount must be least 1000");
    }

    #[test]
    fn derivation_is_deterministic() {
        let params = DekParams::with_defaults(vec![7u8; 16]).unwrap();
        let a = derive_dek(&long_passphrase(), &params).unwrap();
        let b = derive_dek(&long_passphrase(), &params).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), DEFAULT_KEY_LENGTH * 2);
    }

    #[test]
    fn different_salts_give_different_deks() {
        let a = derive_dek(
            &long_passphrase(),
            &DekParams::with_defaults(vec![1u8; 16]).unwrap(),
        )
        .unwrap();
        let b = derive_dek(
            &long_passphrase(),
            &DekParams::with_defaults(vec![2u8; 16]).unwrap(),
        )
        .unwrap();
        assert_ne!(*a, *b);
    }

    proptest::proptest! {
        /// Any salt/key-length/iteration-count above their NIST floors is
        /// accepted, and derivation never panics and always yields a hex
        /// string of exactly `2 * key_length` characters.
        #[test]
        fn accepts_and_derives_for_any_params_above_the_floors(
            key_length in MIN_KEY_LENGTH..128usize,
            salt_len in MIN_SALT_LEN..64usize,
            iterations in MIN_ITERATION_COUNT..5_000u32,
            passphrase_extra in 0..40usize,
        ) {
            let salt = vec![0xab_u8; salt_len];
            let params = DekParams::new(key_length, salt, iterations, DekHash::Sha256).unwrap();

            let passphrase = format!("{}{}", long_passphrase(), "x".repeat(passphrase_extra));
            let dek = derive_dek(&passphrase, &params).unwrap();
            prop_assert_eq!(dek.len(), key_length * 2);
        }

        /// Anything below a floor is rejected, never silently clamped.
        #[test]
        fn rejects_any_key_length_below_the_floor(key_length in 0..MIN_KEY_LENGTH) {
            let err = DekParams::new(key_length, vec![0u8; 16], 10_000, DekHash::Sha512).unwrap_err();
            prop_assert!(matches!(err, CryptoError::DekKeyLengthTooShort { .. }));
        }

        /// Derivation is a pure function of its inputs: same passphrase and
        /// params always produce the same DEK.
        #[test]
        fn derivation_is_a_pure_function(salt_len in MIN_SALT_LEN..40usize) {
            let params = DekParams::new(32, vec![0x5a_u8; salt_len], 2_000, DekHash::Sha512).unwrap();
            let a = derive_dek(&long_passphrase(), &params).unwrap();
            let b = derive_dek(&long_passphrase(), &params).unwrap();
            prop_assert_eq!(*a, *b);
        }
    }
}
