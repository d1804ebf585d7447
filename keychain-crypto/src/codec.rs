//! RSA key generation and PKCS#8 encrypted PEM codec.
//!
//! Encoding has two paths because they have different requirements, but
//! decoding is a single operation since both produce standard PKCS#8:
//! - `encode_private_key` (used when a key is first created) lets the
//!   PKCS#8 layer pick its own PBES2 parameters; all that matters is that
//!   the DEK is the password.
//! - `reencrypt_for_export` is used when a key leaves the keychain under a
//!   caller-supplied password, and must use AES-256-CBC with PBKDF2/SHA-512
//!   explicitly rather than whatever the crate defaults to, so exported
//!   material has predictable, audited parameters.

use crate::error::{CryptoError, CryptoResult};
use pkcs5::pbes2;
use pkcs8::der::zeroize::Zeroizing;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncryptedPrivateKeyInfo, LineEnding};
use rand::RngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};

pub const MIN_RSA_BITS: usize = 2048;

/// Generates a fresh RSA private key, rejecting anything below the 2048-bit
/// floor mandated by NIST SP 800-131A.
pub fn generate_rsa(bits: usize) -> CryptoResult<RsaPrivateKey> {
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::InvalidRsaKeySize(bits));
    }
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, bits).map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

pub fn public_key_of(private_key: &RsaPrivateKey) -> RsaPublicKey {
    RsaPublicKey::from(private_key)
}

/// Encrypts `private_key` under `dek` using the PKCS#8 crate's own PBES2
/// defaults, returning a PEM document. This is the format stored at rest.
pub fn encode_private_key(private_key: &RsaPrivateKey, dek: &str) -> CryptoResult<Zeroizing<String>> {
    let mut rng = rand::thread_rng();
    private_key
        .to_pkcs8_encrypted_pem(&mut rng, dek.as_bytes(), LineEnding::LF)
        .map_err(|e| CryptoError::Encode(e.to_string()))
}

/// Decrypts a PKCS#8 encrypted PEM document under `password` — the single
/// decode entry point for both DEK-encrypted (at-rest) and user-password-
/// encrypted (exported) material, since both are standard PKCS#8.
pub fn decode_encrypted_pem(pem: &str, password: &str) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_encrypted_pem(pem, password.as_bytes())
        .map_err(|e| CryptoError::Decode(e.to_string()))
}

/// Re-encrypts `private_key` for export under `password`, using AES-256-CBC
/// and PBKDF2 with an explicit HMAC-SHA-512 PRF at `iterations`. `salt` must
/// already satisfy the DEK salt floor; callers derive it the same way they
/// derive DEK salts.
pub fn reencrypt_for_export(
    private_key: &RsaPrivateKey,
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> CryptoResult<Zeroizing<String>> {
    let plaintext_der = private_key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::Encode(e.to_string()))?;

    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);

    let kdf = pbes2::Kdf::Pbkdf2(pbes2::Pbkdf2Params {
        salt,
        iteration_count: iterations,
        key_length: None,
        prf: pbes2::Pbkdf2Prf::HmacWithSha512,
    });
    let params = pbes2::Parameters {
        kdf,
        encryption: pbes2::EncryptionScheme::Aes256Cbc { iv: &iv },
    };

    let encrypted_data = params
        .encrypt(password.as_bytes(), plaintext_der.as_bytes())
        .map_err(|e| CryptoError::Encode(e.to_string()))?;

    let info = EncryptedPrivateKeyInfo {
        encryption_algorithm: params.into(),
        encrypted_data: &encrypted_data,
    };

    info.to_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEK: &str = "aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899";

    #[test]
    fn rejects_undersized_rsa_keys() {
        let err = generate_rsa(1024).unwrap_err();
        assert_eq!(err.to_string(), "Invalid RSA key size 1024");
    }

    #[test]
    fn encode_decode_round_trips() {
        let key = generate_rsa(2048).unwrap();
        let pem = encode_private_key(&key, DEK).unwrap();
        assert!(pem.contains("ENCRYPTED PRIVATE KEY"));

        let decoded = decode_encrypted_pem(&pem, DEK).unwrap();
        assert_eq!(
            decoded.to_pkcs8_der().unwrap().as_bytes(),
            key.to_pkcs8_der().unwrap().as_bytes()
        );
    }

    #[test]
    fn decode_with_wrong_dek_fails() {
        let key = generate_rsa(2048).unwrap();
        let pem = encode_private_key(&key, DEK).unwrap();
        assert!(decode_encrypted_pem(&pem, "wrong-dek-entirely").is_err());
    }

    #[test]
    fn export_round_trips_under_caller_password() {
        let key = generate_rsa(2048).unwrap();
        let pem = reencrypt_for_export(&key, "correct horse battery staple", &[9u8; 16], 10_000)
            .unwrap();
        let decoded = decode_encrypted_pem(&pem, "correct horse battery staple").unwrap();
        assert_eq!(
            decoded.to_pkcs8_der().unwrap().as_bytes(),
            key.to_pkcs8_der().unwrap().as_bytes()
        );
    }

    #[test]
    fn export_with_wrong_password_fails() {
        let key = generate_rsa(2048).unwrap();
        let pem = reencrypt_for_export(&key, "correct horse battery staple", &[9u8; 16], 10_000)
            .unwrap();
        assert!(decode_encrypted_pem(&pem, "not the right password").is_err());
    }
}
