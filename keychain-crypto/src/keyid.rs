//! Key-id derivation: SHA-256 of the DER-encoded SubjectPublicKeyInfo,
//! wrapped as a sha2-256 multihash (code `0x12`), base58-encoded. This is
//! the same convention libp2p uses for PeerIds, which is why imported peer
//! keys and locally generated keys end up with ids of the same shape.

use crate::error::CryptoResult;
use multihash::Multihash;
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};

const SHA2_256_MULTIHASH_CODE: u64 = 0x12;
const MULTIHASH_DIGEST_SIZE: usize = 32;

/// Derives the key-id for an RSA public key.
pub fn key_id_for_rsa_public_key(public_key: &RsaPublicKey) -> CryptoResult<String> {
    let spki_der = public_key
        .to_public_key_der()
        .map_err(|e| crate::error::CryptoError::Encode(e.to_string()))?;
    Ok(key_id_for_spki_der(spki_der.as_bytes()))
}

/// Derives the key-id directly from an already-encoded SubjectPublicKeyInfo.
/// Exposed separately so peer-imported keys (which arrive as raw key
/// material rather than an `RsaPublicKey`) can reuse the same derivation.
pub fn key_id_for_spki_der(spki_der: &[u8]) -> String {
    let digest = Sha256::digest(spki_der);
    let mh = Multihash::<MULTIHASH_DIGEST_SIZE>::wrap(SHA2_256_MULTIHASH_CODE, &digest)
        .expect("sha2-256 digest is exactly the multihash's allocated size");
    bs58::encode(mh.to_bytes()).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    #[test]
    fn key_id_is_stable_for_the_same_public_key() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let a = key_id_for_rsa_public_key(&public).unwrap();
        let b = key_id_for_rsa_public_key(&public).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_id_differs_for_different_keys() {
        let mut rng = rand::thread_rng();
        let p1 = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let p2 = RsaPrivateKey::new(&mut rng, 2048).unwrap();

        let a = key_id_for_rsa_public_key(&RsaPublicKey::from(&p1)).unwrap();
        let b = key_id_for_rsa_public_key(&RsaPublicKey::from(&p2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn key_id_is_valid_base58() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let id = key_id_for_rsa_public_key(&RsaPublicKey::from(&private)).unwrap();
        assert!(bs58::decode(&id).into_vec().is_ok());
    }
}
