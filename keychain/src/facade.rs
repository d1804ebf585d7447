//! The keychain facade: the public contract described in this crate's
//! top-level docs. Composes the name policy, the crypto codec, and a
//! pluggable [`Datastore`], and routes every asynchronous failure through
//! the error-delay smear.

use crate::delay;
use crate::error::{KeychainError, KeychainResult};
use crate::name::{self, RESERVED_NAME};
use keychain_crypto::{
    decode_encrypted_pem, decode_marshalled_private_key, derive_dek,
    encode_private_key, generate_rsa, key_id_for_rsa_public_key, public_key_of,
    reencrypt_for_export, DekParams, RsaPrivateKey,
};
use keychain_datastore::Datastore;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

const PKCS8_FILE_EXTENSION_HINT: &str = "p8";

/// Immutable configuration for a [`Keychain`] instance: the passphrase and
/// the DEK derivation parameters. `dek_params` is validated by
/// [`DekParams::new`]; the passphrase floor is checked in [`Keychain::new`],
/// where the DEK is actually derived. Both surface synchronously, never
/// through the error-delay path (the caller can't yet observe anything
/// useful).
pub struct KeychainConfig {
    passphrase: Zeroizing<String>,
    dek_params: DekParams,
}

impl KeychainConfig {
    /// `dek_params` is validated already (see [`DekParams::new`]); the
    /// passphrase floor is checked when this config is bound to a
    /// datastore in [`Keychain::new`], since that's the point where the
    /// DEK actually gets derived.
    pub fn new(passphrase: impl Into<String>, dek_params: DekParams) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            dek_params,
        }
    }
}

/// `{ name, id, path }` describing a stored key without exposing its
/// decrypted material.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyInfo {
    pub name: String,
    pub id: String,
    pub path: Option<String>,
}

/// Result of [`Keychain::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncryptResult {
    pub algorithm: String,
    pub data: Vec<u8>,
}

pub struct Keychain {
    dek: Zeroizing<String>,
    datastore: Arc<dyn Datastore>,
}

impl Keychain {
    /// Derives the DEK from `config` and binds to `datastore`. DEK
    /// derivation floor violations (short passphrase, undersized DEK
    /// params) are the only errors this constructor returns, and they're
    /// returned synchronously rather than through the error-delay path.
    pub fn new(config: KeychainConfig, datastore: Arc<dyn Datastore>) -> KeychainResult<Self> {
        let dek = derive_dek(&config.passphrase, &config.dek_params)
            .map_err(|e| KeychainError::BadParameter(e.to_string()))?;
        Ok(Self { dek, datastore })
    }

    fn validate_mutating_name(name: &str) -> KeychainResult<()> {
        if !name::validate_key_name(name) {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        if name == RESERVED_NAME {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    async fn load_private_key(&self, name: &str) -> KeychainResult<RsaPrivateKey> {
        let ds_key = name::to_ds_key(name);
        if !self.datastore.has(&ds_key).await? {
            return Err(KeychainError::NotFound(name.to_string()));
        }
        let pem = self.datastore.get(&ds_key).await?;
        let pem = String::from_utf8(pem)
            .map_err(|e| KeychainError::Crypto(keychain_crypto::CryptoError::Decode(e.to_string())))?;
        Ok(decode_encrypted_pem(&pem, &self.dek)?)
    }

    async fn key_info_for(&self, name: &str, private_key: &RsaPrivateKey) -> KeychainResult<KeyInfo> {
        let public_key = public_key_of(private_key);
        let id = key_id_for_rsa_public_key(&public_key)?;
        Ok(KeyInfo {
            name: name.to_string(),
            id,
            path: Some(format!("{}.{PKCS8_FILE_EXTENSION_HINT}", name::to_ds_key(name))),
        })
    }

    /// Loads and decodes the stored key, then derives its [`KeyInfo`].
    /// Equivalent to the source's `_getKeyInfo`/`findKeyByName`.
    pub async fn find_key_by_name(&self, name: &str) -> KeychainResult<KeyInfo> {
        let result = self.do_find_key_by_name(name).await;
        self.delay_on_err(result).await
    }

    async fn do_find_key_by_name(&self, name: &str) -> KeychainResult<KeyInfo> {
        if !name::validate_key_name(name) {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        let private_key = self.load_private_key(name).await?;
        self.key_info_for(name, &private_key).await
    }

    /// Alias for [`Keychain::find_key_by_name`], kept for parity with the
    /// source's duplicate public entry point.
    pub async fn get_key_info(&self, name: &str) -> KeychainResult<KeyInfo> {
        self.find_key_by_name(name).await
    }

    #[instrument(skip(self))]
    pub async fn create_key(
        &self,
        name: &str,
        key_type: &str,
        size: usize,
    ) -> KeychainResult<KeyInfo> {
        let result = self.do_create_key(name, key_type, size).await;
        self.delay_on_err(result).await
    }

    async fn do_create_key(
        &self,
        name: &str,
        key_type: &str,
        size: usize,
    ) -> KeychainResult<KeyInfo> {
        Self::validate_mutating_name(name)?;
        if key_type != "rsa" {
            return Err(KeychainError::BadParameter(format!(
                "Invalid key type '{key_type}'"
            )));
        }

        let ds_key = name::to_ds_key(name);
        if self.datastore.has(&ds_key).await? {
            return Err(KeychainError::AlreadyExists(name.to_string()));
        }

        let private_key = generate_rsa(size).map_err(|e| match e {
            keychain_crypto::CryptoError::InvalidRsaKeySize(bits) => {
                KeychainError::BadParameter(format!("Invalid RSA key size {bits}"))
            }
            other => KeychainError::Crypto(other),
        })?;
        let pem = encode_private_key(&private_key, &self.dek)?;
        self.datastore.put(&ds_key, pem.as_bytes().to_vec()).await?;

        info!(name, "created key");
        self.key_info_for(name, &private_key).await
    }

    pub async fn list_keys(&self) -> KeychainResult<Vec<KeyInfo>> {
        let result = self.do_list_keys().await;
        self.delay_on_err(result).await
    }

    async fn do_list_keys(&self) -> KeychainResult<Vec<KeyInfo>> {
        let ds_keys = self.datastore.query_keys().await?;
        let mut infos = Vec::with_capacity(ds_keys.len());
        for ds_key in ds_keys {
            let name = name::from_ds_key(&ds_key);
            let pem = self.datastore.get(&ds_key).await?;
            let pem = String::from_utf8(pem).map_err(|e| {
                KeychainError::Crypto(keychain_crypto::CryptoError::Decode(e.to_string()))
            })?;
            let private_key = decode_encrypted_pem(&pem, &self.dek)?;
            infos.push(self.key_info_for(&name, &private_key).await?);
        }
        Ok(infos)
    }

    /// `O(n)` lookup by key-id over [`Keychain::list_keys`], as the source
    /// does; the core's scale doesn't warrant an index.
    pub async fn find_key_by_id(&self, id: &str) -> KeychainResult<Option<KeyInfo>> {
        let result = self.do_find_key_by_id(id).await;
        self.delay_on_err(result).await
    }

    async fn do_find_key_by_id(&self, id: &str) -> KeychainResult<Option<KeyInfo>> {
        let keys = self.do_list_keys().await?;
        Ok(keys.into_iter().find(|info| info.id == id))
    }

    pub async fn remove_key(&self, name: &str) -> KeychainResult<()> {
        let result = self.do_remove_key(name).await;
        self.delay_on_err(result).await
    }

    async fn do_remove_key(&self, name: &str) -> KeychainResult<()> {
        Self::validate_mutating_name(name)?;
        let ds_key = name::to_ds_key(name);
        if !self.datastore.has(&ds_key).await? {
            return Err(KeychainError::NotFound(name.to_string()));
        }
        self.datastore.delete(&ds_key).await?;
        Ok(())
    }

    pub async fn rename_key(&self, old_name: &str, new_name: &str) -> KeychainResult<KeyInfo> {
        let result = self.do_rename_key(old_name, new_name).await;
        self.delay_on_err(result).await
    }

    async fn do_rename_key(&self, old_name: &str, new_name: &str) -> KeychainResult<KeyInfo> {
        Self::validate_mutating_name(old_name)?;
        Self::validate_mutating_name(new_name)?;

        let old_ds_key = name::to_ds_key(old_name);
        let new_ds_key = name::to_ds_key(new_name);

        if !self.datastore.has(&old_ds_key).await? {
            return Err(KeychainError::NotFound(old_name.to_string()));
        }
        if self.datastore.has(&new_ds_key).await? {
            return Err(KeychainError::AlreadyExists(new_name.to_string()));
        }

        let pem = self.datastore.get(&old_ds_key).await?;

        let mut batch = self.datastore.batch();
        batch.put(new_ds_key, pem.clone());
        batch.delete(old_ds_key);
        batch.commit().await?;

        let private_key = decode_encrypted_pem(
            &String::from_utf8(pem)
                .map_err(|e| KeychainError::Crypto(keychain_crypto::CryptoError::Decode(e.to_string())))?,
            &self.dek,
        )?;
        self.key_info_for(new_name, &private_key).await
    }

    pub async fn export_key(&self, name: &str, password: &str) -> KeychainResult<Zeroizing<String>> {
        let result = self.do_export_key(name, password).await;
        self.delay_on_err(result).await
    }

    async fn do_export_key(&self, name: &str, password: &str) -> KeychainResult<Zeroizing<String>> {
        if !name::validate_key_name(name) {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        if password.is_empty() {
            return Err(KeychainError::BadInput("Password is required".to_string()));
        }

        let private_key = self.load_private_key(name).await?;
        let salt = export_salt();
        let pem = reencrypt_for_export(&private_key, password, &salt, export_iterations())?;
        Ok(pem)
    }

    pub async fn import_key(
        &self,
        name: &str,
        pem: &str,
        password: &str,
    ) -> KeychainResult<KeyInfo> {
        let result = self.do_import_key(name, pem, password).await;
        self.delay_on_err(result).await
    }

    async fn do_import_key(&self, name: &str, pem: &str, password: &str) -> KeychainResult<KeyInfo> {
        Self::validate_mutating_name(name)?;
        if password.is_empty() {
            return Err(KeychainError::BadInput("Password is required".to_string()));
        }

        let ds_key = name::to_ds_key(name);
        if self.datastore.has(&ds_key).await? {
            return Err(KeychainError::AlreadyExists(name.to_string()));
        }

        let private_key = decode_encrypted_pem(pem, password).map_err(|_| KeychainError::WrongPassword)?;
        let reencoded = encode_private_key(&private_key, &self.dek)?;
        self.datastore.put(&ds_key, reencoded.as_bytes().to_vec()).await?;

        self.key_info_for(name, &private_key).await
    }

    pub async fn import_peer(&self, name: &str, marshalled_priv_key: &[u8]) -> KeychainResult<KeyInfo> {
        let result = self.do_import_peer(name, marshalled_priv_key).await;
        self.delay_on_err(result).await
    }

    async fn do_import_peer(
        &self,
        name: &str,
        marshalled_priv_key: &[u8],
    ) -> KeychainResult<KeyInfo> {
        Self::validate_mutating_name(name)?;
        if marshalled_priv_key.is_empty() {
            return Err(KeychainError::BadInput("Peer.privKey is required".to_string()));
        }

        let ds_key = name::to_ds_key(name);
        if self.datastore.has(&ds_key).await? {
            return Err(KeychainError::AlreadyExists(name.to_string()));
        }

        // Propagate the decode error directly, unlike the documented bug in
        // the source where it's swallowed before `key.marshal()` is called.
        let private_key = decode_marshalled_private_key(marshalled_priv_key)?;
        let pem = encode_private_key(&private_key, &self.dek)?;
        self.datastore.put(&ds_key, pem.as_bytes().to_vec()).await?;

        self.key_info_for(name, &private_key).await
    }

    pub async fn encrypt(&self, name: &str, plaintext: &[u8]) -> KeychainResult<EncryptResult> {
        let result = self.do_encrypt(name, plaintext).await;
        self.delay_on_err(result).await
    }

    async fn do_encrypt(&self, name: &str, plaintext: &[u8]) -> KeychainResult<EncryptResult> {
        if !name::validate_key_name(name) {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        if plaintext.is_empty() {
            return Err(KeychainError::BadInput("Data is required".to_string()));
        }

        let private_key = self.load_private_key(name).await?;
        let public_key: RsaPublicKey = public_key_of(&private_key);
        let data = public_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| KeychainError::Crypto(keychain_crypto::CryptoError::Encode(e.to_string())))?;

        Ok(EncryptResult {
            algorithm: "RSA_PKCS1_PADDING".to_string(),
            data,
        })
    }

    pub async fn decrypt(&self, name: &str, ciphertext: &[u8]) -> KeychainResult<Vec<u8>> {
        let result = self.do_decrypt(name, ciphertext).await;
        self.delay_on_err(result).await
    }

    async fn do_decrypt(&self, name: &str, ciphertext: &[u8]) -> KeychainResult<Vec<u8>> {
        if !name::validate_key_name(name) {
            return Err(KeychainError::InvalidName(name.to_string()));
        }
        if ciphertext.is_empty() {
            return Err(KeychainError::BadInput("Data is required".to_string()));
        }

        let private_key = self.load_private_key(name).await?;
        private_key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| KeychainError::Crypto(keychain_crypto::CryptoError::Decode(e.to_string())))
    }

    async fn delay_on_err<T>(&self, result: KeychainResult<T>) -> KeychainResult<T> {
        if let Err(ref e) = result {
            warn!(error = %e, "keychain operation failed");
            delay::error_delay().await;
        }
        result
    }
}

fn export_salt() -> Vec<u8> {
    use rand::RngCore;
    let mut salt = vec![0u8; keychain_crypto::MIN_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn export_iterations() -> u32 {
    keychain_crypto::DEFAULT_ITERATION_COUNT
}
