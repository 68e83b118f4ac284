use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::{Result, StorageError};

const NONCE_SIZE: usize = 12;
pub(crate) const KEY_SIZE: usize = 32;

/// AES-256-GCM with a random nonce prepended to every ciphertext.
pub(crate) struct ProfileCipher {
    cipher: Aes256Gcm,
}

impl ProfileCipher {
    pub(crate) fn new(master_key: &[u8]) -> Result<Self> {
        if master_key.len() != KEY_SIZE {
            return Err(StorageError::MasterKey(format!(
                "Master key must be {KEY_SIZE} bytes, got {}",
                master_key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(master_key)
            .map_err(|err| StorageError::MasterKey(format!("Invalid master key length: {err:?}")))?;

        Ok(Self { cipher })
    }

    pub(crate) fn generate_key() -> [u8; KEY_SIZE] {
        let generated = Aes256Gcm::generate_key(&mut OsRng);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(generated.as_slice());
        key
    }

    pub(crate) fn encrypt(&self, associated_data: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let mut ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|err| StorageError::Crypto(format!("Failed to encrypt payload: {err:?}")))?;
        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(nonce.as_slice());
        output.append(&mut ciphertext);
        Ok(output)
    }

    pub(crate) fn decrypt(&self, associated_data: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(StorageError::Crypto("Ciphertext is too short".to_string()));
        }

        let (nonce_bytes, payload) = ciphertext.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(
                nonce,
                Payload {
                    msg: payload,
                    aad: associated_data,
                },
            )
            .map_err(|err| StorageError::Crypto(format!("Failed to decrypt payload: {err:?}")))
    }
}
