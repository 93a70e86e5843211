//! Payload cipher for sensitive files
//!
//! AES-256-GCM with a fresh random nonce per call. The nonce is returned to the
//! caller as a base64 string and persisted next to the file metadata (`iv`);
//! it is never prepended to the stored ciphertext.

use crate::constants::{ENCRYPTION_KEY_LEN, IV_LEN};
use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

/// Symmetric cipher for file payloads.
///
/// Cheap to clone; the offload worker hands a clone to every blocking task.
#[derive(Clone)]
pub struct FileCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for FileCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCipher").finish_non_exhaustive()
    }
}

impl FileCipher {
    /// Create a cipher from a raw 32-byte key (e.g. for tests; avoids env mutation).
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != ENCRYPTION_KEY_LEN {
            return Err(AppError::Config(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create a cipher from a base64-encoded 32-byte key (the `ENCRYPTION_KEY` format).
    pub fn from_base64(encoded: &str) -> Result<Self, AppError> {
        let key_bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("Failed to decode encryption key: {}", e)))?;

        Self::from_key_bytes(&key_bytes)
    }

    /// Encrypt a payload, returning the ciphertext and the base64 IV used.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, String), AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        Ok((ciphertext, general_purpose::STANDARD.encode(nonce)))
    }

    /// Decrypt a payload with the IV recorded at encryption time.
    ///
    /// A wrong key, a damaged IV or tampered ciphertext all fail authentication
    /// and surface as [`AppError::Decryption`].
    pub fn decrypt(&self, ciphertext: &[u8], iv: &str) -> Result<Vec<u8>, AppError> {
        let iv_bytes = general_purpose::STANDARD
            .decode(iv)
            .map_err(|e| AppError::Decryption(format!("Invalid IV encoding: {}", e)))?;

        if iv_bytes.len() != IV_LEN {
            return Err(AppError::Decryption(format!(
                "IV must be {} bytes, got {}",
                IV_LEN,
                iv_bytes.len()
            )));
        }

        let nonce = Nonce::from_slice(&iv_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::Decryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> FileCipher {
        let test_key = b"01234567890123456789012345678901";
        FileCipher::from_key_bytes(test_key).unwrap()
    }

    #[test]
    fn test_encryption_decryption() {
        let cipher = test_cipher();
        let plaintext = b"%PDF-1.4 medical certificate";

        let (ciphertext, iv) = cipher.encrypt(plaintext).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());
        assert!(!iv.is_empty());

        let decrypted = cipher.decrypt(&ciphertext, &iv).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let cipher = test_cipher();
        let (first, iv_a) = cipher.encrypt(b"same payload").unwrap();
        let (second, iv_b) = cipher.encrypt(b"same payload").unwrap();
        assert_ne!(iv_a, iv_b);
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_key_fails() {
        let (ciphertext, iv) = test_cipher().encrypt(b"signature").unwrap();
        let other = FileCipher::from_key_bytes(b"abcdefghijabcdefghijabcdefghijab").unwrap();
        let err = other.decrypt(&ciphertext, &iv).unwrap_err();
        assert!(matches!(err, AppError::Decryption(_)));
    }

    #[test]
    fn test_corrupted_iv_fails() {
        let cipher = test_cipher();
        let (ciphertext, _) = cipher.encrypt(b"signature").unwrap();
        assert!(matches!(
            cipher.decrypt(&ciphertext, "not base64!"),
            Err(AppError::Decryption(_))
        ));
        assert!(matches!(
            cipher.decrypt(&ciphertext, "AAAA"),
            Err(AppError::Decryption(_))
        ));
    }

    #[test]
    fn test_key_length_enforced() {
        assert!(matches!(
            FileCipher::from_key_bytes(b"short"),
            Err(AppError::Config(_))
        ));
        let encoded = general_purpose::STANDARD.encode([7u8; 32]);
        assert!(FileCipher::from_base64(&encoded).is_ok());
    }
}
