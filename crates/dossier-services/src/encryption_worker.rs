//! Offloads AES work to the blocking pool.
//!
//! Each call moves its input into one `spawn_blocking` unit and awaits the
//! result; nothing is shared with the unit except the cipher. A semaphore
//! bounds how many units run at once.

use std::sync::Arc;

use bytes::Bytes;
use dossier_core::{AppError, FileCipher};
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct EncryptionWorker {
    cipher: Arc<FileCipher>,
    permits: Arc<Semaphore>,
}

impl EncryptionWorker {
    pub fn new(cipher: FileCipher, max_concurrency: usize) -> Self {
        Self {
            cipher: Arc::new(cipher),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Encrypt with a fresh IV. Returns the ciphertext and the base64 IV.
    pub async fn encrypt(&self, plaintext: Bytes) -> Result<(Vec<u8>, String), AppError> {
        self.dispatch(move |cipher| cipher.encrypt(&plaintext)).await
    }

    pub async fn decrypt(&self, ciphertext: Bytes, iv: String) -> Result<Vec<u8>, AppError> {
        self.dispatch(move |cipher| cipher.decrypt(&ciphertext, &iv))
            .await
    }

    async fn dispatch<T, F>(&self, job: F) -> Result<T, AppError>
    where
        F: FnOnce(&FileCipher) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Encryption worker is shut down".to_string()))?;
        let cipher = self.cipher.clone();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&cipher)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Encryption unit did not complete");
            AppError::Internal(format!("Encryption unit failed: {}", e))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> EncryptionWorker {
        EncryptionWorker::new(FileCipher::from_key_bytes(&[7u8; 32]).unwrap(), 2)
    }

    #[tokio::test]
    async fn round_trip() {
        let worker = worker();
        let plaintext = Bytes::from_static(b"%PDF-1.7 medical certificate");

        let (ciphertext, iv) = worker.encrypt(plaintext.clone()).await.unwrap();
        assert!(!iv.is_empty());
        assert_ne!(ciphertext, plaintext.to_vec());

        let decrypted = worker.decrypt(Bytes::from(ciphertext), iv).await.unwrap();
        assert_eq!(decrypted, plaintext.to_vec());
    }

    #[tokio::test]
    async fn fresh_iv_per_call() {
        let worker = worker();
        let (_, first) = worker.encrypt(Bytes::from_static(b"same")).await.unwrap();
        let (_, second) = worker.encrypt(Bytes::from_static(b"same")).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn wrong_key_is_a_decryption_error() {
        let (ciphertext, iv) = worker().encrypt(Bytes::from_static(b"secret")).await.unwrap();
        let other = EncryptionWorker::new(FileCipher::from_key_bytes(&[9u8; 32]).unwrap(), 1);

        let err = other.decrypt(Bytes::from(ciphertext), iv).await.unwrap_err();
        assert!(matches!(err, AppError::Decryption(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn panicking_unit_surfaces_as_internal_error() {
        let result: Result<(), AppError> = worker()
            .dispatch(|_| panic!("unit crashed"))
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn many_calls_run_concurrently() {
        let worker = worker();
        let calls = (0..16).map(|i| {
            let worker = worker.clone();
            tokio::spawn(async move { worker.encrypt(Bytes::from(vec![i as u8; 64])).await })
        });
        for handle in calls {
            assert!(handle.await.unwrap().is_ok());
        }
    }
}
