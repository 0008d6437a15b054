use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Domain separation salt for the ruleset key derivation. Fixed by design:
/// the sealed file must stay decryptable with nothing but the passphrase.
const SALT: &[u8] = b"spendscan.rules.v1";
const PBKDF2_ROUNDS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum SealedBoxError {
    #[error("sealed payload is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("sealed payload field is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported sealed payload version {0}")]
    Version(u32),
    #[error("decryption failed (wrong passphrase or corrupt data)")]
    Decrypt,
}

/// On-disk shape of a sealed document.
#[derive(Debug, Serialize, Deserialize)]
struct SealedPayload {
    v: u32,
    nonce: String,
    data: String,
}

/// Passphrase-based authenticated encryption for the ruleset file.
///
/// Key derivation is PBKDF2-HMAC-SHA256 over a fixed salt, 100k rounds,
/// 256-bit key; each save uses a fresh random 96-bit nonce under
/// AES-256-GCM.
pub struct SealedBox {
    cipher: Aes256Gcm,
}

impl SealedBox {
    pub fn new(passphrase: &str) -> Self {
        let mut key_bytes = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), SALT, PBKDF2_ROUNDS, &mut key_bytes);
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt `plaintext` into the JSON envelope written to disk.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, SealedBoxError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| SealedBoxError::Decrypt)?;
        let payload = SealedPayload {
            v: 1,
            nonce: STANDARD.encode(nonce),
            data: STANDARD.encode(ciphertext),
        };
        Ok(serde_json::to_string_pretty(&payload)?)
    }

    /// Decrypt a JSON envelope produced by [`seal`](Self::seal).
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, SealedBoxError> {
        let payload: SealedPayload = serde_json::from_str(sealed)?;
        if payload.v != 1 {
            return Err(SealedBoxError::Version(payload.v));
        }
        let nonce_bytes = STANDARD.decode(&payload.nonce)?;
        if nonce_bytes.len() != 12 {
            return Err(SealedBoxError::Decrypt);
        }
        let ciphertext = STANDARD.decode(&payload.data)?;
        let nonce = Nonce::from_slice(&nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| SealedBoxError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let sealed_box = SealedBox::new("hunter2");
        let sealed = sealed_box.seal(b"{\"cards\":[]}").unwrap();
        assert_eq!(sealed_box.open(&sealed).unwrap(), b"{\"cards\":[]}");
    }

    #[test]
    fn each_save_uses_a_fresh_nonce() {
        let sealed_box = SealedBox::new("hunter2");
        let a = sealed_box.seal(b"data").unwrap();
        let b = sealed_box.seal(b"data").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_passphrase_is_a_decrypt_error() {
        let sealed = SealedBox::new("right").seal(b"data").unwrap();
        let err = SealedBox::new("wrong").open(&sealed).unwrap_err();
        assert!(matches!(err, SealedBoxError::Decrypt));
    }

    #[test]
    fn garbage_envelope_is_an_encoding_error() {
        let err = SealedBox::new("p").open("not json").unwrap_err();
        assert!(matches!(err, SealedBoxError::Encoding(_)));
    }
}
