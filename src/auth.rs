//! Credential loading and request signing for the streaming handshake.
//!
//! The exchange authenticates each connection with three headers: a key id,
//! an RSA-PSS (SHA-256) signature over a canonical string, and the timestamp
//! that string was built from. Key material is loaded once at startup from a
//! PEM file and never logged.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::domain::micros_now;
use crate::error::{Error, Result};

/// Headers attached to the streaming handshake request.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub key_id: String,
    pub signature: String,
    pub timestamp_ms: String,
}

/// Holds the exchange key id and the loaded private key, producing fresh
/// signed headers for each connection attempt.
pub struct Signer {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl Signer {
    /// Loads a PKCS#1 or PKCS#8 PEM-encoded RSA private key from disk.
    pub fn load(key_id: String, private_key_path: &str) -> Result<Self> {
        let pem = std::fs::read_to_string(private_key_path)?;
        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| Error::Auth(format!("failed to parse private key: {e}")))?;
        Ok(Self {
            key_id,
            signing_key: SigningKey::<Sha256>::new(private_key),
        })
    }

    /// Signs `{timestamp_ms}{method}{path}` and returns the three headers the
    /// handshake attaches.
    #[must_use]
    pub fn sign(&self, method: &str, path: &str) -> AuthHeaders {
        let timestamp_ms = micros_now() / 1000;
        let timestamp_ms = timestamp_ms.to_string();
        let message = format!("{timestamp_ms}{method}{path}");

        let mut rng = rand::thread_rng();
        let signature = self.signing_key.sign_with_rng(&mut rng, message.as_bytes());
        let signature = BASE64.encode(signature.to_bytes());

        AuthHeaders {
            key_id: self.key_id.clone(),
            signature,
            timestamp_ms,
        }
    }
}

// Re-exported here so `Signer::load` can try both PEM flavors without a
// second `use` block at the call site.
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePrivateKey;

    fn write_test_key() -> tempfile::NamedTempFile {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate test key");
        let pem = key
            .to_pkcs8_pem(Default::default())
            .expect("encode test key")
            .to_string();
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(file.path(), pem).expect("write test key");
        file
    }

    #[test]
    fn signs_with_three_headers() {
        let file = write_test_key();
        let signer = Signer::load("key-1".into(), file.path().to_str().unwrap()).unwrap();
        let headers = signer.sign("GET", "/trade-api/ws/v2");
        assert_eq!(headers.key_id, "key-1");
        assert!(!headers.signature.is_empty());
        assert!(headers.timestamp_ms.parse::<i64>().is_ok());
    }

    #[test]
    fn missing_key_file_is_an_auth_error() {
        let result = Signer::load("key-1".into(), "/nonexistent/path.pem");
        assert!(result.is_err());
    }
}
