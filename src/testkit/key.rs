//! Throwaway RSA key generation for tests exercising `Signer`.

use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;

/// Generates a fresh 2048-bit key, writes it PEM-encoded to a temp file, and
/// returns the file (kept alive by the caller) alongside its path.
pub fn generate_pem() -> tempfile::NamedTempFile {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate test key");
    let pem = key.to_pkcs8_pem(Default::default()).expect("encode test key").to_string();
    let file = tempfile::NamedTempFile::new().expect("tempfile");
    std::fs::write(file.path(), pem).expect("write test key");
    file
}
