//! Signing key material for token issuance and verification.
//!
//! The key is decoded once at startup from a base64 secret and then handed
//! to the token codec by value. It never changes for the life of the process.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Minimum decoded key length in bytes (HS512 block size is 128, its output 64).
pub const MIN_KEY_LENGTH: usize = 32;

/// Immutable HMAC key bytes.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Decode the configured base64 secret.
    pub fn from_base64(secret: &str) -> Result<Self, KeyInitError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(KeyInitError::Missing);
        }

        let bytes = STANDARD
            .decode(secret)
            .map_err(KeyInitError::InvalidBase64)?;

        if bytes.len() < MIN_KEY_LENGTH {
            return Err(KeyInitError::TooShort(bytes.len()));
        }

        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Failure to build the signing key. Always fatal at startup.
#[derive(Debug)]
pub enum KeyInitError {
    /// No secret was configured
    Missing,
    /// The secret is not valid base64
    InvalidBase64(base64::DecodeError),
    /// The decoded secret is shorter than [`MIN_KEY_LENGTH`]
    TooShort(usize),
}

impl std::fmt::Display for KeyInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyInitError::Missing => write!(f, "Signing secret is missing"),
            KeyInitError::InvalidBase64(e) => write!(f, "Signing secret is not valid base64: {}", e),
            KeyInitError::TooShort(len) => write!(
                f,
                "Signing secret decodes to {} bytes, at least {} required",
                len, MIN_KEY_LENGTH
            ),
        }
    }
}

impl std::error::Error for KeyInitError {}

/// Generate a random secret suitable for `JWT_SECRET`, base64 encoded.
pub fn generate_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 64];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
