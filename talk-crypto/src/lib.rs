//! Cryptographic primitives for the talk login handshake.
//!
//! Provides:
//! - the length-prefixed credential [`envelope`]
//! - RSA encryption with PKCS#1 v1.5 padding ([`rsa`])
//! - [`seal`], which combines both and hex-encodes the result for transport

#![deny(unsafe_code)]

pub mod envelope;
pub mod rsa;

pub use envelope::{EnvelopeError, Field, MAX_FIELD_LEN};
pub use rsa::{Key, RsaError};

use std::fmt;

/// Errors from [`seal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CryptoError {
    Envelope(EnvelopeError),
    Rsa(RsaError),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope(e) => write!(f, "envelope: {e}"),
            Self::Rsa(e)      => write!(f, "rsa: {e}"),
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<EnvelopeError> for CryptoError {
    fn from(e: EnvelopeError) -> Self { Self::Envelope(e) }
}

impl From<RsaError> for CryptoError {
    fn from(e: RsaError) -> Self { Self::Rsa(e) }
}

/// Build the credential envelope and encrypt it under `key`.
///
/// Returns the ciphertext as lowercase hex.
pub fn seal(session_key: &str, id: &str, secret: &str, key: &Key) -> Result<String, CryptoError> {
    let plain = envelope::build(session_key.as_bytes(), id.as_bytes(), secret.as_bytes())?;
    let cipher = rsa::encrypt_pkcs1(&plain, key)?;
    Ok(hex::encode(cipher))
}
