//! Length-prefixed credential envelope.
//!
//! The plaintext sealed during login is
//!
//! ```text
//! len(session_key) || session_key || len(id) || id || len(secret) || secret
//! ```
//!
//! where every length is a single byte.

use std::fmt;

/// Largest field a one-byte length prefix can describe.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Which envelope field overflowed its length prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    SessionKey,
    Identifier,
    Secret,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionKey => f.write_str("session key"),
            Self::Identifier => f.write_str("identifier"),
            Self::Secret     => f.write_str("secret"),
        }
    }
}

/// Errors from [`build`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A field is longer than [`MAX_FIELD_LEN`] bytes.
    FieldTooLong { field: Field, len: usize },
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldTooLong { field, len } =>
                write!(f, "{field} is {len} bytes, limit is {MAX_FIELD_LEN}"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Build the envelope plaintext. Fields longer than 255 bytes are rejected,
/// never truncated.
pub fn build(session_key: &[u8], id: &[u8], secret: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let fields = [
        (Field::SessionKey, session_key),
        (Field::Identifier, id),
        (Field::Secret,     secret),
    ];

    let mut out = Vec::with_capacity(3 + session_key.len() + id.len() + secret.len());
    for (field, bytes) in fields {
        let len = u8::try_from(bytes.len())
            .map_err(|_| EnvelopeError::FieldTooLong { field, len: bytes.len() })?;
        out.push(len);
        out.extend_from_slice(bytes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_length_prefixed() {
        let env = build(b"SK", b"a@b.com", b"pw").unwrap();
        assert_eq!(env.len(), 3 + 2 + 7 + 2);
        assert_eq!(env[0], 2);
        assert_eq!(&env[1..3], b"SK");
        assert_eq!(env[3], 7);
        assert_eq!(&env[4..11], b"a@b.com");
        assert_eq!(env[11], 2);
        assert_eq!(&env[12..], b"pw");
    }

    #[test]
    fn length_formula_holds_up_to_the_limit() {
        for (a, b, c) in [(0, 0, 0), (1, 200, 17), (255, 255, 255), (32, 0, 255)] {
            let env = build(&vec![1; a], &vec![2; b], &vec![3; c]).unwrap();
            assert_eq!(env.len(), 3 + a + b + c);
            assert_eq!(env[0] as usize, a);
        }
    }

    #[test]
    fn oversized_field_is_rejected() {
        let long = vec![b'x'; 256];
        assert_eq!(
            build(b"SK", &long, b"pw"),
            Err(EnvelopeError::FieldTooLong { field: Field::Identifier, len: 256 }),
        );
        assert!(matches!(
            build(&long, b"id", b"pw"),
            Err(EnvelopeError::FieldTooLong { field: Field::SessionKey, .. }),
        ));
        assert!(matches!(
            build(b"SK", b"id", &long),
            Err(EnvelopeError::FieldTooLong { field: Field::Secret, .. }),
        ));
    }
}
