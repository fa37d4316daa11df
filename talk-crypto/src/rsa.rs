//! RSA encryption with PKCS#1 v1.5 (type 2) padding, as expected by the
//! login endpoint.

use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;

/// An RSA public key (n, e).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    n: BigUint,
    e: BigUint,
}

/// Errors from RSA key parsing and encryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RsaError {
    /// The modulus or exponent is not valid hex, or is zero.
    InvalidKey { part: &'static str, value: String },
    /// The message does not fit in one block with padding.
    MessageTooLong { len: usize, max: usize },
    /// The system random source failed.
    Random(String),
}

impl fmt::Display for RsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey { part, value } => write!(f, "invalid RSA {part}: {value:?}"),
            Self::MessageTooLong { len, max } =>
                write!(f, "message of {len} bytes exceeds RSA block capacity of {max}"),
            Self::Random(e) => write!(f, "random source failed: {e}"),
        }
    }
}

impl std::error::Error for RsaError {}

impl Key {
    /// Build a key from big-endian integers.
    pub fn new(n: BigUint, e: BigUint) -> Self {
        Self { n, e }
    }

    /// Parse hex-encoded `n` and `e` (no `0x` prefix).
    pub fn from_hex(n: &str, e: &str) -> Result<Self, RsaError> {
        Ok(Self { n: parse_hex("modulus", n)?, e: parse_hex("exponent", e)? })
    }

    pub fn modulus(&self) -> &BigUint { &self.n }

    pub fn exponent(&self) -> &BigUint { &self.e }

    /// Modulus length in bytes (`k` in RFC 8017).
    pub fn size(&self) -> usize {
        ((self.n.bits() + 7) / 8) as usize
    }
}

fn parse_hex(part: &'static str, value: &str) -> Result<BigUint, RsaError> {
    let invalid = || RsaError::InvalidKey { part, value: value.to_string() };
    let v = BigUint::parse_bytes(value.trim().as_bytes(), 16).ok_or_else(invalid)?;
    if v.is_zero() { Err(invalid()) } else { Ok(v) }
}

/// Encrypt `data` under `key` with PKCS#1 v1.5 padding.
pub fn encrypt_pkcs1(data: &[u8], key: &Key) -> Result<Vec<u8>, RsaError> {
    let k = key.size();
    let max = k.saturating_sub(11);
    if data.len() > max {
        return Err(RsaError::MessageTooLong { len: data.len(), max });
    }
    let padding = nonzero_random(k - 3 - data.len())?;
    do_encrypt_pkcs1(data, key, &padding)
}

/// `00 || 02 || padding || 00 || data`, raised to `e` mod `n`, left-padded to `k` bytes.
///
/// `padding` must contain no zero bytes and be exactly `k - 3 - data.len()` long.
pub(crate) fn do_encrypt_pkcs1(data: &[u8], key: &Key, padding: &[u8]) -> Result<Vec<u8>, RsaError> {
    let k = key.size();
    if k < 11 || data.len() > k - 11 {
        return Err(RsaError::MessageTooLong { len: data.len(), max: k.saturating_sub(11) });
    }
    debug_assert_eq!(padding.len(), k - 3 - data.len());
    debug_assert!(padding.iter().all(|&b| b != 0));

    let mut block = Vec::with_capacity(k);
    block.extend_from_slice(&[0x00, 0x02]);
    block.extend_from_slice(padding);
    block.push(0x00);
    block.extend_from_slice(data);

    let encrypted = BigUint::from_bytes_be(&block).modpow(&key.e, &key.n);
    let bytes = encrypted.to_bytes_be();
    let mut out = vec![0u8; k - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

fn nonzero_random(len: usize) -> Result<Vec<u8>, RsaError> {
    let mut out = vec![0u8; len];
    getrandom::getrandom(&mut out).map_err(|e| RsaError::Random(e.to_string()))?;
    let mut byte = [0u8; 1];
    for b in out.iter_mut() {
        while *b == 0 {
            getrandom::getrandom(&mut byte).map_err(|e| RsaError::Random(e.to_string()))?;
            *b = byte[0];
        }
    }
    Ok(out)
}
