//! Sans-IO certificate login.
//!
//! # Flow
//!
//! ```text
//! let (provider, s1) = login::step1(credentials);
//! // GET the session-key endpoint for `provider` → json
//! let (request, s2) = login::step2(s1, &json, &device, &sealer)?;
//! // loginWithIdentityCredentialForCertificate(request) → result
//! let (challenge, s3) = login::step3(s2, result)?;
//! // show challenge.pin_code, then GET the certificate endpoint with
//! // challenge.verifier as the access header → json
//! let (verifier, s4) = login::step4(s3, &json)?;
//! // loginWithVerifierForCertificate(verifier) → result
//! let done = login::finish(s4, result)?;
//! ```
//!
//! Each step consumes the previous step's state, so a handshake cannot be
//! resumed out of order.

use std::fmt;

use serde_json::Value;
use talk_crypto::{CryptoError, Key};

use crate::types::{IdentityLogin, LoginResult, Provider};

// ─── Error ────────────────────────────────────────────────────────────────────

/// Terminal handshake failures that do not come from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A response lacked a required field.
    MissingField { field: &'static str },
    /// `rsa_key` was not a `name,modulus,exponent` triple of hex values.
    InvalidRsaKey { value: String },
    /// Sealing the credential envelope failed.
    Crypto(CryptoError),
    /// The server wants the user to re-authenticate by QR code.
    QrRequired,
    /// The server wants the device to be confirmed first.
    DeviceConfirmRequired { result_type: i32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "response is missing `{field}`"),
            Self::InvalidRsaKey { value } => write!(f, "malformed rsa_key {value:?}"),
            Self::Crypto(e) => write!(f, "sealing credentials failed: {e}"),
            Self::QrRequired => write!(f, "QR code re-authentication required"),
            Self::DeviceConfirmRequired { result_type } =>
                write!(f, "device confirmation required (result type {result_type})"),
        }
    }
}

impl std::error::Error for Error {}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self { Self::Crypto(e) }
}

// ─── Inputs ───────────────────────────────────────────────────────────────────

/// Account identifier (email or account id) and its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret:     String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), secret: secret.into() }
    }

    pub fn identifier(&self) -> &str { &self.identifier }

    pub(crate) fn secret(&self) -> &str { &self.secret }

    /// `true` if both the identifier and the secret are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Device descriptor sent with the credential login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub ip:   String,
    pub name: String,
}

/// Encrypts the credential envelope.
///
/// [`Pkcs1Sealer`] is what the service expects; the trait exists so callers can
/// observe or replace the sealing step.
pub trait Sealer: Send + Sync {
    fn seal(&self, session_key: &str, id: &str, secret: &str, key: &Key) -> Result<String, CryptoError>;
}

/// Seals with [`talk_crypto::seal`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Pkcs1Sealer;

impl Sealer for Pkcs1Sealer {
    fn seal(&self, session_key: &str, id: &str, secret: &str, key: &Key) -> Result<String, CryptoError> {
        talk_crypto::seal(session_key, id, secret, key)
    }
}

// ─── Step state ──────────────────────────────────────────────────────────────

/// State after step 1: session keys requested.
pub struct Step1 {
    credentials: Credentials,
    provider:    Provider,
}

/// State after step 2: envelope submitted.
pub struct Step2 {
    provider: Provider,
}

/// State after step 3: waiting for the user to enter the PIN.
pub struct Step3 {
    verifier: String,
}

/// State after step 4: confirmed verifier submitted.
pub struct Step4 {
    verifier: String,
}

/// PIN challenge shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub pin_code: String,
    /// Temporary access value for the confirmation request.
    pub verifier: String,
}

/// Session keys served before the credential login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    pub session_key: String,
    pub key_name:    String,
    pub key:         Key,
}

/// The final output of a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct Finished {
    pub auth_token:  String,
    pub certificate: Option<String>,
}

impl fmt::Debug for Finished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finished")
            .field("auth_token", &"<redacted>")
            .field("certificate", &self.certificate.is_some())
            .finish()
    }
}

// ─── Step 1: pick the session-key provider ───────────────────────────────────

/// Choose the identity provider for `credentials`.
pub fn step1(credentials: Credentials) -> (Provider, Step1) {
    let provider = provider_for(credentials.identifier());
    log::debug!("[talk] login step1: provider {provider:?}");
    (provider, Step1 { credentials, provider })
}

/// Email-shaped identifiers belong to [`Provider::Line`], anything else to
/// [`Provider::NaverKr`].
pub fn provider_for(identifier: &str) -> Provider {
    if looks_like_email(identifier) { Provider::Line } else { Provider::NaverKr }
}

// `[^@]+@[^@]+\.[^@]+` anchored at the start only.
fn looks_like_email(s: &str) -> bool {
    let Some((local, rest)) = s.split_once('@') else { return false };
    if local.is_empty() {
        return false;
    }
    let domain = rest.split('@').next().unwrap_or("");
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

// ─── Step 2: seal credentials ────────────────────────────────────────────────

/// Parse the `session_key` / `rsa_key` response.
pub fn parse_session_keys(json: &Value) -> Result<SessionKeys, Error> {
    let session_key = str_field(json, "session_key")?;
    let rsa_key = str_field(json, "rsa_key")?;

    let invalid = || Error::InvalidRsaKey { value: rsa_key.to_string() };
    let mut parts = rsa_key.split(',');
    let (Some(name), Some(n), Some(e), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let key = Key::from_hex(n, e).map_err(|_| invalid())?;

    Ok(SessionKeys { session_key: session_key.to_string(), key_name: name.to_string(), key })
}

/// Seal the credentials and build the identity login request.
pub fn step2(
    data:     Step1,
    response: &Value,
    device:   &Device,
    sealer:   &dyn Sealer,
) -> Result<(IdentityLogin, Step2), Error> {
    let Step1 { credentials, provider } = data;
    let keys = parse_session_keys(response)?;

    let credential = sealer.seal(&keys.session_key, credentials.identifier(), credentials.secret(), &keys.key)?;
    log::debug!("[talk] login step2: sealed credentials with key {:?}", keys.key_name);

    let request = IdentityLogin {
        identifier:  credentials.identifier().to_string(),
        password:    credentials.secret().to_string(),
        key_name:    keys.key_name,
        credential,
        // always false on the wire, whatever platform the headers announce
        is_mac:      false,
        ip:          device.ip.clone(),
        device_name: device.name.clone(),
        provider,
        extra:       String::new(),
    };
    Ok((request, Step2 { provider }))
}

// ─── Step 3: PIN challenge ───────────────────────────────────────────────────

/// Extract the PIN challenge from the identity login response.
pub fn step3(data: Step2, response: LoginResult) -> Result<(Challenge, Step3), Error> {
    let Step2 { provider } = data;
    let verifier = response.verifier.filter(|v| !v.is_empty())
        .ok_or(Error::MissingField { field: "verifier" })?;
    let pin_code = response.pin_code.filter(|p| !p.is_empty())
        .ok_or(Error::MissingField { field: "pinCode" })?;
    log::debug!("[talk] login step3: PIN issued ({provider:?})");
    Ok((Challenge { pin_code, verifier: verifier.clone() }, Step3 { verifier }))
}

impl Step3 {
    /// The verifier to send as access header while waiting for confirmation.
    pub fn verifier(&self) -> &str { &self.verifier }
}

// ─── Step 4: confirmed verifier ──────────────────────────────────────────────

/// Extract `result.verifier` from the certificate confirmation response.
pub fn step4(data: Step3, response: &Value) -> Result<(String, Step4), Error> {
    let Step3 { verifier: pending } = data;
    let verifier = response
        .get("result")
        .and_then(|r| r.get("verifier"))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingField { field: "result.verifier" })?
        .to_string();
    log::debug!("[talk] login step4: confirmation received ({} → {} chars)", pending.len(), verifier.len());
    Ok((verifier.clone(), Step4 { verifier }))
}

// ─── finish ──────────────────────────────────────────────────────────────────

/// Classify the verifier login response.
pub fn finish(data: Step4, response: LoginResult) -> Result<Finished, Error> {
    let Step4 { verifier } = data;
    log::debug!("[talk] login finish: result type {} for verifier of {} chars",
        response.result_type, verifier.len());
    match response.result_type {
        1 => {
            let auth_token = response.auth_token.filter(|t| !t.is_empty())
                .ok_or(Error::MissingField { field: "authToken" })?;
            Ok(Finished { auth_token, certificate: response.certificate })
        }
        2 => Err(Error::QrRequired),
        other => Err(Error::DeviceConfirmRequired { result_type: other }),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn str_field<'a>(json: &'a Value, field: &'static str) -> Result<&'a str, Error> {
    json.get(field)
        .and_then(Value::as_str)
        .ok_or(Error::MissingField { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_shape_selects_provider() {
        assert_eq!(provider_for("a@b.com"), Provider::Line);
        assert_eq!(provider_for("someone@mail.example.org"), Provider::Line);
        assert_eq!(provider_for("a@b.c@trailing"), Provider::Line);
        assert_eq!(provider_for("carpedm20"), Provider::NaverKr);
        assert_eq!(provider_for("@b.com"), Provider::NaverKr);
        assert_eq!(provider_for("a@.com"), Provider::NaverKr);
        assert_eq!(provider_for("a@bcom"), Provider::NaverKr);
        assert_eq!(provider_for("a@b."), Provider::NaverKr);
    }

    #[test]
    fn session_keys_parse() {
        let keys = parse_session_keys(&json!({"session_key": "SK", "rsa_key": "k,abcd,10001"})).unwrap();
        assert_eq!(keys.session_key, "SK");
        assert_eq!(keys.key_name, "k");
        assert_eq!(keys.key, Key::from_hex("abcd", "10001").unwrap());
    }

    #[test]
    fn session_keys_malformed() {
        assert_eq!(
            parse_session_keys(&json!({"rsa_key": "k,abcd,10001"})),
            Err(Error::MissingField { field: "session_key" }),
        );
        assert!(matches!(
            parse_session_keys(&json!({"session_key": "SK", "rsa_key": "k,abcd"})),
            Err(Error::InvalidRsaKey { .. }),
        ));
        assert!(matches!(
            parse_session_keys(&json!({"session_key": "SK", "rsa_key": "k,zz,10001"})),
            Err(Error::InvalidRsaKey { .. }),
        ));
        assert!(matches!(
            parse_session_keys(&json!({"session_key": "SK", "rsa_key": "k,ab,1,extra"})),
            Err(Error::InvalidRsaKey { .. }),
        ));
    }

    #[test]
    fn finish_classifies_result_type() {
        let ok = LoginResult { result_type: 1, auth_token: Some("TOK".into()), ..Default::default() };
        let s4 = || Step4 { verifier: "V2".into() };
        assert_eq!(finish(s4(), ok).unwrap().auth_token, "TOK");
        let qr = LoginResult { result_type: 2, ..Default::default() };
        assert_eq!(finish(s4(), qr), Err(Error::QrRequired));
        let dev = LoginResult { result_type: 3, ..Default::default() };
        assert_eq!(finish(s4(), dev), Err(Error::DeviceConfirmRequired { result_type: 3 }));
        let empty = LoginResult { result_type: 1, ..Default::default() };
        assert_eq!(finish(s4(), empty), Err(Error::MissingField { field: "authToken" }));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let c = Credentials::new("a@b.com", "pw-secret");
        assert!(!format!("{c:?}").contains("pw-secret"));
    }
}
