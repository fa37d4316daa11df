//! Error types for talk-client.

use std::{fmt, io};

use talk_crypto::CryptoError;
use talk_proto::{CallError, RpcError};

use crate::http::HttpError;

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any `Client` method that talks to the service.
#[derive(Debug)]
pub enum InvocationError {
    /// The service rejected the request.
    Rpc(RpcError),
    /// Network / I/O failure.
    Io(io::Error),
    /// Response decoding failed.
    Deserialize(String),
    /// A privileged call was attempted without an auth token. No request was sent.
    Unauthenticated,
    /// Another login took over this session; sign in again.
    SessionInvalidated,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(e)             => write!(f, "{e}"),
            Self::Io(e)              => write!(f, "I/O error: {e}"),
            Self::Deserialize(s)     => write!(f, "deserialize error: {s}"),
            Self::Unauthenticated    => write!(f, "not logged in"),
            Self::SessionInvalidated => write!(f, "session was taken over by another login"),
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rpc(e) => Some(e),
            Self::Io(e)  => Some(e),
            _            => None,
        }
    }
}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<RpcError> for InvocationError {
    fn from(e: RpcError) -> Self { Self::Rpc(e) }
}

impl From<CallError> for InvocationError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Remote(e)    => Self::Rpc(e),
            CallError::Transport(e) => Self::Io(e),
            CallError::Decode(s)    => Self::Deserialize(s),
        }
    }
}

impl InvocationError {
    /// The remote fault code, if this is a remote fault.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Rpc(e) => Some(e.code),
            _            => None,
        }
    }

    /// `true` if the session cannot be used again without a new login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionInvalidated)
    }
}

// ─── RejectReason ─────────────────────────────────────────────────────────────

/// Why the server refused to finish a login. Not retryable without the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Re-authenticate by scanning a QR code.
    QrRequired,
    /// Confirm this device from an already logged-in one.
    DeviceConfirmRequired,
    /// A handshake response was missing or had a malformed field.
    Malformed(String),
}

impl RejectReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::QrRequired            => "qr_required",
            Self::DeviceConfirmRequired => "device_confirm_required",
            Self::Malformed(_)          => "malformed_response",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "malformed_response ({detail})"),
            other                   => f.write_str(other.as_str()),
        }
    }
}

impl From<talk_proto::login::Error> for RejectReason {
    fn from(e: talk_proto::login::Error) -> Self {
        use talk_proto::login::Error;
        match e {
            Error::QrRequired                   => Self::QrRequired,
            Error::DeviceConfirmRequired { .. } => Self::DeviceConfirmRequired,
            other                               => Self::Malformed(other.to_string()),
        }
    }
}

// ─── LoginError ───────────────────────────────────────────────────────────────

/// Errors returned by the login methods of [`crate::Client`].
#[derive(Debug)]
pub enum LoginError {
    /// Neither an auth token nor a full credential pair was configured.
    MissingCredentials,
    /// A handshake was started on a session that already holds a token.
    AlreadyAuthorized,
    /// The credentials could not be sealed (e.g. a field longer than 255 bytes).
    Crypto(CryptoError),
    /// The server ended the handshake; see [`RejectReason`].
    Rejected(RejectReason),
    /// An HTTP step failed.
    Http { step: &'static str, error: HttpError },
    /// A remote call failed.
    Invocation { step: &'static str, error: InvocationError },
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials       => write!(f, "an auth token or an identifier and secret is required"),
            Self::AlreadyAuthorized        => write!(f, "already logged in"),
            Self::Crypto(e)                => write!(f, "sealing credentials: {e}"),
            Self::Rejected(r)              => write!(f, "login rejected: {r}"),
            Self::Http { step, error }     => write!(f, "{step}: {error}"),
            Self::Invocation { step, error } => write!(f, "{step}: {error}"),
        }
    }
}

impl std::error::Error for LoginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Crypto(e)                  => Some(e),
            Self::Http { error, .. }         => Some(error),
            Self::Invocation { error, .. }   => Some(error),
            _                                => None,
        }
    }
}

impl LoginError {
    /// The rejection reason, if the server ended the handshake.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(r) => Some(r),
            _                 => None,
        }
    }
}

impl From<talk_proto::login::Error> for LoginError {
    fn from(e: talk_proto::login::Error) -> Self {
        match e {
            talk_proto::login::Error::Crypto(c) => Self::Crypto(c),
            other                               => Self::Rejected(other.into()),
        }
    }
}
