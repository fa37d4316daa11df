//! Authorization check consulted by every privileged call.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::errors::InvocationError;

// ─── AuthToken ────────────────────────────────────────────────────────────────

/// Opaque bearer credential returned by a successful login.
///
/// Save it with [`AuthToken::as_str`] and pass it back through
/// [`crate::Config::auth_token`] to skip the handshake next time.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

// ─── SessionGuard ─────────────────────────────────────────────────────────────

/// Holds the session token. Fails closed: no token, no call.
#[derive(Default)]
pub(crate) struct SessionGuard {
    token: RwLock<Option<AuthToken>>,
}

impl SessionGuard {
    /// Return the current token, or [`InvocationError::Unauthenticated`].
    ///
    /// Must be called before any network I/O of a privileged operation.
    pub(crate) fn require_authenticated(&self) -> Result<AuthToken, InvocationError> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(InvocationError::Unauthenticated)
    }

    pub(crate) fn authorize(&self, token: AuthToken) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub(crate) fn revoke(&self) -> Option<AuthToken> {
        self.token.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
