//! Certificate login driven over the RPC service and the HTTP helper.
//!
//! The protocol work lives in [`talk_proto::login`]; this module adds the I/O,
//! tracks [`HandshakeState`] and brings the session up once a token is known.

use std::fmt;
use std::sync::PoisonError;

use talk_proto::login::{self, Credentials, Step3};
use talk_proto::types::Provider;

use crate::errors::{LoginError, RejectReason};
use crate::guard::AuthToken;
use crate::poll::RevisionState;
use crate::{Client, InvocationError};

// ─── HandshakeState ───────────────────────────────────────────────────────────

/// Where the session is in the login handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    Unauthenticated,
    /// Session key and RSA key requested.
    KeyRequested,
    /// Sealed credentials sent.
    EnvelopeSubmitted,
    /// PIN shown; waiting for the user to confirm it on a logged-in device.
    AwaitingPinConfirmation,
    /// Confirmed verifier sent.
    VerifierSubmitted,
    Authenticated,
    /// The server ended the handshake.
    Rejected(RejectReason),
}

// ─── PendingVerification ──────────────────────────────────────────────────────

/// Returned by [`Client::request_pin`]; pass it to [`Client::confirm_pin`].
///
/// The server forgets the PIN after about two minutes.
pub struct PendingVerification {
    pin_code: String,
    state:    Step3,
}

impl PendingVerification {
    /// The PIN to enter on a device where the account is already logged in.
    pub fn pin_code(&self) -> &str { &self.pin_code }
}

impl fmt::Debug for PendingVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingVerification")
            .field("pin_code", &self.pin_code)
            .finish_non_exhaustive()
    }
}

// ─── Client methods ───────────────────────────────────────────────────────────

impl Client {
    /// Current handshake state.
    pub fn handshake_state(&self) -> HandshakeState {
        self.inner.handshake.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The auth token, once logged in. Store it to skip the handshake next time.
    pub fn auth_token(&self) -> Option<AuthToken> {
        self.inner.guard.require_authenticated().ok()
    }

    /// `true` if privileged calls can be made.
    pub fn is_authorized(&self) -> bool {
        self.inner.guard.is_authenticated()
    }

    fn set_state(&self, state: HandshakeState) {
        tracing::trace!("[talk] handshake → {state:?}");
        *self.inner.handshake.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Record a failed handshake step and pass the error through.
    fn handshake_failed(&self, e: LoginError) -> LoginError {
        match &e {
            LoginError::Rejected(reason) => self.set_state(HandshakeState::Rejected(reason.clone())),
            _                            => self.set_state(HandshakeState::Unauthenticated),
        }
        tracing::warn!("[talk] login failed: {e}");
        e
    }

    /// Drop the token after the service reported the session superseded.
    pub(crate) fn invalidate_session(&self) {
        self.inner.guard.revoke();
        self.set_access(None);
        self.set_state(HandshakeState::Unauthenticated);
    }

    // ── Sign in ────────────────────────────────────────────────────────────

    /// Run the handshake up to the PIN challenge.
    ///
    /// Show [`PendingVerification::pin_code`] to the user, then call
    /// [`Client::confirm_pin`] before the server forgets it. Fails with
    /// [`LoginError::AlreadyAuthorized`] on a session that holds a token.
    pub async fn request_pin(&self, credentials: &Credentials) -> Result<PendingVerification, LoginError> {
        let _handshake = self.inner.handshake_lock.lock().await;
        self.begin_handshake(credentials).await
    }

    async fn begin_handshake(&self, credentials: &Credentials) -> Result<PendingVerification, LoginError> {
        if self.is_authorized() {
            return Err(LoginError::AlreadyAuthorized);
        }
        self.request_pin_locked(credentials).await.map_err(|e| self.handshake_failed(e))
    }

    async fn request_pin_locked(&self, credentials: &Credentials) -> Result<PendingVerification, LoginError> {
        if !credentials.is_complete() {
            return Err(LoginError::MissingCredentials);
        }

        let (provider, s1) = login::step1(credentials.clone());
        let url = match provider {
            Provider::Line => &self.inner.settings.session_line_url,
            _              => &self.inner.settings.session_naver_url,
        };
        self.set_state(HandshakeState::KeyRequested);
        let headers = self.set_access(None);
        let keys = self.inner.http.get_json(url, &headers).await
            .map_err(|error| LoginError::Http { step: "session key", error })?;

        let (request, s2) = login::step2(s1, &keys, &self.inner.settings.device, self.inner.sealer.as_ref())?;
        self.set_state(HandshakeState::EnvelopeSubmitted);
        let result = self.inner.service
            .login_with_identity_credential_for_certificate(&request)
            .await
            .map_err(|e| LoginError::Invocation {
                step:  "loginWithIdentityCredentialForCertificate",
                error: e.into(),
            })?;

        let (challenge, s3) = login::step3(s2, result)?;
        self.set_state(HandshakeState::AwaitingPinConfirmation);
        tracing::info!("[talk] PIN issued, waiting for confirmation");
        Ok(PendingVerification { pin_code: challenge.pin_code, state: s3 })
    }

    /// Wait for the user to confirm the PIN, finish the handshake and load the
    /// session (revision watermark, contacts, groups).
    pub async fn confirm_pin(&self, pending: PendingVerification) -> Result<AuthToken, LoginError> {
        let _handshake = self.inner.handshake_lock.lock().await;
        self.complete_handshake(pending).await
    }

    async fn complete_handshake(&self, pending: PendingVerification) -> Result<AuthToken, LoginError> {
        let token = self.confirm_pin_locked(pending).await.map_err(|e| self.handshake_failed(e))?;
        self.ready().await?;
        Ok(token)
    }

    async fn confirm_pin_locked(&self, pending: PendingVerification) -> Result<AuthToken, LoginError> {
        let PendingVerification { state: s3, .. } = pending;

        // the verifier is the access value until the certificate is issued
        let headers = self.set_access(Some(s3.verifier()));
        let confirmation = self.inner.http.get_json(&self.inner.settings.certificate_url, &headers).await
            .map_err(|error| LoginError::Http { step: "certificate", error })?;

        let (verifier, s4) = login::step4(s3, &confirmation)?;
        self.set_state(HandshakeState::VerifierSubmitted);
        let result = self.inner.service
            .login_with_verifier_for_certificate(&verifier)
            .await
            .map_err(|e| LoginError::Invocation { step: "loginWithVerifierForCertificate", error: e.into() })?;

        let done = login::finish(s4, result)?;
        if done.certificate.is_some() {
            *self.inner.certificate.lock().unwrap_or_else(PoisonError::into_inner) = done.certificate;
        }
        let token = AuthToken::new(done.auth_token);
        self.authorize(token.clone());
        tracing::info!("[talk] signed in");
        Ok(token)
    }

    /// Run the whole handshake. `on_pin` receives the PIN to show to the user.
    ///
    /// No other handshake can start until this one ends.
    pub async fn login(
        &self,
        credentials: &Credentials,
        on_pin:      impl FnOnce(&str),
    ) -> Result<AuthToken, LoginError> {
        let _handshake = self.inner.handshake_lock.lock().await;
        let pending = self.begin_handshake(credentials).await?;
        on_pin(pending.pin_code());
        self.complete_handshake(pending).await
    }

    /// The certificate issued by the last completed handshake.
    pub fn certificate(&self) -> Option<String> {
        self.inner.certificate.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resume a session from a previously issued token. No handshake is run.
    pub async fn sign_in_with_token(&self, token: AuthToken) -> Result<(), LoginError> {
        let _handshake = self.inner.handshake_lock.lock().await;
        self.authorize(token);
        tracing::info!("[talk] signed in with saved token");
        self.ready().await
    }

    fn authorize(&self, token: AuthToken) {
        self.set_access(Some(token.as_str()));
        self.inner.guard.authorize(token);
        self.set_state(HandshakeState::Authenticated);
    }

    /// Fetch the revision watermark and the contact and group snapshots.
    async fn ready(&self) -> Result<(), LoginError> {
        let sync = |error: InvocationError| LoginError::Invocation { step: "session sync", error };

        let service = self.authorized().map_err(sync)?;
        let revision = service.get_last_op_revision().await.map_err(|e| sync(e.into()))?;
        *self.inner.revision.lock().unwrap_or_else(PoisonError::into_inner) = RevisionState::new(revision);
        tracing::debug!("[talk] starting at revision {revision}");

        self.refresh_contacts().await.map_err(sync)?;
        self.refresh_groups().await.map_err(sync)?;
        Ok(())
    }

    /// The same access value goes to the RPC channel and to later HTTP fetches.
    fn set_access(&self, access: Option<&str>) -> talk_proto::ChannelHeaders {
        let identity = &self.inner.settings.identity;
        let headers = match access {
            Some(a) => identity.with_access(a),
            None    => identity.clone(),
        };
        self.inner.service.set_headers(&headers);
        headers
    }
}

