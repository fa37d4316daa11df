//! Pluggable RPC layer.
//!
//! Implement [`TalkService`] over whatever binary RPC transport reaches the
//! service. The client only relies on call/response semantics and on remote
//! faults carrying a numeric code.

use std::{fmt, io};

use async_trait::async_trait;

use crate::headers::ChannelHeaders;
use crate::types::{
    Contact, Group, IdentityLogin, LoginResult, Message, MessageBoxWrapUp, Operation, Profile,
};

/// Remote fault code raised when another login superseded this session.
pub const CODE_SESSION_SUPERSEDED: i32 = 9;

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// A fault raised by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcError {
    pub code:   i32,
    pub reason: String,
}

impl RpcError {
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }

    /// `true` if this fault means the session was taken over by another login.
    pub fn is_session_superseded(&self) -> bool {
        self.code == CODE_SESSION_SUPERSEDED
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote fault {}", self.code)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

// ─── CallError ────────────────────────────────────────────────────────────────

/// Why a single remote call failed.
#[derive(Debug)]
pub enum CallError {
    /// The service answered with a fault.
    Remote(RpcError),
    /// The connection broke or the stream ended early.
    Transport(io::Error),
    /// The response could not be decoded.
    Decode(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(e)    => write!(f, "{e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Decode(s)    => write!(f, "decode error: {s}"),
        }
    }
}

impl std::error::Error for CallError {}

impl From<RpcError> for CallError {
    fn from(e: RpcError) -> Self { Self::Remote(e) }
}

impl From<io::Error> for CallError {
    fn from(e: io::Error) -> Self { Self::Transport(e) }
}

// ─── TalkService ──────────────────────────────────────────────────────────────

/// The remote calls the client makes.
///
/// `fetch_operations` is a long poll: implementations should route it over a
/// connection whose read timeout outlasts the server's hold time.
#[async_trait]
pub trait TalkService: Send + Sync {
    /// Replace the headers sent with every subsequent call.
    fn set_headers(&self, headers: &ChannelHeaders);

    async fn login_with_identity_credential_for_certificate(
        &self,
        request: &IdentityLogin,
    ) -> Result<LoginResult, CallError>;

    async fn login_with_verifier_for_certificate(&self, verifier: &str) -> Result<LoginResult, CallError>;

    async fn get_profile(&self) -> Result<Profile, CallError>;

    async fn get_all_contact_ids(&self) -> Result<Vec<String>, CallError>;

    async fn get_contacts(&self, ids: &[String]) -> Result<Vec<Contact>, CallError>;

    async fn get_group_ids_joined(&self) -> Result<Vec<String>, CallError>;

    async fn get_groups(&self, ids: &[String]) -> Result<Vec<Group>, CallError>;

    async fn leave_group(&self, seq: i32, id: &str) -> Result<(), CallError>;

    async fn send_message(&self, seq: i32, message: &Message) -> Result<Message, CallError>;

    async fn get_recent_messages(&self, message_box_id: &str, count: i32) -> Result<Vec<Message>, CallError>;

    async fn get_last_op_revision(&self) -> Result<i64, CallError>;

    async fn fetch_operations(&self, revision: i64, count: i32) -> Result<Vec<Operation>, CallError>;

    async fn get_message_box_compact_wrap_up(&self, id: &str) -> Result<MessageBoxWrapUp, CallError>;
}
