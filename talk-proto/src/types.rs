//! Records exchanged with the talk service.
//!
//! These are plain field carriers; the client wraps them into richer entities.

use std::collections::HashMap;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Identity provider an account identifier belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    #[default]
    Unknown,
    /// Native accounts, identified by email.
    Line,
    /// Partner accounts, identified by a plain account id.
    NaverKr,
}

impl Provider {
    pub fn value(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Line    => 1,
            Self::NaverKr => 2,
        }
    }
}

/// Kind of a server operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    EndOfOperation,
    /// Echo of a message this account sent.
    SendMessage,
    ReceiveMessage,
    Other(i32),
}

const OP_NAMES: [&str; 30] = [
    "END_OF_OPERATION",
    "UPDATE_PROFILE",
    "NOTIFIED_UPDATE_PROFILE",
    "REGISTER_USERID",
    "ADD_CONTACT",
    "NOTIFIED_ADD_CONTACT",
    "BLOCK_CONTACT",
    "UNBLOCK_CONTACT",
    "NOTIFIED_RECOMMEND_CONTACT",
    "CREATE_GROUP",
    "UPDATE_GROUP",
    "NOTIFIED_UPDATE_GROUP",
    "INVITE_INTO_GROUP",
    "NOTIFIED_INVITE_INTO_GROUP",
    "LEAVE_GROUP",
    "NOTIFIED_LEAVE_GROUP",
    "ACCEPT_GROUP_INVITATION",
    "NOTIFIED_ACCEPT_GROUP_INVITATION",
    "KICKOUT_FROM_GROUP",
    "NOTIFIED_KICKOUT_FROM_GROUP",
    "CREATE_ROOM",
    "INVITE_INTO_ROOM",
    "NOTIFIED_INVITE_INTO_ROOM",
    "LEAVE_ROOM",
    "NOTIFIED_LEAVE_ROOM",
    "SEND_MESSAGE",
    "RECEIVE_MESSAGE",
    "SEND_MESSAGE_RECEIPT",
    "RECEIVE_MESSAGE_RECEIPT",
    "SEND_CONTENT_RECEIPT",
];

impl OpType {
    pub fn from_value(v: i32) -> Self {
        match v {
            0  => Self::EndOfOperation,
            25 => Self::SendMessage,
            26 => Self::ReceiveMessage,
            n  => Self::Other(n),
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Self::EndOfOperation => 0,
            Self::SendMessage    => 25,
            Self::ReceiveMessage => 26,
            Self::Other(n)       => n,
        }
    }

    /// Protocol name, for diagnostics.
    pub fn name(self) -> &'static str {
        usize::try_from(self.value())
            .ok()
            .and_then(|i| OP_NAMES.get(i).copied())
            .unwrap_or("UNKNOWN")
    }
}

/// Payload kind of a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    None,
    Image,
    Video,
    Audio,
    Html,
    Pdf,
    Call,
    Sticker,
    Other(i32),
}

impl ContentType {
    pub fn from_value(v: i32) -> Self {
        match v {
            0 => Self::None,
            1 => Self::Image,
            2 => Self::Video,
            3 => Self::Audio,
            4 => Self::Html,
            5 => Self::Pdf,
            6 => Self::Call,
            7 => Self::Sticker,
            n => Self::Other(n),
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Self::None     => 0,
            Self::Image    => 1,
            Self::Video    => 2,
            Self::Audio    => 3,
            Self::Html     => 4,
            Self::Pdf      => 5,
            Self::Call     => 6,
            Self::Sticker  => 7,
            Self::Other(n) => n,
        }
    }
}

/// Kind of destination a message is addressed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToType {
    #[default]
    User,
    Room,
    Group,
    Other(i32),
}

impl ToType {
    pub fn from_value(v: i32) -> Self {
        match v {
            0 => Self::User,
            1 => Self::Room,
            2 => Self::Group,
            n => Self::Other(n),
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Self::User     => 0,
            Self::Room     => 1,
            Self::Group    => 2,
            Self::Other(n) => n,
        }
    }
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// Arguments of `loginWithIdentityCredentialForCertificate`.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityLogin {
    pub identifier:  String,
    pub password:    String,
    pub key_name:    String,
    /// Hex-encoded RSA ciphertext of the credential envelope.
    pub credential:  String,
    pub is_mac:      bool,
    pub ip:          String,
    pub device_name: String,
    pub provider:    Provider,
    pub extra:       String,
}

impl std::fmt::Debug for IdentityLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityLogin")
            .field("identifier", &self.identifier)
            .field("key_name", &self.key_name)
            .field("ip", &self.ip)
            .field("device_name", &self.device_name)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Response of both certificate login calls.
///
/// `result_type` is `1` on success, `2` when QR re-authentication is needed and
/// anything else when the device must be confirmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginResult {
    pub auth_token:  Option<String>,
    pub certificate: Option<String>,
    pub verifier:    Option<String>,
    pub pin_code:    Option<String>,
    pub result_type: i32,
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// The logged-in account's own profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub mid:            String,
    pub display_name:   String,
    pub status_message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contact {
    pub mid:            String,
    pub display_name:   String,
    pub status_message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group {
    pub id:      String,
    pub name:    String,
    pub creator: Option<Contact>,
    pub members: Vec<Contact>,
    pub invitee: Vec<Contact>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub id:               String,
    pub from:             String,
    pub to:               String,
    pub to_type:          ToType,
    /// Milliseconds since the Unix epoch.
    pub created_time:     i64,
    pub text:             Option<String>,
    pub has_content:      bool,
    pub content_type:     ContentType,
    pub content_preview:  Option<Vec<u8>>,
    pub content_metadata: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageBox {
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageBoxWrapUp {
    pub message_box: Option<MessageBox>,
}

/// One entry of the incremental operation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub revision: i64,
    pub op_type:  OpType,
    pub message:  Option<Message>,
}
