//! Protocol layer of the talk client.
//!
//! This crate handles:
//! * the records exchanged with the service ([`types`])
//! * the RPC seam the client calls through ([`TalkService`])
//! * the identity/access headers shared by RPC and HTTP ([`headers`])
//! * the certificate login as sans-IO steps ([`login`])
//!
//! It performs no I/O of its own: bring your own RPC transport.

#![deny(unsafe_code)]
#![allow(missing_docs)]

pub mod headers;
pub mod login;
pub mod service;
pub mod types;

pub use headers::{ChannelHeaders, Platform};
pub use login::Credentials;
pub use service::{CallError, RpcError, TalkService, CODE_SESSION_SUPERSEDED};
