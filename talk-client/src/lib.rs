//! # talk-client
//!
//! Async client for the talk messaging service.
//!
//! ## Features
//! - Certificate login (session key → sealed credentials → PIN → verifier),
//!   either in one call or split into [`Client::request_pin`] / [`Client::confirm_pin`]
//! - Login with a saved auth token
//! - Sorted, de-duplicated contact and group snapshots with id/name lookups
//! - Revision-tracked operation polling ([`Client::poll`]) and a background
//!   event stream ([`Client::stream_events`])
//! - Send text, stickers and images by URL; leave groups; fetch recent messages
//!
//! The RPC transport is not part of this crate: pass any [`TalkService`]
//! implementation to [`Client::new`] or [`Client::connect`].

#![deny(unsafe_code)]

mod auth;
mod cache;
mod errors;
mod guard;
pub mod http;
pub mod message;
pub mod poll;

pub use auth::{HandshakeState, PendingVerification};
pub use cache::{Contact, Entity, Group};
pub use errors::{InvocationError, LoginError, RejectReason};
pub use guard::AuthToken;
pub use http::{HttpError, HttpFetcher, JsonFetcher};
pub use message::{Message, Sticker};
pub use poll::{Event, EventBatch, EventStream};

pub use talk_proto::login::{Credentials, Pkcs1Sealer, Sealer};
pub use talk_proto::{ChannelHeaders, Platform, RpcError, TalkService};

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use talk_proto::login::Device;
use talk_proto::types::MessageBox;
use tokio::sync::Mutex;

use cache::EntityCache;
use guard::SessionGuard;
use poll::RevisionState;

// ─── Endpoints ────────────────────────────────────────────────────────────────

/// Default service host.
pub const DEFAULT_DOMAIN: &str = "http://gd2.line.naver.jp";

const SESSION_KEY_LINE_PATH:  &str = "/authct/v1/keys/line";
const SESSION_KEY_NAVER_PATH: &str = "/authct/v1/keys/naver";
const CERTIFICATE_PATH:       &str = "/Q";

// ─── Config ───────────────────────────────────────────────────────────────────

/// Callback that shows the login PIN to the user.
pub type PinHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Configuration for [`Client::connect`].
///
/// Set either `auth_token` or `credentials`; the token wins if both are set.
#[derive(Clone)]
pub struct Config {
    /// Scheme and host the login endpoints live under.
    pub domain:       String,
    /// Desktop flavour announced in the identity headers (default: Mac).
    pub platform:     Platform,
    pub app_version:  String,
    pub device_name:  String,
    /// Client address reported with the credential login.
    pub ip:           String,
    /// Suggested batch size for [`Client::poll`]; see [`Client::default_poll_count`].
    pub poll_count:   i32,
    /// Pause after a soft poll failure in [`Client::stream_events`].
    pub poll_backoff: Duration,
    pub auth_token:   Option<String>,
    pub credentials:  Option<Credentials>,
    /// Called with the PIN when [`Client::connect`] runs the handshake.
    pub pin_handler:  PinHandler,
    pub http:         Arc<dyn JsonFetcher>,
    pub sealer:       Arc<dyn Sealer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain:       DEFAULT_DOMAIN.to_string(),
            platform:     Platform::default(),
            app_version:  "3.7.0".to_string(),
            device_name:  "carpedm20".to_string(),
            ip:           "127.0.0.1".to_string(),
            poll_count:   50,
            poll_backoff: Duration::from_secs(1),
            auth_token:   None,
            credentials:  None,
            pin_handler:  Arc::new(|pin: &str| {
                tracing::info!("[talk] enter PIN {pin} on your mobile device within 2 minutes");
            }),
            http:         Arc::new(HttpFetcher::new()),
            sealer:       Arc::new(Pkcs1Sealer),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("platform", &self.platform)
            .field("app_version", &self.app_version)
            .field("device_name", &self.device_name)
            .field("ip", &self.ip)
            .field("poll_count", &self.poll_count)
            .field("poll_backoff", &self.poll_backoff)
            .field("auth_token", &self.auth_token.is_some())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// The parts of [`Config`] the client keeps after construction.
pub(crate) struct Settings {
    pub(crate) session_line_url:  String,
    pub(crate) session_naver_url: String,
    pub(crate) certificate_url:   String,
    pub(crate) identity:          ChannelHeaders,
    pub(crate) device:            Device,
    pub(crate) poll_count:        i32,
    pub(crate) poll_backoff:      Duration,
}

impl Settings {
    fn from_config(config: &Config) -> Self {
        let domain = config.domain.trim_end_matches('/');
        Self {
            session_line_url:  format!("{domain}{SESSION_KEY_LINE_PATH}"),
            session_naver_url: format!("{domain}{SESSION_KEY_NAVER_PATH}"),
            certificate_url:   format!("{domain}{CERTIFICATE_PATH}"),
            identity:          ChannelHeaders::new(config.platform, &config.app_version),
            device:            Device { ip: config.ip.clone(), name: config.device_name.clone() },
            poll_count:        config.poll_count,
            poll_backoff:      config.poll_backoff,
        }
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub(crate) struct ClientInner {
    pub(crate) service:        Arc<dyn TalkService>,
    pub(crate) http:           Arc<dyn JsonFetcher>,
    pub(crate) sealer:         Arc<dyn Sealer>,
    pub(crate) settings:       Settings,
    pub(crate) guard:          SessionGuard,
    pub(crate) handshake:      StdMutex<HandshakeState>,
    /// Held for the duration of a handshake.
    pub(crate) handshake_lock: Mutex<()>,
    pub(crate) certificate:    StdMutex<Option<String>>,
    pub(crate) cache:          EntityCache,
    pub(crate) revision:       StdMutex<RevisionState>,
    /// At most one poll in flight.
    pub(crate) poll_lock:      Mutex<()>,
    pub(crate) message_boxes:  Mutex<HashMap<String, MessageBox>>,
}

/// A session with the talk service. Cheap to clone; internally Arc-wrapped.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    /// Build an unauthenticated client. No network I/O happens here.
    ///
    /// The identity headers are installed on `service` right away.
    pub fn new(config: Config, service: Arc<dyn TalkService>) -> Self {
        let settings = Settings::from_config(&config);
        service.set_headers(&settings.identity);

        let inner = Arc::new(ClientInner {
            service,
            http:           config.http,
            sealer:         config.sealer,
            settings,
            guard:          SessionGuard::default(),
            handshake:      StdMutex::new(HandshakeState::Unauthenticated),
            handshake_lock: Mutex::new(()),
            certificate:    StdMutex::new(None),
            cache:          EntityCache::default(),
            revision:       StdMutex::new(RevisionState::default()),
            poll_lock:      Mutex::new(()),
            message_boxes:  Mutex::new(HashMap::new()),
        });
        Self { inner }
    }

    /// Build a client and sign in, with the saved token if there is one and
    /// with the credential handshake otherwise.
    ///
    /// Fails with [`LoginError::MissingCredentials`] before any I/O when
    /// neither is configured.
    pub async fn connect(config: Config, service: Arc<dyn TalkService>) -> Result<Self, LoginError> {
        let token = config.auth_token.clone().filter(|t| !t.is_empty());
        let credentials = config.credentials.clone().filter(Credentials::is_complete);
        if token.is_none() && credentials.is_none() {
            return Err(LoginError::MissingCredentials);
        }
        let pin_handler = config.pin_handler.clone();

        let client = Self::new(config, service);
        match (token, credentials) {
            (Some(token), _) => client.sign_in_with_token(AuthToken::new(token)).await?,
            (None, Some(credentials)) => {
                client.login(&credentials, |pin| pin_handler(pin)).await?;
            }
            (None, None) => return Err(LoginError::MissingCredentials),
        }
        Ok(client)
    }

    /// Operations per poll configured in [`Config::poll_count`].
    pub fn default_poll_count(&self) -> i32 {
        self.inner.settings.poll_count
    }

    /// The service, after the guard confirmed a token is present.
    pub(crate) fn authorized(&self) -> Result<&dyn TalkService, InvocationError> {
        self.inner.guard.require_authenticated()?;
        Ok(self.inner.service.as_ref())
    }
}
