//! Hand-written stand-ins for the service, the HTTP helper and the sealer.
//!
//! Every stub records what it was asked so tests can assert on call counts and
//! on the headers in force at the time.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use talk_client::{
    ChannelHeaders, Client, Config, Credentials, HttpError, JsonFetcher, Sealer,
};
use talk_crypto::{CryptoError, Key};
use talk_proto::types::{
    Contact, Group, IdentityLogin, LoginResult, Message, MessageBox, MessageBoxWrapUp, OpType,
    Operation, Profile,
};
use talk_proto::{CallError, RpcError, TalkService};
use tokio::sync::Notify;

pub const DOMAIN: &str = "http://talk.test";

// ─── StubService ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubService {
    pub calls:             Mutex<Vec<&'static str>>,
    pub headers:           Mutex<Vec<ChannelHeaders>>,
    pub identity_requests: Mutex<Vec<IdentityLogin>>,
    pub identity_result:   Mutex<LoginResult>,
    pub verifier_requests: Mutex<Vec<String>>,
    pub verifier_result:   Mutex<LoginResult>,
    pub profile:           Mutex<Profile>,
    pub contacts:          Mutex<Vec<Contact>>,
    pub groups:            Mutex<Vec<Group>>,
    pub revision:          Mutex<i64>,
    /// Answers for `fetch_operations`, in order; empty batches once drained.
    pub operations:        Mutex<VecDeque<Result<Vec<Operation>, CallError>>>,
    pub fetch_requests:    Mutex<Vec<(i64, i32)>>,
    pub leave_fault:       Mutex<Option<i32>>,
    pub sent:              Mutex<Vec<(i32, Message)>>,
    pub recent:            Mutex<Vec<Message>>,
    pub recent_requests:   Mutex<Vec<(String, i32)>>,
    /// Entity ids the service has no message box for.
    pub missing_boxes:     Mutex<Vec<String>>,
}

impl StubService {
    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    /// The access header installed most recently.
    pub fn last_access(&self) -> Option<String> {
        self.headers.lock().unwrap().last().and_then(|h| h.access.clone())
    }

    pub fn push_operations(&self, ops: Vec<Operation>) {
        self.operations.lock().unwrap().push_back(Ok(ops));
    }

    pub fn push_fault(&self, code: i32) {
        self.operations.lock().unwrap().push_back(Err(CallError::Remote(RpcError::new(code, "stub"))));
    }

    pub fn push_transport_error(&self) {
        let err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream exhausted");
        self.operations.lock().unwrap().push_back(Err(CallError::Transport(err)));
    }
}

#[async_trait]
impl TalkService for StubService {
    fn set_headers(&self, headers: &ChannelHeaders) {
        self.headers.lock().unwrap().push(headers.clone());
    }

    async fn login_with_identity_credential_for_certificate(
        &self,
        request: &IdentityLogin,
    ) -> Result<LoginResult, CallError> {
        self.record("loginWithIdentityCredentialForCertificate");
        self.identity_requests.lock().unwrap().push(request.clone());
        Ok(self.identity_result.lock().unwrap().clone())
    }

    async fn login_with_verifier_for_certificate(&self, verifier: &str) -> Result<LoginResult, CallError> {
        self.record("loginWithVerifierForCertificate");
        self.verifier_requests.lock().unwrap().push(verifier.to_string());
        Ok(self.verifier_result.lock().unwrap().clone())
    }

    async fn get_profile(&self) -> Result<Profile, CallError> {
        self.record("getProfile");
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn get_all_contact_ids(&self) -> Result<Vec<String>, CallError> {
        self.record("getAllContactIds");
        Ok(self.contacts.lock().unwrap().iter().map(|c| c.mid.clone()).collect())
    }

    async fn get_contacts(&self, _ids: &[String]) -> Result<Vec<Contact>, CallError> {
        self.record("getContacts");
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn get_group_ids_joined(&self) -> Result<Vec<String>, CallError> {
        self.record("getGroupIdsJoined");
        Ok(self.groups.lock().unwrap().iter().map(|g| g.id.clone()).collect())
    }

    async fn get_groups(&self, _ids: &[String]) -> Result<Vec<Group>, CallError> {
        self.record("getGroups");
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn leave_group(&self, _seq: i32, _id: &str) -> Result<(), CallError> {
        self.record("leaveGroup");
        match *self.leave_fault.lock().unwrap() {
            Some(code) => Err(CallError::Remote(RpcError::new(code, "stub"))),
            None       => Ok(()),
        }
    }

    async fn send_message(&self, seq: i32, message: &Message) -> Result<Message, CallError> {
        self.record("sendMessage");
        let mut sent = self.sent.lock().unwrap();
        sent.push((seq, message.clone()));
        Ok(Message { id: format!("sent-{}", sent.len()), ..message.clone() })
    }

    async fn get_recent_messages(&self, message_box_id: &str, count: i32) -> Result<Vec<Message>, CallError> {
        self.record("getRecentMessages");
        self.recent_requests.lock().unwrap().push((message_box_id.to_string(), count));
        Ok(self.recent.lock().unwrap().clone())
    }

    async fn get_last_op_revision(&self) -> Result<i64, CallError> {
        self.record("getLastOpRevision");
        Ok(*self.revision.lock().unwrap())
    }

    async fn fetch_operations(&self, revision: i64, count: i32) -> Result<Vec<Operation>, CallError> {
        self.record("fetchOperations");
        self.fetch_requests.lock().unwrap().push((revision, count));
        self.operations.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_message_box_compact_wrap_up(&self, id: &str) -> Result<MessageBoxWrapUp, CallError> {
        self.record("getMessageBoxCompactWrapUp");
        if self.missing_boxes.lock().unwrap().iter().any(|m| m == id) {
            return Ok(MessageBoxWrapUp { message_box: None });
        }
        Ok(MessageBoxWrapUp { message_box: Some(MessageBox { id: format!("box-{id}") }) })
    }
}

// ─── StubFetcher ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubFetcher {
    pub responses: Mutex<HashMap<String, Value>>,
    /// `(url, access header)` per request.
    pub requests:  Mutex<Vec<(String, Option<String>)>>,
    /// When set, the certificate fetch waits for a notification.
    pub gate:      Mutex<Option<Arc<Notify>>>,
}

impl StubFetcher {
    pub fn respond(&self, path: &str, body: Value) {
        self.responses.lock().unwrap().insert(format!("{DOMAIN}{path}"), body);
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonFetcher for StubFetcher {
    async fn get_json(&self, url: &str, headers: &ChannelHeaders) -> Result<Value, HttpError> {
        self.requests.lock().unwrap().push((url.to_string(), headers.access.clone()));
        let gate = self.gate.lock().unwrap().clone().filter(|_| url.ends_with("/Q"));
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.responses.lock().unwrap().get(url).cloned().ok_or(HttpError::Status(404))
    }
}

// ─── RecordingSealer ──────────────────────────────────────────────────────────

/// Records its inputs instead of encrypting.
#[derive(Default)]
pub struct RecordingSealer {
    pub inputs: Mutex<Vec<(String, String, String, Key)>>,
}

impl Sealer for RecordingSealer {
    fn seal(&self, session_key: &str, id: &str, secret: &str, key: &Key) -> Result<String, CryptoError> {
        self.inputs.lock().unwrap().push((session_key.into(), id.into(), secret.into(), key.clone()));
        Ok("5ea1ed".into())
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub struct Harness {
    pub service: Arc<StubService>,
    pub fetcher: Arc<StubFetcher>,
    pub sealer:  Arc<RecordingSealer>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            service: Arc::new(StubService::default()),
            fetcher: Arc::new(StubFetcher::default()),
            sealer:  Arc::new(RecordingSealer::default()),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            domain: DOMAIN.to_string(),
            http:   self.fetcher.clone(),
            sealer: self.sealer.clone(),
            ..Config::default()
        }
    }

    pub fn client(&self) -> Client {
        Client::new(self.config(), self.service.clone())
    }

    /// Script a handshake that succeeds with verifier `V1`, PIN `1234` and token `TOK`.
    pub fn script_handshake(&self, result_type: i32) {
        self.fetcher.respond("/authct/v1/keys/line", serde_json::json!({
            "session_key": "SK",
            "rsa_key":     "k,abcd,10001",
        }));
        self.fetcher.respond("/authct/v1/keys/naver", serde_json::json!({
            "session_key": "SK-naver",
            "rsa_key":     "n,abcd,10001",
        }));
        self.fetcher.respond("/Q", serde_json::json!({ "result": { "verifier": "V2" } }));
        *self.service.identity_result.lock().unwrap() = LoginResult {
            verifier: Some("V1".into()),
            pin_code: Some("1234".into()),
            ..Default::default()
        };
        *self.service.verifier_result.lock().unwrap() = LoginResult {
            result_type,
            auth_token:  (result_type == 1).then(|| "TOK".to_string()),
            certificate: (result_type == 1).then(|| "CERT".to_string()),
            ..Default::default()
        };
    }

    /// A client already signed in with a token, with an empty cache.
    pub async fn signed_in(&self) -> Client {
        let client = self.client();
        client.sign_in_with_token(talk_client::AuthToken::new("TOK")).await.unwrap();
        client
    }

    pub fn credentials() -> Credentials {
        Credentials::new("a@b.com", "pw")
    }
}

pub fn contact(id: &str, name: &str) -> Contact {
    Contact { mid: id.into(), display_name: name.into(), status_message: None }
}

pub fn text_message(from: &str, to: &str, text: &str) -> Message {
    Message {
        id:           format!("m-{from}-{to}"),
        from:         from.into(),
        to:           to.into(),
        created_time: 1_400_000_000_000,
        text:         Some(text.into()),
        ..Default::default()
    }
}

pub fn op(revision: i64, op_type: OpType, message: Option<Message>) -> Operation {
    Operation { revision, op_type, message }
}
