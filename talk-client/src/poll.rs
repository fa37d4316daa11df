//! Revision-tracked operation polling.
//!
//! The service numbers every operation with a revision. The client keeps a
//! watermark (the highest revision it has consumed) and asks for everything
//! after it. The watermark only moves forward, and only once a whole batch has
//! been processed.

use talk_proto::types::{OpType, Operation};
use talk_proto::CallError;
use tokio::sync::mpsc;

use crate::cache::Entity;
use crate::message::Message;
use crate::{Client, InvocationError};

// ─── RevisionState ────────────────────────────────────────────────────────────

/// The revision watermark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevisionState {
    pub revision: i64,
}

impl RevisionState {
    pub fn new(revision: i64) -> Self { Self { revision } }

    /// Move the watermark to `max(current, revision)`.
    pub fn advance(&mut self, revision: i64) {
        if revision > self.revision { self.revision = revision; }
    }
}

// ─── Event / EventBatch ───────────────────────────────────────────────────────

/// A received message and the conversation it was addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// The contact or group the message was sent to, if cached.
    pub endpoint: Option<Entity>,
    pub message:  Message,
}

/// The events produced by one poll call.
#[derive(Clone, Debug, Default)]
pub struct EventBatch {
    events:       Vec<Event>,
    revision:     i64,
    soft_failure: Option<String>,
}

impl EventBatch {
    /// Watermark after this batch was processed.
    pub fn revision(&self) -> i64 { self.revision }

    /// `true` if the fetch failed and the caller may simply poll again.
    pub fn is_soft_failure(&self) -> bool { self.soft_failure.is_some() }

    /// Why the fetch failed, for soft failures.
    pub fn failure(&self) -> Option<&str> { self.soft_failure.as_deref() }

    pub fn len(&self) -> usize { self.events.len() }

    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    pub fn events(&self) -> &[Event] { &self.events }
}

impl IntoIterator for EventBatch {
    type Item     = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter { self.events.into_iter() }
}

// ─── EventStream ──────────────────────────────────────────────────────────────

/// Continuous event feed returned by [`Client::stream_events`].
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Result<Event, InvocationError>>,
}

impl EventStream {
    /// Wait for the next event.
    ///
    /// Yields `Some(Err(_))` once if polling hit a fatal error, then `None`.
    pub async fn next(&mut self) -> Option<Result<Event, InvocationError>> {
        self.rx.recv().await
    }
}

// ─── Client methods ───────────────────────────────────────────────────────────

impl Client {
    /// The current revision watermark.
    pub fn revision(&self) -> i64 {
        self.inner.revision.lock().unwrap_or_else(std::sync::PoisonError::into_inner).revision
    }

    /// Fetch up to `max_count` operations after the current watermark.
    ///
    /// Transport faults and remote faults other than "session superseded" give
    /// an empty batch flagged as a soft failure. A superseded session gives
    /// [`InvocationError::SessionInvalidated`] and logs the client out.
    pub async fn poll(&self, max_count: i32) -> Result<EventBatch, InvocationError> {
        let _running = self.inner.poll_lock.lock().await;
        let from = self.revision();
        self.poll_locked(from, max_count).await
    }

    /// Like [`Client::poll`], but fetch after `from_revision`.
    ///
    /// The watermark still only moves forward.
    pub async fn poll_from(&self, from_revision: i64, max_count: i32) -> Result<EventBatch, InvocationError> {
        let _running = self.inner.poll_lock.lock().await;
        self.poll_locked(from_revision, max_count).await
    }

    async fn poll_locked(&self, from: i64, max_count: i32) -> Result<EventBatch, InvocationError> {
        let service = self.authorized()?;

        let ops = match service.fetch_operations(from, max_count).await {
            Ok(ops) => ops,
            Err(CallError::Remote(e)) if e.is_session_superseded() => {
                tracing::warn!("[talk] session superseded by another login");
                self.invalidate_session();
                return Err(InvocationError::SessionInvalidated);
            }
            Err(e) => {
                let reason = InvocationError::from(e).to_string();
                tracing::warn!("[talk] fetchOperations failed: {reason}");
                return Ok(EventBatch { events: Vec::new(), revision: self.revision(), soft_failure: Some(reason) });
            }
        };

        let (events, max_seen) = self.classify(ops);

        let revision = {
            let mut state = self.inner.revision.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(max) = max_seen {
                state.advance(max);
            }
            state.revision
        };
        tracing::debug!("[talk] poll: {} events, revision {revision}", events.len());
        Ok(EventBatch { events, revision, soft_failure: None })
    }

    /// Turn a fetched batch into events, in order. Returns the highest revision seen.
    fn classify(&self, ops: Vec<Operation>) -> (Vec<Event>, Option<i64>) {
        let mut events = Vec::new();
        let mut max_seen: Option<i64> = None;

        for op in ops {
            max_seen = Some(max_seen.map_or(op.revision, |m| m.max(op.revision)));
            match op.op_type {
                OpType::EndOfOperation => {}
                // echo of our own send; the caller already has it
                OpType::SendMessage => {
                    tracing::trace!("[talk] skipping SEND_MESSAGE echo at revision {}", op.revision);
                }
                OpType::ReceiveMessage => match op.message {
                    Some(raw) => {
                        let message  = Message::resolve(raw, &self.inner.cache);
                        let endpoint = message.receiver.clone();
                        events.push(Event { endpoint, message });
                    }
                    None => tracing::warn!("[talk] RECEIVE_MESSAGE without payload at revision {}", op.revision),
                },
                other => {
                    tracing::debug!("[talk] unhandled operation {} at revision {}", other.name(), op.revision);
                }
            }
        }
        (events, max_seen)
    }

    /// Poll in a background task and forward every event.
    ///
    /// The task stops when the stream is dropped or polling fails fatally.
    /// After a soft failure it waits [`crate::Config::poll_backoff`].
    pub fn stream_events(&self, max_count: i32) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();
        tokio::spawn(async move {
            client.run_event_loop(max_count, tx).await;
        });
        EventStream { rx }
    }

    async fn run_event_loop(
        &self,
        max_count: i32,
        tx:        mpsc::UnboundedSender<Result<Event, InvocationError>>,
    ) {
        loop {
            if tx.is_closed() {
                return;
            }
            match self.poll(max_count).await {
                Ok(batch) if batch.is_soft_failure() => {
                    tokio::time::sleep(self.inner.settings.poll_backoff).await;
                }
                Ok(batch) => {
                    for event in batch {
                        if tx.send(Ok(event)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("[talk] event stream stopped: {e}");
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    }
}
