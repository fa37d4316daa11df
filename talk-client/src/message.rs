//! Messages and the calls that send or fetch them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use talk_proto::types::{self, ContentType, MessageBox, ToType};

use crate::cache::{Entity, EntityCache};
use crate::{Client, InvocationError};

// ─── Message ──────────────────────────────────────────────────────────────────

/// A message with its endpoints resolved against the entity cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id:           String,
    pub from_id:      String,
    pub to_id:        String,
    /// `None` if the sender was not in the cache when the message arrived.
    pub sender:       Option<Entity>,
    /// `None` if the receiver was not in the cache when the message arrived.
    pub receiver:     Option<Entity>,
    pub to_type:      ToType,
    pub text:         Option<String>,
    pub content_type: ContentType,
    pub has_content:  bool,
    pub preview:      Option<Vec<u8>>,
    pub metadata:     HashMap<String, String>,
    /// `None` if the server sent an out-of-range timestamp.
    pub created_at:   Option<DateTime<Utc>>,
}

impl Message {
    pub(crate) fn resolve(raw: types::Message, cache: &EntityCache) -> Self {
        Self {
            sender:       cache.resolve(&raw.from),
            receiver:     cache.resolve(&raw.to),
            created_at:   DateTime::from_timestamp_millis(raw.created_time),
            id:           raw.id,
            from_id:      raw.from,
            to_id:        raw.to,
            to_type:      raw.to_type,
            text:         raw.text,
            content_type: raw.content_type,
            has_content:  raw.has_content,
            preview:      raw.content_preview,
            metadata:     raw.content_metadata,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.sender.as_ref().map(Entity::name).unwrap_or(&self.from_id);
        match (&self.text, self.content_type) {
            (Some(text), _)             => write!(f, "{from}: {text}"),
            (None, ContentType::None)   => write!(f, "{from}: <empty>"),
            (None, other)               => write!(f, "{from}: <{other:?}>"),
        }
    }
}

// ─── Sticker ──────────────────────────────────────────────────────────────────

/// Sticker reference. The default is the stock sticker of the first package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sticker {
    pub id:         String,
    pub package_id: String,
    pub version:    String,
    pub text:       String,
}

impl Default for Sticker {
    fn default() -> Self {
        Self {
            id:         "13".into(),
            package_id: "1".into(),
            version:    "100".into(),
            text:       "[null]".into(),
        }
    }
}

impl Sticker {
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("STKID".to_string(),    self.id.clone()),
            ("STKPKGID".to_string(), self.package_id.clone()),
            ("STKVER".to_string(),   self.version.clone()),
            ("STKTXT".to_string(),   self.text.clone()),
        ])
    }
}

// ─── Client methods ───────────────────────────────────────────────────────────

impl Client {
    async fn send(&self, seq: i32, message: types::Message) -> Result<Message, InvocationError> {
        let service = self.authorized()?;
        let sent = service.send_message(seq, &message).await?;
        Ok(Message::resolve(sent, &self.inner.cache))
    }

    /// Send a plain text message to a contact or group.
    pub async fn send_text(&self, to_id: &str, text: &str) -> Result<Message, InvocationError> {
        self.send(0, types::Message {
            to:   to_id.to_string(),
            text: Some(text.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn send_sticker(&self, to_id: &str, sticker: &Sticker) -> Result<Message, InvocationError> {
        self.send(0, types::Message {
            to:               to_id.to_string(),
            content_type:     ContentType::Sticker,
            content_metadata: sticker.metadata(),
            ..Default::default()
        })
        .await
    }

    /// Send an image the server fetches from `url`.
    ///
    /// `preview` is sent as the content preview as-is; nothing is downloaded.
    pub async fn send_image_url(
        &self,
        to_id:   &str,
        url:     &str,
        preview: Option<Vec<u8>>,
    ) -> Result<Message, InvocationError> {
        self.send(1, types::Message {
            to:               to_id.to_string(),
            content_type:     ContentType::Image,
            content_preview:  preview,
            content_metadata: HashMap::from([
                ("PREVIEW_URL".to_string(),  url.to_string()),
                ("DOWNLOAD_URL".to_string(), url.to_string()),
                ("PUBLIC".to_string(),       "True".to_string()),
            ]),
            ..Default::default()
        })
        .await
    }

    /// Leave a group. Returns `false` if the service refused.
    pub async fn leave_group(&self, group_id: &str) -> Result<bool, InvocationError> {
        let service = self.authorized()?;
        match service.leave_group(0, group_id).await.map_err(InvocationError::from) {
            Ok(()) => Ok(true),
            Err(InvocationError::Rpc(e)) => {
                tracing::warn!("[talk] leave_group {group_id}: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// The message box of a contact or group, fetched on first use.
    pub async fn message_box(&self, entity_id: &str) -> Result<MessageBox, InvocationError> {
        let service = self.authorized()?;
        let mut boxes = self.inner.message_boxes.lock().await;
        if let Some(found) = boxes.get(entity_id) {
            return Ok(found.clone());
        }
        let wrap_up = service.get_message_box_compact_wrap_up(entity_id).await?;
        let message_box = wrap_up.message_box.ok_or_else(|| {
            InvocationError::Deserialize(format!("no message box for {entity_id}"))
        })?;
        boxes.insert(entity_id.to_string(), message_box.clone());
        Ok(message_box)
    }

    /// Fetch the message box of every cached contact that has none yet.
    ///
    /// Contacts without a box are skipped. Returns how many boxes are cached
    /// afterwards.
    pub async fn refresh_rooms(&self) -> Result<usize, InvocationError> {
        self.authorized()?;
        for contact in self.contacts().iter() {
            match self.message_box(&contact.id).await {
                Ok(_) => {}
                Err(InvocationError::Deserialize(reason)) => {
                    tracing::debug!("[talk] refresh_rooms: {reason}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.inner.message_boxes.lock().await.len())
    }

    /// The `count` most recent messages exchanged with a contact or group.
    pub async fn recent_messages(&self, entity_id: &str, count: i32) -> Result<Vec<Message>, InvocationError> {
        let message_box = self.message_box(entity_id).await?;
        let service = self.authorized()?;
        let raw = service.get_recent_messages(&message_box.id, count).await?;
        Ok(raw.into_iter().map(|m| Message::resolve(m, &self.inner.cache)).collect())
    }
}
