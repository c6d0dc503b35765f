// src/message.rs
//! Canonical inbound/outbound message units. Channel adapters build a
//! `NormalizedMessage` once; classifier and flow handlers only ever see this
//! shape, never provider wire formats.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Audio,
    Image,
    File,
}

impl MessageKind {
    pub fn is_media(self) -> bool {
        !matches!(self, MessageKind::Text)
    }
}

/// Immutable once constructed by a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub user_id: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(skip)]
    pub media_bytes: Option<Vec<u8>>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Originating channel tag, e.g. "whatsapp" or "telegram".
    #[serde(default)]
    pub provider: Option<String>,
}

impl NormalizedMessage {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: MessageKind::Text,
            text: Some(text.into()),
            media_url: None,
            media_bytes: None,
            mime_type: None,
            provider: None,
        }
    }

    pub fn media(
        user_id: impl Into<String>,
        kind: MessageKind,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            text: None,
            media_url: Some(media_url.into()),
            media_bytes: None,
            mime_type: None,
            provider: None,
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub to: String,
    pub text: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}
