//! Canonical Message Model
//!
//! One platform-agnostic representation for every inbound or outbound
//! communication unit. Each kind carries exactly its own payload fields;
//! constructors validate the kind invariants, and payloads are immutable
//! after construction except for Text → Button promotion during adapter
//! preprocessing and reply-id assignment.

use serde::{Deserialize, Serialize};

use crate::domain::errors::GatewayError;
use crate::domain::value_objects::PlatformType;

/// A button as rendered on a platform keyboard.
///
/// Projection of a [`super::Button`] entity: display text plus the stable
/// command sent back when the user presses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    pub command: String,
    #[serde(default)]
    pub is_inline: bool,
}

/// Message kind discriminator with kind-specific payload.
///
/// Service kinds describe conversation lifecycle events delivered by the
/// platform; content kinds carry user-visible payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    // Service kinds
    Start {
        context: Option<String>,
    },
    Subscribed,
    Unsubscribed,
    Delivered,
    Seen,
    Webhook,
    Failed {
        text: Option<String>,
    },
    /// Payload shape not recognized by the adapter. Kept instead of failing
    /// so one odd event cannot poison a webhook delivery.
    Undefined {
        raw: Option<String>,
    },

    // Content kinds
    Text {
        text: String,
    },
    Sticker {
        file_id: String,
    },
    Picture {
        file_url: Option<String>,
        file_id: Option<String>,
        text: Option<String>,
    },
    Audio {
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
    },
    Video {
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
        text: Option<String>,
    },
    File {
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
        file_name: Option<String>,
        file_mime_type: Option<String>,
    },
    Contact {
        name: Option<String>,
        phone: Option<String>,
    },
    Url {
        url: String,
    },
    Location {
        lat: f64,
        lon: f64,
    },
    RichMedia {
        media: serde_json::Value,
        alt_text: Option<String>,
    },
    /// A pressed button, carrying its command.
    Button {
        command: String,
    },
    /// A bare keyboard; the button list travels in [`Message::buttons`].
    Keyboard,
    /// An ordered batch of messages, always flat (never nested).
    Multiple {
        messages: Vec<Message>,
    },
}

impl MessageKind {
    pub fn is_service(&self) -> bool {
        matches!(
            self,
            MessageKind::Start { .. }
                | MessageKind::Subscribed
                | MessageKind::Unsubscribed
                | MessageKind::Delivered
                | MessageKind::Seen
                | MessageKind::Webhook
                | MessageKind::Failed { .. }
                | MessageKind::Undefined { .. }
        )
    }

    /// Kind name for logging and storage.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Start { .. } => "start",
            MessageKind::Subscribed => "subscribed",
            MessageKind::Unsubscribed => "unsubscribed",
            MessageKind::Delivered => "delivered",
            MessageKind::Seen => "seen",
            MessageKind::Webhook => "webhook",
            MessageKind::Failed { .. } => "failed",
            MessageKind::Undefined { .. } => "undefined",
            MessageKind::Text { .. } => "text",
            MessageKind::Sticker { .. } => "sticker",
            MessageKind::Picture { .. } => "picture",
            MessageKind::Audio { .. } => "audio",
            MessageKind::Video { .. } => "video",
            MessageKind::File { .. } => "file",
            MessageKind::Contact { .. } => "contact",
            MessageKind::Url { .. } => "url",
            MessageKind::Location { .. } => "location",
            MessageKind::RichMedia { .. } => "richmedia",
            MessageKind::Button { .. } => "button",
            MessageKind::Keyboard => "keyboard",
            MessageKind::Multiple { .. } => "multiple",
        }
    }
}

/// Canonical message: kind + payload plus routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque platform message id; None for synthetic/outbound messages.
    pub id: Option<String>,
    /// Sender account id on its platform.
    pub user_id: Option<String>,
    /// Sender display name, when the platform provides it inline.
    pub user_name: Option<String>,
    /// Platform-native timestamp, treated as an opaque ordering hint.
    pub timestamp: Option<i64>,
    /// Which adapter produced / will consume this message.
    pub platform: Option<PlatformType>,
    /// Threaded-reply target.
    pub reply_to_id: Option<String>,
    /// Keyboard attached to an outbound message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<KeyboardButton>>,
    #[serde(flatten)]
    pub kind: MessageKind,
}

impl Message {
    fn of(kind: MessageKind) -> Self {
        Self {
            id: None,
            user_id: None,
            user_name: None,
            timestamp: None,
            platform: None,
            reply_to_id: None,
            buttons: None,
            kind,
        }
    }

    // --- Service constructors ---

    pub fn start(context: Option<String>) -> Self {
        Self::of(MessageKind::Start { context })
    }

    pub fn subscribed() -> Self {
        Self::of(MessageKind::Subscribed)
    }

    pub fn unsubscribed() -> Self {
        Self::of(MessageKind::Unsubscribed)
    }

    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self::of(MessageKind::Delivered).with_id(message_id)
    }

    pub fn seen(message_id: impl Into<String>) -> Self {
        Self::of(MessageKind::Seen).with_id(message_id)
    }

    pub fn webhook() -> Self {
        Self::of(MessageKind::Webhook)
    }

    pub fn failed(text: Option<String>) -> Self {
        Self::of(MessageKind::Failed { text })
    }

    pub fn undefined(raw: Option<String>) -> Self {
        Self::of(MessageKind::Undefined { raw })
    }

    // --- Content constructors ---

    pub fn text(text: impl Into<String>) -> Self {
        Self::of(MessageKind::Text { text: text.into() })
    }

    pub fn sticker(file_id: impl Into<String>) -> Self {
        Self::of(MessageKind::Sticker {
            file_id: file_id.into(),
        })
    }

    /// A picture needs at least one of a URL or a platform file id.
    pub fn picture(
        file_url: Option<String>,
        file_id: Option<String>,
        text: Option<String>,
    ) -> Result<Self, GatewayError> {
        if file_url.is_none() && file_id.is_none() {
            return Err(GatewayError::Validation(
                "picture message requires a file url or a file id".into(),
            ));
        }
        Ok(Self::of(MessageKind::Picture {
            file_url,
            file_id,
            text,
        }))
    }

    pub fn audio(
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
    ) -> Result<Self, GatewayError> {
        if file_url.is_none() && file_id.is_none() {
            return Err(GatewayError::Validation(
                "audio message requires a file url or a file id".into(),
            ));
        }
        Ok(Self::of(MessageKind::Audio {
            file_url,
            file_id,
            file_size,
        }))
    }

    pub fn video(
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
        text: Option<String>,
    ) -> Result<Self, GatewayError> {
        if file_url.is_none() && file_id.is_none() {
            return Err(GatewayError::Validation(
                "video message requires a file url or a file id".into(),
            ));
        }
        Ok(Self::of(MessageKind::Video {
            file_url,
            file_id,
            file_size,
            text,
        }))
    }

    pub fn file(
        file_url: Option<String>,
        file_id: Option<String>,
        file_size: Option<u64>,
        file_name: Option<String>,
        file_mime_type: Option<String>,
    ) -> Result<Self, GatewayError> {
        if file_url.is_none() && file_id.is_none() {
            return Err(GatewayError::Validation(
                "file message requires a file url or a file id".into(),
            ));
        }
        Ok(Self::of(MessageKind::File {
            file_url,
            file_id,
            file_size,
            file_name,
            file_mime_type,
        }))
    }

    pub fn contact(name: Option<String>, phone: Option<String>) -> Self {
        Self::of(MessageKind::Contact { name, phone })
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::of(MessageKind::Url { url: url.into() })
    }

    pub fn location(lat: f64, lon: f64) -> Self {
        Self::of(MessageKind::Location { lat, lon })
    }

    pub fn rich_media(media: serde_json::Value, alt_text: Option<String>) -> Self {
        Self::of(MessageKind::RichMedia { media, alt_text })
    }

    pub fn button(command: impl Into<String>) -> Self {
        Self::of(MessageKind::Button {
            command: command.into(),
        })
    }

    pub fn keyboard(buttons: Vec<KeyboardButton>) -> Self {
        Self::of(MessageKind::Keyboard).with_buttons(buttons)
    }

    /// Batch of ≥2 messages. Nested `Multiple` inputs are flattened into
    /// one flat list, so a `Multiple` never contains another `Multiple`.
    pub fn multiple(messages: Vec<Message>) -> Result<Self, GatewayError> {
        let flattened: Vec<Message> = messages.into_iter().flat_map(Message::into_list).collect();
        if flattened.len() < 2 {
            return Err(GatewayError::Validation(
                "multiple message requires at least 2 parts".into(),
            ));
        }
        Ok(Self::of(MessageKind::Multiple {
            messages: flattened,
        }))
    }

    // --- Builders ---

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_platform(mut self, platform: PlatformType) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_reply_to(mut self, reply_to_id: impl Into<String>) -> Self {
        self.reply_to_id = Some(reply_to_id.into());
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<KeyboardButton>) -> Self {
        self.buttons = Some(buttons);
        self
    }

    // --- Predicates and accessors ---

    pub fn is_service(&self) -> bool {
        self.kind.is_service()
    }

    pub fn is_content(&self) -> bool {
        !self.kind.is_service()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, MessageKind::Text { .. })
    }

    pub fn is_button(&self) -> bool {
        matches!(self.kind, MessageKind::Button { .. })
    }

    /// Text payload of a Text message.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Command payload of a Button message.
    pub fn button_command(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Button { command } => Some(command),
            _ => None,
        }
    }

    /// Retag a Text message as a pressed Button carrying `command`,
    /// keeping all metadata. Non-Text messages pass through unchanged.
    pub fn promote_to_button(mut self, command: impl Into<String>) -> Self {
        if self.is_text() {
            self.kind = MessageKind::Button {
                command: command.into(),
            };
        }
        self
    }

    /// Flatten into constituent messages: a `Multiple` yields its parts
    /// (in original order), anything else yields itself.
    pub fn into_list(self) -> Vec<Message> {
        match self.kind {
            MessageKind::Multiple { messages } => messages,
            _ => vec![self],
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message(kind={}, id={:?}, user={:?})",
            self.kind.name(),
            self.id,
            self.user_id
        )
    }
}
