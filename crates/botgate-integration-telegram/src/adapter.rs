//! MessengerAdapter implementation for Telegram
//!
//! Maps Bot API updates to the canonical message model and back. Telegram
//! reply-keyboard presses arrive as plain text, so this adapter declares
//! preprocessing: text equal to an active button's display text in the
//! account's current menu is retagged as that button's command.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use botgate::{
    GatewayError, KeyboardButton, Menu, Message, MessageKind, MessengerAdapter, PlatformType,
    ProfileInfo, SendOutcome,
};

use crate::client::TelegramClient;
use crate::config::TelegramConfig;

/// Telegram integration implementing the MessengerAdapter port.
pub struct TelegramAdapter {
    client: TelegramClient,
}

impl TelegramAdapter {
    pub fn new(config: TelegramConfig) -> Result<Self, GatewayError> {
        let client = TelegramClient::new(&config)?;
        Ok(Self { client })
    }

    fn convert_update(update: Update) -> Message {
        if let Some(callback) = update.callback_query {
            let command = callback.data.unwrap_or_default();
            let mut message = Message::button(command)
                .with_id(callback.id)
                .with_user(callback.from.id.to_string());
            if let Some(name) = callback.from.display_name() {
                message = message.with_user_name(name);
            }
            if let Some(date) = callback.message.as_ref().and_then(|m| m.date) {
                message = message.with_timestamp(date);
            }
            return message.with_platform(PlatformType::Telegram);
        }

        let Some(incoming) = update.message else {
            return Message::undefined(None).with_platform(PlatformType::Telegram);
        };

        let converted = Self::convert_content(&incoming);
        let mut message = converted.with_id(incoming.message_id.to_string());
        if let Some(from) = &incoming.from {
            message = message.with_user(from.id.to_string());
            if let Some(name) = from.display_name() {
                message = message.with_user_name(name);
            }
        }
        if let Some(date) = incoming.date {
            message = message.with_timestamp(date);
        }
        if let Some(reply) = &incoming.reply_to_message {
            message = message.with_reply_to(reply.message_id.to_string());
        }
        message.with_platform(PlatformType::Telegram)
    }

    fn convert_content(incoming: &IncomingMessage) -> Message {
        if let Some(text) = &incoming.text {
            return Message::text(text.clone());
        }
        if let Some(sticker) = &incoming.sticker {
            return Message::sticker(sticker.file_id.clone());
        }
        if let Some(photos) = &incoming.photo {
            // Telegram sends every thumbnail size; keep the largest.
            if let Some(best) = photos.iter().max_by_key(|p| p.width) {
                if let Ok(message) = Message::picture(
                    None,
                    Some(best.file_id.clone()),
                    incoming.caption.clone(),
                ) {
                    return message;
                }
            }
        }
        if let Some(document) = &incoming.document {
            if let Ok(message) = Message::file(
                None,
                Some(document.file_id.clone()),
                document.file_size.map(|s| s as u64),
                document.file_name.clone(),
                document.mime_type.clone(),
            ) {
                return message;
            }
        }
        if let Some(video) = &incoming.video {
            if let Ok(message) = Message::video(
                None,
                Some(video.file_id.clone()),
                video.file_size.map(|s| s as u64),
                incoming.caption.clone(),
            ) {
                return message;
            }
        }
        if let Some(audio) = incoming.audio.as_ref().or(incoming.voice.as_ref()) {
            if let Ok(message) = Message::audio(
                None,
                Some(audio.file_id.clone()),
                audio.file_size.map(|s| s as u64),
            ) {
                return message;
            }
        }
        if let Some(contact) = &incoming.contact {
            return Message::contact(
                contact.first_name.clone(),
                Some(contact.phone_number.clone()),
            );
        }
        if let Some(location) = &incoming.location {
            return Message::location(location.latitude, location.longitude);
        }
        Message::undefined(None)
    }

    async fn send_one(&self, receiver: &str, message: Message) -> Result<String, GatewayError> {
        let reply_markup = render_reply_markup(message.buttons.as_deref().unwrap_or_default());
        let reply_to = message.reply_to_id.clone();

        let (method, mut payload) = match &message.kind {
            MessageKind::Text { text } => (
                "sendMessage",
                serde_json::json!({ "chat_id": receiver, "text": text }),
            ),
            // Telegram has no keyboard-only message; a zero-width space
            // carries the bare keyboard.
            MessageKind::Keyboard => (
                "sendMessage",
                serde_json::json!({ "chat_id": receiver, "text": "\u{200B}" }),
            ),
            MessageKind::Button { command } => (
                "sendMessage",
                serde_json::json!({ "chat_id": receiver, "text": command }),
            ),
            MessageKind::Url { url } => (
                "sendMessage",
                serde_json::json!({ "chat_id": receiver, "text": url }),
            ),
            MessageKind::Sticker { file_id } => (
                "sendSticker",
                serde_json::json!({ "chat_id": receiver, "sticker": file_id }),
            ),
            MessageKind::Picture {
                file_url,
                file_id,
                text,
            } => (
                "sendPhoto",
                serde_json::json!({
                    "chat_id": receiver,
                    "photo": file_url.as_ref().or(file_id.as_ref()),
                    "caption": text,
                }),
            ),
            MessageKind::Video {
                file_url,
                file_id,
                text,
                ..
            } => (
                "sendVideo",
                serde_json::json!({
                    "chat_id": receiver,
                    "video": file_url.as_ref().or(file_id.as_ref()),
                    "caption": text,
                }),
            ),
            MessageKind::Audio {
                file_url, file_id, ..
            } => (
                "sendAudio",
                serde_json::json!({
                    "chat_id": receiver,
                    "audio": file_url.as_ref().or(file_id.as_ref()),
                }),
            ),
            MessageKind::File {
                file_url,
                file_id,
                file_name,
                ..
            } => (
                "sendDocument",
                serde_json::json!({
                    "chat_id": receiver,
                    "document": file_url.as_ref().or(file_id.as_ref()),
                    "file_name": file_name,
                }),
            ),
            MessageKind::Contact { name, phone } => (
                "sendContact",
                serde_json::json!({
                    "chat_id": receiver,
                    "phone_number": phone.as_deref().unwrap_or_default(),
                    "first_name": name.as_deref().unwrap_or_default(),
                }),
            ),
            MessageKind::Location { lat, lon } => (
                "sendLocation",
                serde_json::json!({
                    "chat_id": receiver,
                    "latitude": lat,
                    "longitude": lon,
                }),
            ),
            MessageKind::RichMedia { media, alt_text } => (
                "sendMessage",
                serde_json::json!({
                    "chat_id": receiver,
                    "text": alt_text.clone().unwrap_or_else(|| media.to_string()),
                }),
            ),
            other => {
                return Err(GatewayError::Validation(format!(
                    "cannot send {} message through telegram",
                    other.name()
                )))
            }
        };

        if let Some(reply_to) = reply_to.and_then(|id| id.parse::<i64>().ok()) {
            payload["reply_to_message_id"] = serde_json::json!(reply_to);
        }
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup;
        }

        let result = self.client.call(method, payload).await?;
        Ok(result
            .get("message_id")
            .map(|v| v.to_string())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MessengerAdapter for TelegramAdapter {
    fn platform(&self) -> PlatformType {
        PlatformType::Telegram
    }

    async fn enable_webhook(&self, url: &str) -> Result<(), GatewayError> {
        debug!(url, "registering Telegram webhook");
        self.client.set_webhook(url).await
    }

    async fn disable_webhook(&self) -> Result<(), GatewayError> {
        self.client.delete_webhook().await
    }

    async fn account_info(&self) -> Result<ProfileInfo, GatewayError> {
        let me = self.client.get_me().await?;
        Ok(profile_from_value(&me))
    }

    async fn user_info(&self, user_id: &str) -> Result<ProfileInfo, GatewayError> {
        let chat = self.client.get_chat(user_id).await?;
        Ok(profile_from_value(&chat))
    }

    fn parse_message(
        &self,
        body: &[u8],
        _signature: Option<&str>,
    ) -> Result<Message, GatewayError> {
        match serde_json::from_slice::<Update>(body) {
            Ok(update) => Ok(Self::convert_update(update)),
            Err(error) => {
                debug!(%error, "unparseable Telegram update");
                Ok(Message::undefined(Some(String::from_utf8_lossy(body).into_owned()))
                    .with_platform(PlatformType::Telegram))
            }
        }
    }

    fn needs_preprocessing(&self) -> bool {
        true
    }

    fn preprocess_message(&self, message: Message, menu: Option<&Menu>) -> Message {
        if !message.is_text() {
            return message;
        }
        let Some(menu) = menu else {
            return message;
        };
        let text = message.text_content().unwrap_or_default().to_string();
        let command = menu
            .buttons
            .iter()
            .find(|b| b.is_active && b.text == text)
            .map(|b| b.command.clone());
        match command {
            Some(command) => message.promote_to_button(command),
            None => message,
        }
    }

    async fn send_message(&self, receiver: &str, messages: Vec<Message>) -> SendOutcome {
        let mut delivered = Vec::new();
        for message in messages.into_iter().flat_map(Message::into_list) {
            match self.send_one(receiver, message).await {
                Ok(id) => delivered.push(id),
                Err(error) => return SendOutcome::failed(delivered, error),
            }
        }
        SendOutcome::ok(delivered)
    }
}

fn profile_from_value(value: &serde_json::Value) -> ProfileInfo {
    let id = value
        .get("id")
        .map(|v| v.to_string());
    let username = value
        .get("username")
        .or_else(|| value.get("first_name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    ProfileInfo {
        id,
        username,
        avatar: None,
        info: value.clone(),
    }
}

/// Build a `reply_markup` object from the attached keyboard.
///
/// Inline buttons render as `inline_keyboard` with the command as
/// `callback_data`; otherwise a reply keyboard shows three buttons per row.
fn render_reply_markup(buttons: &[KeyboardButton]) -> Option<serde_json::Value> {
    if buttons.is_empty() {
        return None;
    }

    if buttons.iter().all(|b| b.is_inline) {
        let rows: Vec<serde_json::Value> = buttons
            .chunks(2)
            .map(|row| {
                row.iter()
                    .map(|b| {
                        serde_json::json!({ "text": b.text, "callback_data": b.command })
                    })
                    .collect()
            })
            .collect();
        return Some(serde_json::json!({ "inline_keyboard": rows }));
    }

    let rows: Vec<serde_json::Value> = buttons
        .iter()
        .filter(|b| !b.is_inline)
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|b| serde_json::json!({ "text": b.text }))
                .collect()
        })
        .collect();
    Some(serde_json::json!({ "keyboard": rows, "resize_keyboard": true }))
}

// --- Wire types (Bot API update payload) ---

#[derive(Debug, Deserialize)]
struct Update {
    #[allow(dead_code)]
    #[serde(default)]
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    date: Option<i64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    sticker: Option<Sticker>,
    #[serde(default)]
    document: Option<Document>,
    #[serde(default)]
    video: Option<Video>,
    #[serde(default)]
    audio: Option<Audio>,
    #[serde(default)]
    voice: Option<Audio>,
    #[serde(default)]
    contact: Option<Contact>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    reply_to_message: Option<Box<ReplyTo>>,
}

#[derive(Debug, Deserialize)]
struct ReplyTo {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
}

impl User {
    fn display_name(&self) -> Option<String> {
        self.username.clone().or_else(|| self.first_name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
    #[serde(default)]
    width: i64,
}

#[derive(Debug, Deserialize)]
struct Sticker {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    file_id: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Video {
    file_id: String,
    #[serde(default)]
    file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Audio {
    file_id: String,
    #[serde(default)]
    file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Contact {
    phone_number: String,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    message: Option<IncomingMessage>,
    #[serde(default)]
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use botgate::Button;

    fn adapter() -> TelegramAdapter {
        TelegramAdapter::new(TelegramConfig::new("123:abc")).unwrap()
    }

    #[test]
    fn test_parse_text_update() {
        let body = serde_json::json!({
            "message": {
                "message_id": 1,
                "from": { "id": 42 },
                "text": "Hello",
                "date": 1700000000
            }
        });

        let message = adapter()
            .parse_message(body.to_string().as_bytes(), None)
            .unwrap();

        assert_eq!(message.text_content(), Some("Hello"));
        assert_eq!(message.id.as_deref(), Some("1"));
        assert_eq!(message.user_id.as_deref(), Some("42"));
        assert_eq!(message.timestamp, Some(1700000000));
        assert_eq!(message.platform, Some(PlatformType::Telegram));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let body = serde_json::json!({
            "message": {
                "message_id": 9,
                "from": { "id": 7, "username": "sam" },
                "text": "again",
                "date": 1700000001
            }
        })
        .to_string();

        let first = adapter().parse_message(body.as_bytes(), None).unwrap();
        let second = adapter().parse_message(body.as_bytes(), None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_callback_query_as_button() {
        let body = serde_json::json!({
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42, "username": "sam" },
                "data": "btn-orders-ab12cd34ef"
            }
        });

        let message = adapter()
            .parse_message(body.to_string().as_bytes(), None)
            .unwrap();

        assert!(message.is_button());
        assert_eq!(message.button_command(), Some("btn-orders-ab12cd34ef"));
        assert_eq!(message.user_id.as_deref(), Some("42"));
        assert_eq!(message.user_name.as_deref(), Some("sam"));
    }

    #[test]
    fn test_parse_photo_keeps_largest_size() {
        let body = serde_json::json!({
            "message": {
                "message_id": 3,
                "from": { "id": 42 },
                "date": 1700000000,
                "photo": [
                    { "file_id": "small", "width": 90 },
                    { "file_id": "large", "width": 800 },
                    { "file_id": "medium", "width": 320 }
                ],
                "caption": "look"
            }
        });

        let message = adapter()
            .parse_message(body.to_string().as_bytes(), None)
            .unwrap();

        match &message.kind {
            MessageKind::Picture { file_id, text, .. } => {
                assert_eq!(file_id.as_deref(), Some("large"));
                assert_eq!(text.as_deref(), Some("look"));
            }
            other => panic!("expected picture, got {}", other.name()),
        }
    }

    #[test]
    fn test_unknown_shape_maps_to_undefined() {
        let body = serde_json::json!({ "my_chat_member": { "status": "kicked" } });
        let message = adapter()
            .parse_message(body.to_string().as_bytes(), None)
            .unwrap();
        assert!(matches!(message.kind, MessageKind::Undefined { .. }));
    }

    #[test]
    fn test_unparseable_body_maps_to_undefined() {
        let message = adapter().parse_message(b"not json at all", None).unwrap();
        assert!(matches!(message.kind, MessageKind::Undefined { .. }));
    }

    #[test]
    fn test_preprocess_promotes_matching_button_text() {
        let button = Button::new("Orders", "My orders");
        let command = button.command.clone();
        let menu = Menu::new("Home").with_buttons(vec![button]);

        let promoted = adapter().preprocess_message(
            Message::text("My orders").with_user("42"),
            Some(&menu),
        );
        assert!(promoted.is_button());
        assert_eq!(promoted.button_command(), Some(command.as_str()));

        let untouched = adapter()
            .preprocess_message(Message::text("Something else").with_user("42"), Some(&menu));
        assert!(untouched.is_text());
    }

    #[test]
    fn test_reply_keyboard_rows_of_three() {
        let buttons: Vec<KeyboardButton> = (0..4)
            .map(|i| KeyboardButton {
                text: format!("B{}", i),
                command: format!("btn-{}", i),
                is_inline: false,
            })
            .collect();

        let markup = render_reply_markup(&buttons).unwrap();
        let rows = markup["keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_array().unwrap().len(), 3);
        assert_eq!(rows[1].as_array().unwrap().len(), 1);
        assert_eq!(rows[0][0]["text"], "B0");
    }

    #[test]
    fn test_inline_keyboard_uses_callback_data() {
        let buttons = vec![KeyboardButton {
            text: "Open".into(),
            command: "btn-open-1a2b3c".into(),
            is_inline: true,
        }];

        let markup = render_reply_markup(&buttons).unwrap();
        assert_eq!(
            markup["inline_keyboard"][0][0]["callback_data"],
            "btn-open-1a2b3c"
        );
    }

    #[test]
    fn test_empty_keyboard_renders_nothing() {
        assert!(render_reply_markup(&[]).is_none());
    }
}
