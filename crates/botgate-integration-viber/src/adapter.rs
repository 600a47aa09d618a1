//! MessengerAdapter implementation for Viber
//!
//! Every inbound callback body is authenticated against the
//! `X-Viber-Content-Signature` header (HMAC-SHA256 keyed by the auth
//! token) before parsing. Button presses arrive as text messages carrying
//! their `btn-` command, so no contextual preprocessing is needed.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use botgate::{
    GatewayError, KeyboardButton, Message, MessageKind, MessengerAdapter, PlatformType,
    ProfileInfo, SendOutcome,
};

use crate::client::ViberClient;
use crate::config::ViberConfig;

type HmacSha256 = Hmac<Sha256>;

/// Viber integration implementing the MessengerAdapter port.
pub struct ViberAdapter {
    client: ViberClient,
    config: ViberConfig,
}

impl ViberAdapter {
    pub fn new(config: ViberConfig) -> Result<Self, GatewayError> {
        let client = ViberClient::new(&config)?;
        Ok(Self { client, config })
    }

    fn sender(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.config.name,
            "avatar": self.config.avatar,
        })
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        let expected = content_signature(&self.config.token, body);
        expected.eq_ignore_ascii_case(signature)
    }

    fn convert_callback(&self, callback: Callback) -> Message {
        let mut message = match callback.event.as_deref() {
            Some("message") => {
                let sender_id = callback.sender.as_ref().map(|u| u.id.clone());
                let sender_name = callback.sender.as_ref().and_then(|u| u.name.clone());
                let mut converted = match callback.message {
                    Some(payload) => convert_message_payload(payload),
                    None => Message::undefined(None),
                };
                if let Some(id) = sender_id {
                    converted = converted.with_user(id);
                }
                if let Some(name) = sender_name {
                    converted = converted.with_user_name(name);
                }
                converted
            }
            Some("conversation_started") => {
                let mut started = Message::start(callback.context);
                if let Some(user) = &callback.user {
                    started = started.with_user(user.id.clone());
                    if let Some(name) = &user.name {
                        started = started.with_user_name(name.clone());
                    }
                }
                started
            }
            Some("subscribed") => {
                let mut subscribed = Message::subscribed();
                if let Some(user) = &callback.user {
                    subscribed = subscribed.with_user(user.id.clone());
                    if let Some(name) = &user.name {
                        subscribed = subscribed.with_user_name(name.clone());
                    }
                }
                subscribed
            }
            Some("unsubscribed") => {
                let mut unsubscribed = Message::unsubscribed();
                if let Some(user_id) = &callback.user_id {
                    unsubscribed = unsubscribed.with_user(user_id.clone());
                }
                unsubscribed
            }
            Some("delivered") => {
                let mut delivered = Message::delivered(
                    callback
                        .message_token
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                );
                if let Some(user_id) = &callback.user_id {
                    delivered = delivered.with_user(user_id.clone());
                }
                delivered
            }
            Some("seen") => {
                let mut seen = Message::seen(
                    callback
                        .message_token
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                );
                if let Some(user_id) = &callback.user_id {
                    seen = seen.with_user(user_id.clone());
                }
                seen
            }
            Some("failed") => {
                warn!(desc = ?callback.desc, "viber client failed receiving message");
                Message::failed(callback.desc)
            }
            Some("webhook") => Message::webhook(),
            other => {
                warn!(event = ?other, "unrecognized viber event");
                Message::undefined(other.map(|s| s.to_string()))
            }
        };

        if message.id.is_none() {
            if let Some(token) = callback.message_token {
                message = message.with_id(token.to_string());
            }
        }
        if let Some(timestamp) = callback.timestamp {
            message = message.with_timestamp(timestamp);
        }
        message.with_platform(PlatformType::Viber)
    }

    async fn send_one(&self, receiver: &str, message: Message) -> Result<String, GatewayError> {
        let keyboard = render_keyboard(message.buttons.as_deref().unwrap_or_default());

        let mut payload = serde_json::json!({
            "receiver": receiver,
            "min_api_version": 6,
            "sender": self.sender(),
        });

        match &message.kind {
            MessageKind::Text { text } => {
                payload["type"] = "text".into();
                payload["text"] = serde_json::json!(text);
            }
            // Viber has no keyboard-only message type either; ride the
            // keyboard on a zero-width space.
            MessageKind::Keyboard => {
                payload["type"] = "text".into();
                payload["text"] = serde_json::json!("\u{200B}");
            }
            MessageKind::Button { command } => {
                payload["type"] = "text".into();
                payload["text"] = serde_json::json!(command);
            }
            MessageKind::Sticker { file_id } => {
                payload["type"] = "sticker".into();
                payload["sticker_id"] = match file_id.parse::<i64>() {
                    Ok(id) => serde_json::json!(id),
                    Err(_) => serde_json::json!(file_id),
                };
            }
            MessageKind::Picture {
                file_url, text, ..
            } => {
                payload["type"] = "picture".into();
                payload["media"] = serde_json::json!(file_url);
                payload["text"] = serde_json::json!(text.clone().unwrap_or_default());
            }
            MessageKind::Video {
                file_url,
                file_size,
                text,
                ..
            } => {
                payload["type"] = "video".into();
                payload["media"] = serde_json::json!(file_url);
                payload["size"] = serde_json::json!(file_size.unwrap_or(0));
                payload["text"] = serde_json::json!(text.clone().unwrap_or_default());
            }
            MessageKind::Audio {
                file_url, file_size, ..
            }
            | MessageKind::File {
                file_url, file_size, ..
            } => {
                payload["type"] = "file".into();
                payload["media"] = serde_json::json!(file_url);
                payload["size"] = serde_json::json!(file_size.unwrap_or(0));
                if let MessageKind::File { file_name, .. } = &message.kind {
                    payload["file_name"] =
                        serde_json::json!(file_name.clone().unwrap_or_default());
                }
            }
            MessageKind::Contact { name, phone } => {
                payload["type"] = "contact".into();
                payload["contact"] = serde_json::json!({
                    "name": name.clone().unwrap_or_default(),
                    "phone_number": phone.clone().unwrap_or_default(),
                });
            }
            MessageKind::Url { url } => {
                payload["type"] = "url".into();
                payload["media"] = serde_json::json!(url);
            }
            MessageKind::Location { lat, lon } => {
                payload["type"] = "location".into();
                payload["location"] = serde_json::json!({ "lat": lat, "lon": lon });
            }
            MessageKind::RichMedia { media, alt_text } => {
                payload["type"] = "rich_media".into();
                payload["rich_media"] = media.clone();
                payload["alt_text"] =
                    serde_json::json!(alt_text.clone().unwrap_or_default());
            }
            other => {
                return Err(GatewayError::Validation(format!(
                    "cannot send {} message through viber",
                    other.name()
                )))
            }
        }

        if let Some(keyboard) = keyboard {
            payload["keyboard"] = keyboard;
        }

        self.client.send_message(payload).await
    }
}

#[async_trait]
impl MessengerAdapter for ViberAdapter {
    fn platform(&self) -> PlatformType {
        PlatformType::Viber
    }

    async fn enable_webhook(&self, url: &str) -> Result<(), GatewayError> {
        debug!(url, "registering Viber webhook");
        self.client.set_webhook(url).await
    }

    async fn disable_webhook(&self) -> Result<(), GatewayError> {
        self.client.set_webhook("").await
    }

    async fn account_info(&self) -> Result<ProfileInfo, GatewayError> {
        let info = self.client.get_account_info().await?;
        Ok(ProfileInfo {
            id: info.get("id").and_then(|v| v.as_str()).map(String::from),
            username: info.get("name").and_then(|v| v.as_str()).map(String::from),
            avatar: info.get("icon").and_then(|v| v.as_str()).map(String::from),
            info,
        })
    }

    async fn user_info(&self, user_id: &str) -> Result<ProfileInfo, GatewayError> {
        let envelope = self.client.get_user_details(user_id).await?;
        let user = envelope.get("user").cloned().unwrap_or(envelope);
        Ok(ProfileInfo {
            id: user.get("id").and_then(|v| v.as_str()).map(String::from),
            username: user.get("name").and_then(|v| v.as_str()).map(String::from),
            avatar: user.get("avatar").and_then(|v| v.as_str()).map(String::from),
            info: user,
        })
    }

    fn parse_message(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Message, GatewayError> {
        let Some(signature) = signature else {
            return Err(GatewayError::Verification(
                "missing viber content signature".into(),
            ));
        };
        if !self.verify_signature(body, signature) {
            return Err(GatewayError::Verification(format!(
                "viber content signature mismatch: {}",
                signature
            )));
        }

        match serde_json::from_slice::<Callback>(body) {
            Ok(callback) => Ok(self.convert_callback(callback)),
            Err(error) => {
                debug!(%error, "unparseable viber callback");
                Ok(
                    Message::undefined(Some(String::from_utf8_lossy(body).into_owned()))
                        .with_platform(PlatformType::Viber),
                )
            }
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

    fn welcome_message(&self, text: &str) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "sender": self.sender(),
            "type": "text",
            "text": text,
        }))
    }
}

/// HMAC-SHA256 of the raw body keyed by the auth token, hex-encoded:
/// the value Viber sends in `X-Viber-Content-Signature`.
pub(crate) fn content_signature(token: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(token.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn convert_message_payload(payload: MessagePayload) -> Message {
    match payload.message_type.as_deref() {
        Some("text") => {
            let text = payload.text.unwrap_or_default();
            // Button presses echo their command back as plain text.
            if text.starts_with("btn-") {
                Message::button(text)
            } else {
                Message::text(text)
            }
        }
        Some("picture") => {
            Message::picture(payload.media, None, payload.text).unwrap_or_else(|_| {
                Message::undefined(Some("picture without media".into()))
            })
        }
        Some("video") => {
            Message::video(payload.media, None, payload.size, payload.text)
                .unwrap_or_else(|_| Message::undefined(Some("video without media".into())))
        }
        Some("file") => Message::file(
            payload.media,
            None,
            payload.size,
            payload.file_name,
            None,
        )
        .unwrap_or_else(|_| Message::undefined(Some("file without media".into()))),
        Some("sticker") => Message::sticker(
            payload
                .sticker_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ),
        Some("contact") => {
            let contact = payload.contact.unwrap_or_default();
            Message::contact(contact.name, contact.phone_number)
        }
        Some("url") => Message::url(payload.media.unwrap_or_default()),
        Some("location") => {
            let location = payload.location.unwrap_or_default();
            Message::location(location.lat, location.lon)
        }
        Some("rich_media") => Message::rich_media(
            payload.rich_media.unwrap_or(serde_json::Value::Null),
            payload.text,
        ),
        other => Message::undefined(other.map(|s| s.to_string())),
    }
}

/// Rich keyboard rendered from the attached buttons, in the account's
/// menu order.
fn render_keyboard(buttons: &[KeyboardButton]) -> Option<serde_json::Value> {
    if buttons.is_empty() {
        return None;
    }

    let rendered: Vec<serde_json::Value> = buttons
        .iter()
        .map(|button| {
            serde_json::json!({
                "Columns": 2,
                "Rows": 1,
                "BgColor": "#aaaaaa",
                "ActionType": "reply",
                "ActionBody": button.command,
                "Text": format!("<font color=\"#131313\"><b>{}</b></font>", button.text),
                "TextVAlign": "middle",
                "TextHAlign": "center",
                "TextOpacity": 60,
                "TextSize": "large",
                "TextPaddings": [12, 8, 8, 20],
            })
        })
        .collect();

    Some(serde_json::json!({
        "Type": "keyboard",
        "BgColor": "#ffffff",
        "Buttons": rendered,
    }))
}

// --- Wire types (Viber callback payload) ---

#[derive(Debug, Deserialize)]
struct Callback {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    message_token: Option<i64>,
    #[serde(default)]
    sender: Option<CallbackUser>,
    #[serde(default)]
    user: Option<CallbackUser>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    message: Option<MessagePayload>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    desc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(rename = "type", default)]
    message_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    media: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    sticker_id: Option<i64>,
    #[serde(default)]
    contact: Option<ContactPayload>,
    #[serde(default)]
    location: Option<LocationPayload>,
    #[serde(default)]
    rich_media: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LocationPayload {
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}
