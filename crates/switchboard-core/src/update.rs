//! Inbound update model.
//!
//! An [`Update`] is the raw event delivered by the chat platform's wire
//! client (long polling or webhook — both are external collaborators).
//! The model is deliberately narrow: only the fields the dispatch core
//! inspects are present, every payload is optional, and an update carries
//! at most one attachment in practice.
//!
//! All types deserialize from the platform's JSON with `serde`, so an
//! ingestion collaborator can hand raw wire payloads straight to
//! [`Update`].

use serde::{Deserialize, Serialize};

/// Identifier of a conversation. `0` is the wildcard scope that applies
/// to all chats.
pub type ChatId = i64;

/// The wildcard chat scope.
pub const ANY_CHAT: ChatId = 0;

// ============================================================================
// Update
// ============================================================================

/// A raw inbound event from the chat platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    /// Incoming message, if this update carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Callback query from an inline keyboard button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// Inline query typed after the bot's username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
}

impl Update {
    /// Resolves the chat scope of this update.
    ///
    /// The scope is the message's chat, or the chat of the message a
    /// callback query originated from. Updates with no resolvable chat
    /// (inline queries included) report the wildcard scope `0`.
    pub fn chat_id(&self) -> ChatId {
        if let Some(message) = &self.message {
            return message.chat.id;
        }
        if let Some(callback) = &self.callback_query {
            if let Some(message) = &callback.message {
                return message.chat.id;
            }
        }
        ANY_CHAT
    }

    /// Convenience constructor for a text message update.
    pub fn from_text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            message: Some(Message {
                chat: Chat { id: chat_id },
                text: Some(text.into()),
                ..Message::default()
            }),
            ..Self::default()
        }
    }
}

// ============================================================================
// Message and attachments
// ============================================================================

/// A chat the update belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: ChatId,
}

/// A user referenced by an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Username, if the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// An inbound chat message. Carries at most one attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// The chat this message was sent in.
    pub chat: Chat,
    /// The sender, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Text content. Empty or absent for pure media messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption accompanying a media attachment. Never routes on its
    /// own — the attachment kind wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Photo attachment (available resolutions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    /// Document attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    /// Shared contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// Sticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
    /// Audio attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    /// Video attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    /// Round video note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_note: Option<VideoNote>,
    /// Voice recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    /// Geographic location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
}

impl Message {
    /// Extracts the command token from this message's text.
    ///
    /// Returns the slash-prefixed token up to the first whitespace, with
    /// any `@botname` mention suffix stripped: `"/start@mybot extra"`
    /// yields `"/start"`. Returns `None` for non-command text.
    pub fn bot_command(&self) -> Option<&str> {
        command_token(self.text.as_deref()?)
    }

    /// Returns the text following the command token, if any.
    pub fn command_arguments(&self) -> Option<&str> {
        self.bot_command()?;
        let text = self.text.as_deref()?;
        let rest = text.split_once(char::is_whitespace)?.1.trim_start();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Extracts the command lookup key from text, if it is a command: the
/// slash-prefixed token up to the first whitespace, with any `@botname`
/// mention suffix stripped (`"/start@mybot extra"` → `"/start"`).
pub(crate) fn command_token(text: &str) -> Option<&str> {
    if !text.starts_with('/') {
        return None;
    }
    let token = text.split_whitespace().next().unwrap_or(text);
    Some(token.split('@').next().unwrap_or(token))
}

/// One resolution of a photo attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// A generic file attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// A shared phone contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
}

/// A sticker attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// An audio track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audio {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

/// A video attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Video {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

/// A round video note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoNote {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

/// A voice recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Voice {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

/// A geographic location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// A venue: a location with a title and address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
}

// ============================================================================
// Queries
// ============================================================================

/// A callback query fired by an inline keyboard button.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier.
    pub id: String,
    /// The user who pressed the button.
    #[serde(default)]
    pub from: User,
    /// The message the button was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Opaque data attached to the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An inline query typed after the bot's username.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique query identifier.
    pub id: String,
    /// The querying user. Inline bindings are scoped by this user's id.
    #[serde(default)]
    pub from: User,
    /// The query text.
    #[serde(default)]
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_prefers_message_chat() {
        let update = Update::from_text(42, "hello");
        assert_eq!(update.chat_id(), 42);
    }

    #[test]
    fn chat_id_falls_back_to_callback_origin() {
        let update = Update {
            callback_query: Some(CallbackQuery {
                id: "1".into(),
                message: Some(Message {
                    chat: Chat { id: -100 },
                    ..Message::default()
                }),
                data: Some("confirm_1".into()),
                ..CallbackQuery::default()
            }),
            ..Update::default()
        };
        assert_eq!(update.chat_id(), -100);
    }

    #[test]
    fn chat_id_defaults_to_wildcard() {
        assert_eq!(Update::default().chat_id(), ANY_CHAT);
    }

    #[test]
    fn bot_command_strips_mention_and_arguments() {
        let update = Update::from_text(1, "/start@mybot referral42");
        let message = update.message.unwrap();
        assert_eq!(message.bot_command(), Some("/start"));
        assert_eq!(message.command_arguments(), Some("referral42"));
    }

    #[test]
    fn bot_command_rejects_plain_text() {
        let update = Update::from_text(1, "start");
        assert_eq!(update.message.unwrap().bot_command(), None);
    }

    #[test]
    fn command_token_extraction() {
        assert_eq!(command_token("/start@mybot extra"), Some("/start"));
        assert_eq!(command_token("/help"), Some("/help"));
        assert_eq!(command_token("🔔 Subscribe"), None);
    }

    #[test]
    fn deserializes_from_wire_json() {
        let raw = r#"{
            "message": {
                "chat": {"id": 7},
                "from": {"id": 99, "username": "alice"},
                "caption": "look",
                "photo": [{"file_id": "abc", "width": 90, "height": 60}]
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 7);
        assert_eq!(message.photo.as_ref().map(Vec::len), Some(1));
        assert_eq!(message.caption.as_deref(), Some("look"));
    }
}
