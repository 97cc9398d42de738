//! Event kind classification for the Switchboard framework.
//!
//! [`Kind`] is the closed set of categories an inbound update can resolve
//! to. Every handler binding is keyed by a kind, and the persistent
//! storage adapter keys external rows by the kind's stable string tag,
//! so the tags are part of the storage contract and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The category of an inbound update.
///
/// Kinds fall into three groups:
///
/// - **Named bindings** ([`Command`](Kind::Command),
///   [`CallbackQuery`](Kind::CallbackQuery), [`InlineQuery`](Kind::InlineQuery)):
///   the binding name is a command token or a prefix.
/// - **Unnamed bindings** (all media kinds and [`PlainText`](Kind::PlainText)):
///   a single binding per chat scope, registered under the empty name.
/// - **[`Any`](Kind::Any)**: the universal catch-all that preempts all
///   other routing while bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// A slash command (`/start`) or keyboard-button text; one shared
    /// namespace distinguished only by the leading `/`.
    Command,
    /// Non-command text with no attachment.
    #[serde(rename = "plain")]
    PlainText,
    /// Photo attachment.
    Photo,
    /// Document attachment.
    #[serde(rename = "file")]
    File,
    /// Shared contact.
    Contact,
    /// Sticker.
    Sticker,
    /// Audio attachment.
    Audio,
    /// Video attachment.
    Video,
    /// Round video note.
    VideoNote,
    /// Voice recording.
    Voice,
    /// Geographic location.
    Location,
    /// Venue (location with title and address).
    Venue,
    /// Callback query, matched by data prefix.
    CallbackQuery,
    /// Inline query, matched by query prefix and scoped by user.
    InlineQuery,
    /// Universal handler, invoked for every update while bound.
    Any,
}

impl Kind {
    /// All kinds, in classifier priority order for the message ladder.
    pub const ALL: [Kind; 15] = [
        Kind::Command,
        Kind::PlainText,
        Kind::Photo,
        Kind::File,
        Kind::Contact,
        Kind::Sticker,
        Kind::Audio,
        Kind::Video,
        Kind::VideoNote,
        Kind::Voice,
        Kind::Location,
        Kind::Venue,
        Kind::CallbackQuery,
        Kind::InlineQuery,
        Kind::Any,
    ];

    /// Returns the stable string tag used by persistent stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Command => "command",
            Kind::PlainText => "plain",
            Kind::Photo => "photo",
            Kind::File => "file",
            Kind::Contact => "contact",
            Kind::Sticker => "sticker",
            Kind::Audio => "audio",
            Kind::Video => "video",
            Kind::VideoNote => "video_note",
            Kind::Voice => "voice",
            Kind::Location => "location",
            Kind::Venue => "venue",
            Kind::CallbackQuery => "callback_query",
            Kind::InlineQuery => "inline_query",
            Kind::Any => "any",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Error returned when parsing an unrecognized kind tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind tag '{0}'")]
pub struct UnknownKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>(), Ok(kind));
        }
    }

    #[test]
    fn tags_match_store_schema() {
        assert_eq!(Kind::PlainText.as_str(), "plain");
        assert_eq!(Kind::File.as_str(), "file");
        assert_eq!(Kind::VideoNote.as_str(), "video_note");
        assert_eq!(Kind::CallbackQuery.as_str(), "callback_query");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!("gif".parse::<Kind>().is_err());
    }

    #[test]
    fn serde_uses_tags() {
        let json = serde_json::to_string(&Kind::PlainText).unwrap();
        assert_eq!(json, "\"plain\"");
        let kind: Kind = serde_json::from_str("\"video_note\"").unwrap();
        assert_eq!(kind, Kind::VideoNote);
    }
}
