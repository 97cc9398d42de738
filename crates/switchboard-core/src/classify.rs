//! Update classification.
//!
//! [`classify`] maps a raw [`Update`] to exactly one [`Route`]: the
//! category the dispatcher resolves through the registry, plus the
//! routing key where the category has one. The ladder is evaluated top
//! to bottom and the first match wins; attachment categories are
//! mutually exclusive in practice (an update carries at most one
//! attachment), and text is checked last so that caption text alongside
//! media never outranks the attachment.
//!
//! The universal/any bypass is not part of classification — the
//! dispatcher checks it before calling [`classify`].

use crate::error::{DispatchError, DispatchResult};
use crate::kind::Kind;
use crate::update::{ChatId, Update};

/// The routing decision for one update.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Callback query; resolved by prefix match against the data.
    Callback {
        /// The callback data to prefix-match.
        data: String,
    },
    /// Inline query; resolved by prefix match, scoped by the user.
    Inline {
        /// The query text to prefix-match.
        query: String,
        /// The querying user's id, used as the binding scope.
        user: ChatId,
    },
    /// A media attachment; single unnamed binding per scope.
    Attachment(Kind),
    /// Non-empty text; the dispatcher tries the command namespace first
    /// and falls back to the plain-text binding.
    Text(String),
}

/// Classifies an update into its [`Route`].
///
/// Priority: callback query → inline query → no-message error → photo →
/// file → contact → sticker → audio → video → video note → voice →
/// location → venue → non-empty text. An update with no recognizable
/// payload fails with [`DispatchError::NoMessage`], which is distinct
/// from "no handler bound".
pub fn classify(update: &Update) -> DispatchResult<Route> {
    if let Some(callback) = &update.callback_query {
        return Ok(Route::Callback {
            data: callback.data.clone().unwrap_or_default(),
        });
    }
    if let Some(inline) = &update.inline_query {
        return Ok(Route::Inline {
            query: inline.query.clone(),
            user: inline.from.id,
        });
    }

    let Some(message) = &update.message else {
        return Err(DispatchError::NoMessage);
    };

    if message.photo.is_some() {
        return Ok(Route::Attachment(Kind::Photo));
    }
    if message.document.is_some() {
        return Ok(Route::Attachment(Kind::File));
    }
    if message.contact.is_some() {
        return Ok(Route::Attachment(Kind::Contact));
    }
    if message.sticker.is_some() {
        return Ok(Route::Attachment(Kind::Sticker));
    }
    if message.audio.is_some() {
        return Ok(Route::Attachment(Kind::Audio));
    }
    if message.video.is_some() {
        return Ok(Route::Attachment(Kind::Video));
    }
    if message.video_note.is_some() {
        return Ok(Route::Attachment(Kind::VideoNote));
    }
    if message.voice.is_some() {
        return Ok(Route::Attachment(Kind::Voice));
    }
    if message.location.is_some() {
        return Ok(Route::Attachment(Kind::Location));
    }
    if message.venue.is_some() {
        return Ok(Route::Attachment(Kind::Venue));
    }

    match message.text.as_deref() {
        Some(text) if !text.is_empty() => Ok(Route::Text(text.to_string())),
        _ => Err(DispatchError::NoMessage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::{
        CallbackQuery, Chat, InlineQuery, Location, Message, PhotoSize, Update, User, Venue,
    };

    fn message_update(message: Message) -> Update {
        Update {
            message: Some(message),
            ..Update::default()
        }
    }

    #[test]
    fn callback_beats_everything() {
        let update = Update {
            callback_query: Some(CallbackQuery {
                id: "1".into(),
                data: Some("confirm_9".into()),
                ..CallbackQuery::default()
            }),
            message: Some(Message {
                chat: Chat { id: 1 },
                text: Some("/start".into()),
                ..Message::default()
            }),
            ..Update::default()
        };
        assert_eq!(
            classify(&update).unwrap(),
            Route::Callback {
                data: "confirm_9".into()
            }
        );
    }

    #[test]
    fn inline_routes_to_user_scope() {
        let update = Update {
            inline_query: Some(InlineQuery {
                id: "1".into(),
                from: User {
                    id: 77,
                    username: None,
                },
                query: "weather london".into(),
            }),
            ..Update::default()
        };
        assert_eq!(
            classify(&update).unwrap(),
            Route::Inline {
                query: "weather london".into(),
                user: 77
            }
        );
    }

    #[test]
    fn attachment_beats_caption_text() {
        let update = message_update(Message {
            chat: Chat { id: 1 },
            caption: Some("nice view".into()),
            photo: Some(vec![PhotoSize::default()]),
            ..Message::default()
        });
        assert_eq!(classify(&update).unwrap(), Route::Attachment(Kind::Photo));
    }

    #[test]
    fn venue_routes_as_venue_despite_inner_location() {
        // A venue payload carries a location struct of its own, but the
        // ladder only inspects the message's own location field.
        let update = message_update(Message {
            chat: Chat { id: 1 },
            venue: Some(Venue {
                location: Location {
                    latitude: 1.0,
                    longitude: 2.0,
                },
                title: "Cafe".into(),
                address: "Main st".into(),
            }),
            ..Message::default()
        });
        assert_eq!(classify(&update).unwrap(), Route::Attachment(Kind::Venue));
    }

    #[test]
    fn bare_text_routes_as_text() {
        let update = Update::from_text(5, "hello");
        assert_eq!(classify(&update).unwrap(), Route::Text("hello".into()));
    }

    #[test]
    fn empty_update_is_no_message() {
        assert!(matches!(
            classify(&Update::default()),
            Err(DispatchError::NoMessage)
        ));
    }

    #[test]
    fn empty_text_is_no_message() {
        let update = Update::from_text(5, "");
        assert!(matches!(
            classify(&update),
            Err(DispatchError::NoMessage)
        ));
    }
}
