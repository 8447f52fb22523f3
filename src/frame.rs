//! Push channel event frames.
//!
//! Frames arrive as JSON text over the push channel. Each carries a `key`
//! naming its kind; known kinds are parsed into a closed [`EventFrame`]
//! union and anything else becomes [`EventFrame::Unknown`] so dispatch stays
//! exhaustive.
//!
//! # Wire format
//!
//! ```json
//! {"type": "receive", "key": "social_update", "id_value": "5b0c...", "actor_name": "alice"}
//! ```
//!
//! Extra fields (such as `type`) are ignored. `id_value` may be a string or
//! an integer.

use serde::Deserialize;

/// Identifier of a content item whose interaction counts are displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
        })
    }
}

/// One inbound push channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFrame {
    /// Someone acted on the viewer's content.
    Notification {
        /// Username of the acting user.
        actor_name: String,
    },
    /// A like or comment changed an item's interaction counts.
    SocialUpdate {
        /// Username of the acting user.
        actor_name: String,
        /// Item whose counts changed.
        id_value: ItemId,
    },
    /// A new item was posted to the activity stream.
    AdditionalNews {
        /// Username of the posting user.
        actor_name: String,
    },
    /// Frame with an unrecognized `key`.
    Unknown {
        /// The unrecognized key.
        key: String,
        /// Original frame text, kept for diagnostics.
        raw: String,
    },
}

/// Errors that can occur while parsing a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame text is not a JSON object.
    InvalidJson(String),
    /// Frame has no string `key` field.
    MissingKey,
    /// A known kind is missing a required field.
    MissingField {
        /// Frame key.
        key: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "Invalid frame JSON: {msg}"),
            Self::MissingKey => write!(f, "Frame has no key"),
            Self::MissingField { key, field } => {
                write!(f, "Frame '{key}' is missing '{field}'")
            }
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Deserialize)]
struct RawFrame {
    key: Option<String>,
    actor_name: Option<String>,
    id_value: Option<ItemId>,
}

impl EventFrame {
    /// Frame key for notification events.
    pub const NOTIFICATION: &'static str = "notification";
    /// Frame key for interaction-count changes.
    pub const SOCIAL_UPDATE: &'static str = "social_update";
    /// Frame key for new activity stream items.
    pub const ADDITIONAL_NEWS: &'static str = "additional_news";

    /// Parse a frame from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the text is not a JSON object, has no
    /// `key`, or a known kind lacks a field it needs. Unrecognized keys are
    /// not an error.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        let key = raw.key.ok_or(FrameError::MissingKey)?;

        let actor = |key: &'static str| {
            raw.actor_name
                .clone()
                .ok_or(FrameError::MissingField { key, field: "actor_name" })
        };

        match key.as_str() {
            Self::NOTIFICATION => Ok(Self::Notification {
                actor_name: actor(Self::NOTIFICATION)?,
            }),
            Self::SOCIAL_UPDATE => Ok(Self::SocialUpdate {
                actor_name: actor(Self::SOCIAL_UPDATE)?,
                id_value: raw.id_value.clone().ok_or(FrameError::MissingField {
                    key: Self::SOCIAL_UPDATE,
                    field: "id_value",
                })?,
            }),
            Self::ADDITIONAL_NEWS => Ok(Self::AdditionalNews {
                actor_name: actor(Self::ADDITIONAL_NEWS)?,
            }),
            _ => Ok(Self::Unknown {
                key,
                raw: text.to_string(),
            }),
        }
    }

    /// Acting user, if the frame kind carries one.
    pub fn actor_name(&self) -> Option<&str> {
        match self {
            Self::Notification { actor_name }
            | Self::SocialUpdate { actor_name, .. }
            | Self::AdditionalNews { actor_name } => Some(actor_name),
            Self::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let frame = EventFrame::parse(
            r#"{"type": "receive", "key": "notification", "id_value": null, "actor_name": "alice"}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            EventFrame::Notification {
                actor_name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_parse_social_update_string_id() {
        let frame = EventFrame::parse(
            r#"{"key": "social_update", "id_value": "9f1c", "actor_name": "bob"}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            EventFrame::SocialUpdate {
                actor_name: "bob".to_string(),
                id_value: ItemId::from("9f1c"),
            }
        );
    }

    #[test]
    fn test_parse_social_update_integer_id() {
        let frame =
            EventFrame::parse(r#"{"key": "social_update", "id_value": 42, "actor_name": "bob"}"#)
                .unwrap();
        match frame {
            EventFrame::SocialUpdate { id_value, .. } => assert_eq!(id_value, ItemId::from(42)),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_additional_news() {
        let frame =
            EventFrame::parse(r#"{"key": "additional_news", "actor_name": "carol"}"#).unwrap();
        assert_eq!(frame.actor_name(), Some("carol"));
        assert!(matches!(frame, EventFrame::AdditionalNews { .. }));
    }

    #[test]
    fn test_parse_unknown_key_keeps_raw_text() {
        let text = r#"{"key": "unknown_kind", "actor_name": "dave"}"#;
        let frame = EventFrame::parse(text).unwrap();
        assert_eq!(
            frame,
            EventFrame::Unknown {
                key: "unknown_kind".to_string(),
                raw: text.to_string(),
            }
        );
        assert_eq!(frame.actor_name(), None);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            EventFrame::parse("not json"),
            Err(FrameError::InvalidJson(_))
        ));
        assert!(matches!(
            EventFrame::parse("[1, 2]"),
            Err(FrameError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        assert_eq!(
            EventFrame::parse(r#"{"actor_name": "alice"}"#),
            Err(FrameError::MissingKey)
        );
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert_eq!(
            EventFrame::parse(r#"{"key": "notification"}"#),
            Err(FrameError::MissingField {
                key: "notification",
                field: "actor_name"
            })
        );
        assert_eq!(
            EventFrame::parse(r#"{"key": "social_update", "actor_name": "bob"}"#),
            Err(FrameError::MissingField {
                key: "social_update",
                field: "id_value"
            })
        );
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::MissingField {
            key: "social_update",
            field: "id_value",
        };
        assert_eq!(err.to_string(), "Frame 'social_update' is missing 'id_value'");
        assert_eq!(FrameError::MissingKey.to_string(), "Frame has no key");
    }
}
