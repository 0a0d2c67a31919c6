use chrono::{DateTime, Utc};
use serde::Serialize;
use teloxide::types::{FileId, Message};

/// Sender identity as reported by Telegram. Username and last name are
/// optional on the platform side and forwarded as null when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sender {
    pub user_id: u64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// An update the bridge relays. Anything else (stickers, edits, joins)
/// is dropped before it reaches a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Command {
        command: String,
        message_id: i32,
        chat_id: i64,
        from: Sender,
        timestamp: DateTime<Utc>,
    },
    Text {
        message_id: i32,
        chat_id: i64,
        text: String,
        from: Sender,
        timestamp: DateTime<Utc>,
    },
    Photo {
        message_id: i32,
        chat_id: i64,
        /// File ids in Telegram's order, smallest resolution first.
        file_ids: Vec<FileId>,
        caption: Option<String>,
        from: Sender,
        timestamp: DateTime<Utc>,
    },
    Document {
        message_id: i32,
        chat_id: i64,
        file_id: FileId,
        file_name: Option<String>,
        mime_type: Option<String>,
        caption: Option<String>,
        from: Sender,
        timestamp: DateTime<Utc>,
    },
}

/// The JSON body POSTed to the n8n webhook. Field names and the `type`
/// discriminator are the wire contract the workflow side depends on;
/// optional fields serialize as null rather than being omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundPayload {
    Command {
        command: String,
        #[serde(flatten)]
        from: Sender,
        timestamp: DateTime<Utc>,
    },
    Message {
        message_id: i32,
        text: String,
        #[serde(flatten)]
        from: Sender,
        chat_id: i64,
        timestamp: DateTime<Utc>,
    },
    Photo {
        message_id: i32,
        photo_file_id: FileId,
        caption: Option<String>,
        #[serde(flatten)]
        from: Sender,
        chat_id: i64,
        timestamp: DateTime<Utc>,
    },
    Document {
        message_id: i32,
        document_file_id: FileId,
        document_name: Option<String>,
        document_mime_type: Option<String>,
        caption: Option<String>,
        #[serde(flatten)]
        from: Sender,
        chat_id: i64,
        timestamp: DateTime<Utc>,
    },
}

impl InboundEvent {
    /// Classify a Telegram message into a relayed event.
    ///
    /// Returns `None` for messages without a sender and for media kinds
    /// the bridge does not forward.
    pub fn from_message(msg: &Message) -> Option<InboundEvent> {
        let user = msg.from.as_ref()?;
        let from = Sender {
            user_id: user.id.0,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };
        let message_id = msg.id.0;
        let chat_id = msg.chat.id.0;
        let timestamp = msg.date;

        if let Some(text) = msg.text() {
            if let Some(command) = parse_command(text) {
                return Some(InboundEvent::Command {
                    command: command.to_string(),
                    message_id,
                    chat_id,
                    from,
                    timestamp,
                });
            }
            return Some(InboundEvent::Text {
                message_id,
                chat_id,
                text: text.to_string(),
                from,
                timestamp,
            });
        }

        if let Some(sizes) = msg.photo() {
            if sizes.is_empty() {
                return None;
            }
            return Some(InboundEvent::Photo {
                message_id,
                chat_id,
                file_ids: sizes.iter().map(|size| size.file.id.clone()).collect(),
                caption: msg.caption().map(str::to_string),
                from,
                timestamp,
            });
        }

        if let Some(document) = msg.document() {
            return Some(InboundEvent::Document {
                message_id,
                chat_id,
                file_id: document.file.id.clone(),
                file_name: document.file_name.clone(),
                mime_type: document.mime_type.as_ref().map(|mime| mime.to_string()),
                caption: msg.caption().map(str::to_string),
                from,
                timestamp,
            });
        }

        None
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Command { .. } => "command",
            InboundEvent::Text { .. } => "message",
            InboundEvent::Photo { .. } => "photo",
            InboundEvent::Document { .. } => "document",
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            InboundEvent::Command { chat_id, .. }
            | InboundEvent::Text { chat_id, .. }
            | InboundEvent::Photo { chat_id, .. }
            | InboundEvent::Document { chat_id, .. } => *chat_id,
        }
    }

    pub fn message_id(&self) -> i32 {
        match self {
            InboundEvent::Command { message_id, .. }
            | InboundEvent::Text { message_id, .. }
            | InboundEvent::Photo { message_id, .. }
            | InboundEvent::Document { message_id, .. } => *message_id,
        }
    }

    pub fn sender(&self) -> &Sender {
        match self {
            InboundEvent::Command { from, .. }
            | InboundEvent::Text { from, .. }
            | InboundEvent::Photo { from, .. }
            | InboundEvent::Document { from, .. } => from,
        }
    }
}

/// Extract the command name from a leading-slash message, with any
/// `@botname` suffix and arguments stripped.
fn parse_command(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('/')?;
    let name = rest.split_whitespace().next()?;
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(name)
}

/// Map an inbound event to its webhook payload.
///
/// Commands deliberately carry no message or chat id; photos take the
/// file id of the last (highest resolution) size variant.
pub fn normalize(event: &InboundEvent) -> OutboundPayload {
    match event {
        InboundEvent::Command {
            command,
            from,
            timestamp,
            ..
        } => OutboundPayload::Command {
            command: command.clone(),
            from: from.clone(),
            timestamp: *timestamp,
        },
        InboundEvent::Text {
            message_id,
            chat_id,
            text,
            from,
            timestamp,
        } => OutboundPayload::Message {
            message_id: *message_id,
            text: text.clone(),
            from: from.clone(),
            chat_id: *chat_id,
            timestamp: *timestamp,
        },
        InboundEvent::Photo {
            message_id,
            chat_id,
            file_ids,
            caption,
            from,
            timestamp,
        } => OutboundPayload::Photo {
            message_id: *message_id,
            photo_file_id: file_ids
                .last()
                .cloned()
                .unwrap_or_else(|| FileId(String::new())),
            caption: caption.clone(),
            from: from.clone(),
            chat_id: *chat_id,
            timestamp: *timestamp,
        },
        InboundEvent::Document {
            message_id,
            chat_id,
            file_id,
            file_name,
            mime_type,
            caption,
            from,
            timestamp,
        } => OutboundPayload::Document {
            message_id: *message_id,
            document_file_id: file_id.clone(),
            document_name: file_name.clone(),
            document_mime_type: mime_type.clone(),
            caption: caption.clone(),
            from: from.clone(),
            chat_id: *chat_id,
            timestamp: *timestamp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sender() -> Sender {
        Sender {
            user_id: 123456789,
            username: Some("testuser".to_string()),
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_text_message_payload() {
        let event = InboundEvent::Text {
            message_id: 1,
            chat_id: 987654321,
            text: "Hello bot".to_string(),
            from: sender(),
            timestamp: timestamp(),
        };

        let value = serde_json::to_value(normalize(&event)).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["message_id"], 1);
        assert_eq!(value["text"], "Hello bot");
        assert_eq!(value["user_id"], 123456789);
        assert_eq!(value["username"], "testuser");
        assert_eq!(value["first_name"], "Test");
        assert_eq!(value["last_name"], "User");
        assert_eq!(value["chat_id"], 987654321_i64);
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_command_payload_has_no_message_or_chat_id() {
        let event = InboundEvent::Command {
            command: "start".to_string(),
            message_id: 7,
            chat_id: 987654321,
            from: sender(),
            timestamp: timestamp(),
        };

        let value = serde_json::to_value(normalize(&event)).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["command"], "start");
        assert_eq!(value["user_id"], 123456789);
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("message_id"));
        assert!(!object.contains_key("chat_id"));
    }

    #[test]
    fn test_photo_takes_last_size_variant() {
        for len in 1..=4 {
            let file_ids: Vec<FileId> =
                (0..len).map(|i| FileId(format!("photo-{i}"))).collect();
            let expected = file_ids.last().cloned().unwrap();

            let event = InboundEvent::Photo {
                message_id: 2,
                chat_id: 987654321,
                file_ids,
                caption: Some("Test photo".to_string()),
                from: sender(),
                timestamp: timestamp(),
            };

            match normalize(&event) {
                OutboundPayload::Photo { photo_file_id, .. } => {
                    assert_eq!(photo_file_id, expected);
                }
                other => panic!("expected photo payload, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_absent_caption_serializes_as_null() {
        let event = InboundEvent::Photo {
            message_id: 2,
            chat_id: 987654321,
            file_ids: vec![FileId("photo123".to_string())],
            caption: None,
            from: sender(),
            timestamp: timestamp(),
        };

        let value = serde_json::to_value(normalize(&event)).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("caption"));
        assert_eq!(value["caption"], serde_json::Value::Null);
    }

    #[test]
    fn test_document_payload_carries_file_metadata() {
        let event = InboundEvent::Document {
            message_id: 3,
            chat_id: 987654321,
            file_id: FileId("doc123".to_string()),
            file_name: Some("test_document.pdf".to_string()),
            mime_type: Some("application/pdf".to_string()),
            caption: Some("Test document caption".to_string()),
            from: sender(),
            timestamp: timestamp(),
        };

        let value = serde_json::to_value(normalize(&event)).unwrap();
        assert_eq!(value["type"], "document");
        assert_eq!(value["document_file_id"], "doc123");
        assert_eq!(value["document_name"], "test_document.pdf");
        assert_eq!(value["document_mime_type"], "application/pdf");
        assert_eq!(value["caption"], "Test document caption");
    }

    #[test]
    fn test_missing_sender_names_serialize_as_null() {
        let event = InboundEvent::Text {
            message_id: 4,
            chat_id: 987654321,
            text: "hi".to_string(),
            from: Sender {
                user_id: 42,
                username: None,
                first_name: "Test".to_string(),
                last_name: None,
            },
            timestamp: timestamp(),
        };

        let value = serde_json::to_value(normalize(&event)).unwrap();
        assert_eq!(value["username"], serde_json::Value::Null);
        assert_eq!(value["last_name"], serde_json::Value::Null);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let event = InboundEvent::Text {
            message_id: 5,
            chat_id: 987654321,
            text: "same in, same out".to_string(),
            from: sender(),
            timestamp: timestamp(),
        };

        assert_eq!(normalize(&event), normalize(&event));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/start"), Some("start"));
        assert_eq!(parse_command("/start@MyBridgeBot"), Some("start"));
        assert_eq!(parse_command("/start now please"), Some("start"));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
    }
}
