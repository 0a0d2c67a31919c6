use serde_json::Value;

/// Reaction applied when the workflow has no reply for the user.
pub const REACTION_EMOJI: &str = "👍";

/// What to do with the originating message once the webhook has seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    /// Send this text back to the originating chat.
    Reply(String),
    /// Acknowledge the message with the fixed emoji reaction.
    React,
}

/// Decide between a textual reply and the reaction fallback.
///
/// Only a JSON object with a non-empty string `reply` field produces a
/// reply; everything else, including a failed webhook call, falls through
/// to the reaction.
pub fn route(response: Option<&Value>) -> ReplyAction {
    if let Some(Value::Object(fields)) = response {
        if let Some(Value::String(reply)) = fields.get("reply") {
            if !reply.is_empty() {
                return ReplyAction::Reply(reply.clone());
            }
        }
    }
    ReplyAction::React
}
