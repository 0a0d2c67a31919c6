use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReactionType};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::SessionConfig;
use crate::event::{normalize, InboundEvent};
use crate::router::{route, ReplyAction, REACTION_EMOJI};
use crate::webhook::WebhookClient;

const WELCOME_MESSAGE: &str = "Hello! I'm your n8n bridge bot. \
     Send me any message and I'll forward it to your n8n workflow.";

/// Per-session state injected into the handlers. Each session owns its
/// webhook client; nothing is shared between sessions.
pub struct SessionContext {
    pub name: String,
    pub webhook: WebhookClient,
    pub honor_command_reply: bool,
}

/// One bot credential bound to one webhook target, with its own receive
/// loop. Stopping a session is final; a restart needs a new one.
pub struct BotSession {
    bot: Bot,
    ctx: Arc<SessionContext>,
}

/// Handle to a session whose receive loop is running.
pub struct RunningSession {
    pub name: String,
    token: ShutdownToken,
    handle: JoinHandle<()>,
}

impl BotSession {
    pub fn new(
        config: SessionConfig,
        webhook_timeout: Duration,
        honor_command_reply: bool,
    ) -> Result<Self> {
        let webhook = WebhookClient::new(config.webhook_url, webhook_timeout)?;
        Ok(Self {
            bot: Bot::new(config.bot_token),
            ctx: Arc::new(SessionContext {
                name: config.name,
                webhook,
                honor_command_reply,
            }),
        })
    }

    /// Register the handlers and start polling on a spawned task.
    ///
    /// The dispatcher gets a constant distribution key so this session's
    /// updates are handled strictly in arrival order.
    pub fn spawn(self) -> RunningSession {
        let name = self.ctx.name.clone();

        let handler = Update::filter_message().endpoint(handle_message);

        let mut dispatcher = Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text("reply delivery"))
            .distribution_function(|_| Some(()))
            .build();

        let token = dispatcher.shutdown_token();

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            info!("{} is starting...", task_name);
            dispatcher.dispatch().await;
            info!("{} stopped", task_name);
        });

        RunningSession {
            name,
            token,
            handle,
        }
    }
}

impl RunningSession {
    /// Ask the receive loop to stop and wait until the in-flight handler
    /// has drained.
    pub async fn stop(&self) {
        match self.token.shutdown() {
            Ok(done) => done.await,
            Err(e) => warn!("{}: {}", self.name, e),
        }
    }

    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!("{}: receive loop task failed: {}", self.name, e);
        }
    }
}

async fn handle_message(bot: Bot, msg: Message, ctx: Arc<SessionContext>) -> ResponseResult<()> {
    let Some(event) = InboundEvent::from_message(&msg) else {
        return Ok(());
    };

    info!(
        "[{}] {} from user {}",
        ctx.name,
        event.kind(),
        event.sender().user_id
    );

    let payload = normalize(&event);
    let response = match ctx.webhook.send(&payload).await {
        Ok(value) => value,
        Err(e) => {
            error!("[{}] {:#}", ctx.name, e);
            None
        }
    };

    match choose_action(&event, ctx.honor_command_reply, response.as_ref()) {
        ReplyAction::Reply(text) => {
            bot.send_message(ChatId(event.chat_id()), text).await?;
        }
        ReplyAction::React => {
            bot.set_message_reaction(ChatId(event.chat_id()), MessageId(event.message_id()))
                .reaction(vec![ReactionType::Emoji {
                    emoji: REACTION_EMOJI.to_string(),
                }])
                .await?;
        }
    }

    Ok(())
}

/// Commands answer with the fixed welcome text unless configured to go
/// through the uniform routing policy; everything else always routes.
fn choose_action(
    event: &InboundEvent,
    honor_command_reply: bool,
    response: Option<&Value>,
) -> ReplyAction {
    if matches!(event, InboundEvent::Command { .. }) && !honor_command_reply {
        return ReplyAction::Reply(WELCOME_MESSAGE.to_string());
    }
    route(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Sender;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn command_event() -> InboundEvent {
        InboundEvent::Command {
            command: "start".to_string(),
            message_id: 1,
            chat_id: 987654321,
            from: Sender {
                user_id: 123456789,
                username: Some("testuser".to_string()),
                first_name: "Test".to_string(),
                last_name: Some("User".to_string()),
            },
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn text_event() -> InboundEvent {
        InboundEvent::Text {
            message_id: 1,
            chat_id: 987654321,
            text: "Hello bot".to_string(),
            from: Sender {
                user_id: 123456789,
                username: None,
                first_name: "Test".to_string(),
                last_name: None,
            },
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_command_ignores_webhook_reply_by_default() {
        let response = json!({"reply": "should be ignored"});
        let action = choose_action(&command_event(), false, Some(&response));
        assert_eq!(action, ReplyAction::Reply(WELCOME_MESSAGE.to_string()));
    }

    #[test]
    fn test_command_sends_welcome_on_webhook_failure_too() {
        let action = choose_action(&command_event(), false, None);
        assert_eq!(action, ReplyAction::Reply(WELCOME_MESSAGE.to_string()));
    }

    #[test]
    fn test_command_honors_reply_when_configured() {
        let response = json!({"reply": "routed"});
        let action = choose_action(&command_event(), true, Some(&response));
        assert_eq!(action, ReplyAction::Reply("routed".to_string()));
    }

    #[test]
    fn test_text_event_routes_reply() {
        let response = json!({"reply": "Hi there"});
        let action = choose_action(&text_event(), false, Some(&response));
        assert_eq!(action, ReplyAction::Reply("Hi there".to_string()));
    }

    #[test]
    fn test_text_event_falls_back_to_reaction() {
        assert_eq!(choose_action(&text_event(), false, None), ReplyAction::React);
        assert_eq!(
            choose_action(&text_event(), false, Some(&json!({}))),
            ReplyAction::React
        );
    }
}
