use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/**
Inbound update, trimmed to the fields the bot reads.
https://core.telegram.org/bots/api#update
 */
#[derive(Deserialize, Debug)]
pub struct Update {
    /**
    Present for new incoming messages; absent for edits, callback queries
    and other update kinds, which the bot ignores.
     */
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug)]
pub struct Message {
    /**
    Chat the message belongs to.
     */
    pub chat: Chat,

    /**
    Text of the message; absent for stickers, photos etc.
     */
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Chat {
    /**
    Unique chat identifier, also used as the payment correlation id.
     */
    pub id: i64,
}

/**
https://core.telegram.org/bots/api#sendmessage
 */
#[derive(Serialize, Debug)]
struct SendMessageParams<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Error, Debug)]
pub enum SendMessageError {
    #[error("Can't connect to Telegram servers: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram rejected sendMessage: {0}")]
    Rejected(StatusCode),
}

pub(crate) mod handler {
    use async_trait::async_trait;

    use crate::bot_handler::MessengerOperations;
    use crate::external_services::telegram::{SendMessageError, SendMessageParams};

    pub struct TelegramMessenger {
        api_url: String,
        client: reqwest::Client,
    }

    impl TelegramMessenger {
        pub fn new(token: &str, client: reqwest::Client) -> Self {
            Self {
                api_url: format!("https://api.telegram.org/bot{token}"),
                client,
            }
        }
    }

    #[async_trait]
    impl MessengerOperations for TelegramMessenger {
        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SendMessageError> {
            let params = SendMessageParams {
                chat_id,
                text,
                parse_mode: "HTML",
            };

            let response = self
                .client
                .post(format!("{}/sendMessage", self.api_url))
                .json(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(SendMessageError::Rejected(response.status()));
            }

            Ok(())
        }
    }
}
