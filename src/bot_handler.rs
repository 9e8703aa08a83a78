use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use thiserror::Error;
use tracing::{info, warn};

use crate::external_services::nowpayments::handler::NowPaymentsClient;
use crate::external_services::nowpayments::{PaymentNotification, PaymentStatus};
use crate::external_services::telegram::handler::TelegramMessenger;
use crate::external_services::telegram::{SendMessageError, Update};
use crate::external_services::{validate_signature, VerifySignatureError};
use crate::messages;
use crate::CONFIG;

lazy_static! {
    pub static ref BOT: BotHandler<TelegramMessenger, NowPaymentsClient> = BotHandler::new();
}

#[async_trait]
pub trait MessengerOperations {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SendMessageError>;
}

#[async_trait]
pub trait PaymentOperations {
    async fn create_payment(&self, chat_id: &str) -> CreatedPayment;
}

#[derive(Debug)]
pub enum CreatedPayment {
    Succeed { payment_url: String },
    Failed { reason: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    ShowMenu,
    InitiatePayment,
    NoOp,
}

impl Command {
    pub fn classify(text: &str) -> Self {
        match text.to_lowercase().as_str() {
            "/start" | "/comprar" => Self::ShowMenu,
            "/cripto" => Self::InitiatePayment,
            _ => Self::NoOp,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum NotificationOutcome {
    /**
    Download link sent to the chat that paid.
     */
    Dispatched,

    /**
    Authentic notification that needs no action (not confirmed, or no
    correlation id to route by).
     */
    Ignored,
}

#[derive(Error, Debug)]
pub enum HandleNotificationError {
    #[error("Signature verification is not configured")]
    VerificationNotConfigured,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed notification body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Can't notify the buyer: {0}")]
    DeliveryFailed(#[from] SendMessageError),
}

pub struct BotHandler<M: MessengerOperations, P: PaymentOperations> {
    messenger: M,
    payments: P,
    ipn_secret: String,
}

impl BotHandler<TelegramMessenger, NowPaymentsClient> {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build http client");

        Self {
            messenger: TelegramMessenger::new(&CONFIG.telegram_token, client.clone()),
            payments: NowPaymentsClient::new(
                &CONFIG.nowpayments_api_key,
                &CONFIG.ipn_callback_url,
                client,
            ),
            ipn_secret: CONFIG.nowpayments_ipn_secret.clone(),
        }
    }
}

impl<M: MessengerOperations, P: PaymentOperations> BotHandler<M, P> {
    /// Handles one inbound chat update. Never fails: a syntactically valid
    /// update is always acknowledged so Telegram does not redeliver it, and
    /// downstream trouble only reaches the user as the fixed apology text.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };

        let chat_id = message.chat.id.to_string();

        match Command::classify(&text) {
            Command::ShowMenu => {
                let menu = messages::payment_menu(&chat_id);

                if let Err(err) = self.messenger.send_message(&chat_id, &menu).await {
                    warn!("Can't send payment menu to chat {chat_id}: {err}");
                }
            }

            Command::InitiatePayment => {
                let reply = match self.payments.create_payment(&chat_id).await {
                    CreatedPayment::Succeed { payment_url } => {
                        info!("Payment created for chat {chat_id}");

                        messages::payment_link(&payment_url)
                    }

                    CreatedPayment::Failed { reason } => {
                        warn!("Payment creation failed for chat {chat_id}: {reason}");

                        messages::payment_failed().to_string()
                    }
                };

                if let Err(err) = self.messenger.send_message(&chat_id, &reply).await {
                    warn!("Can't send payment reply to chat {chat_id}: {err}");
                }
            }

            Command::NoOp => {}
        }
    }

    /// Handles one payment-status notification: verify, parse, then deliver
    /// the download link when the payment reached `confirmed`.
    pub async fn handle_payment_notification(
        &self,
        signature: &str,
        raw_body: &[u8],
    ) -> Result<NotificationOutcome, HandleNotificationError> {
        validate_signature(signature, &self.ipn_secret, raw_body).map_err(|err| match err {
            VerifySignatureError::NotConfigured => {
                HandleNotificationError::VerificationNotConfigured
            }
            VerifySignatureError::InvalidSignature => HandleNotificationError::InvalidSignature,
        })?;

        let notification: PaymentNotification = serde_json::from_slice(raw_body)?;

        if notification.payment_status != PaymentStatus::Confirmed {
            return Ok(NotificationOutcome::Ignored);
        }

        let Some(chat_id) = notification.custom_id else {
            return Ok(NotificationOutcome::Ignored);
        };

        self.messenger
            .send_message(&chat_id, &messages::download_link())
            .await?;

        info!("Download link delivered to chat {chat_id}");

        Ok(NotificationOutcome::Dispatched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use hmac::{Hmac, Mac};
    use reqwest::StatusCode;
    use sha2::Sha512;

    use super::*;
    use crate::external_services::telegram::{Chat, Message};

    const SECRET: &str = "super-ipn-secret";

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessengerOperations for RecordingMessenger {
        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SendMessageError> {
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));

            if self.fail {
                return Err(SendMessageError::Rejected(StatusCode::BAD_GATEWAY));
            }

            Ok(())
        }
    }

    struct StubPayments {
        payment_url: Option<String>,
    }

    #[async_trait]
    impl PaymentOperations for StubPayments {
        async fn create_payment(&self, _chat_id: &str) -> CreatedPayment {
            match &self.payment_url {
                Some(url) => CreatedPayment::Succeed {
                    payment_url: url.clone(),
                },
                None => CreatedPayment::Failed {
                    reason: "Unsupported response code: 500".to_string(),
                },
            }
        }
    }

    fn handler(
        messenger_fails: bool,
        payment_url: Option<&str>,
        secret: &str,
    ) -> BotHandler<RecordingMessenger, StubPayments> {
        BotHandler {
            messenger: RecordingMessenger {
                sent: Mutex::new(Vec::new()),
                fail: messenger_fails,
            },
            payments: StubPayments {
                payment_url: payment_url.map(str::to_string),
            },
            ipn_secret: secret.to_string(),
        }
    }

    fn text_update(chat_id: i64, text: &str) -> Update {
        Update {
            message: Some(Message {
                chat: Chat { id: chat_id },
                text: Some(text.to_string()),
            }),
        }
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);

        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(Command::classify("/start"), Command::ShowMenu);
        assert_eq!(Command::classify("/COMPRAR"), Command::ShowMenu);
        assert_eq!(Command::classify("/Cripto"), Command::InitiatePayment);
        assert_eq!(Command::classify("hola"), Command::NoOp);
        assert_eq!(Command::classify("/unknown"), Command::NoOp);
    }

    #[tokio::test]
    async fn start_sends_one_menu_with_reference_code() {
        let bot = handler(false, None, SECRET);

        bot.handle_update(text_update(987654321, "/start")).await;

        let sent = bot.messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "987654321");
        assert!(sent[0].1.contains("EBOOK-987654321"));
    }

    #[tokio::test]
    async fn comprar_sends_the_same_menu() {
        let bot = handler(false, None, SECRET);

        bot.handle_update(text_update(42, "/Comprar")).await;

        let sent = bot.messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("EBOOK-42"));
    }

    #[tokio::test]
    async fn cripto_sends_one_message_with_payment_url() {
        let url = "https://nowpayments.io/payment/?iid=5524759814";
        let bot = handler(false, Some(url), SECRET);

        bot.handle_update(text_update(987654321, "/cripto")).await;

        let sent = bot.messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains(url));
    }

    #[tokio::test]
    async fn failed_payment_creation_sends_one_apology() {
        let bot = handler(false, None, SECRET);

        bot.handle_update(text_update(987654321, "/cripto")).await;

        let sent = bot.messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, messages::payment_failed());
    }

    #[tokio::test]
    async fn messenger_failure_on_chat_path_is_swallowed() {
        let bot = handler(true, None, SECRET);

        // Must not panic or bubble up; Telegram still gets its 200.
        bot.handle_update(text_update(987654321, "/start")).await;
    }

    #[tokio::test]
    async fn non_text_update_sends_nothing() {
        let bot = handler(false, None, SECRET);

        bot.handle_update(Update {
            message: Some(Message {
                chat: Chat { id: 987654321 },
                text: None,
            }),
        })
        .await;
        bot.handle_update(Update { message: None }).await;

        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_sends_nothing() {
        let bot = handler(false, None, SECRET);

        bot.handle_update(text_update(987654321, "hola")).await;

        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_notification_dispatches_one_download_message() {
        let bot = handler(false, None, SECRET);
        let body = br#"{"payment_status":"confirmed","custom_id":"987654321"}"#;

        let outcome = bot
            .handle_payment_notification(&sign(SECRET, body), body)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::Dispatched);

        let sent = bot.messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "987654321");
        assert!(sent[0].1.contains(messages::PRODUCT_LINK));
    }

    #[tokio::test]
    async fn unconfirmed_notification_is_ignored() {
        let bot = handler(false, None, SECRET);
        let body = br#"{"payment_status":"waiting","custom_id":"987654321"}"#;

        let outcome = bot
            .handle_payment_notification(&sign(SECRET, body), body)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::Ignored);
        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_without_custom_id_is_ignored() {
        let bot = handler(false, None, SECRET);
        let body = br#"{"payment_status":"confirmed"}"#;

        let outcome = bot
            .handle_payment_notification(&sign(SECRET, body), body)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::Ignored);
        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let bot = handler(false, None, SECRET);
        let body = br#"{"payment_status":"confirmed","custom_id":"987654321"}"#;
        let tampered = br#"{"payment_status":"confirmed","custom_id":"111111111"}"#;

        let err = bot
            .handle_payment_notification(&sign(SECRET, body), tampered)
            .await
            .unwrap_err();

        assert!(matches!(err, HandleNotificationError::InvalidSignature));
        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_secret_rejects_every_notification() {
        let bot = handler(false, None, "");
        let body = br#"{"payment_status":"confirmed","custom_id":"987654321"}"#;

        // Even a signature computed over the right body with an empty key
        // must not pass.
        let err = bot
            .handle_payment_notification(&sign("", body), body)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HandleNotificationError::VerificationNotConfigured
        ));
        assert!(bot.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_with_valid_signature_is_rejected() {
        let bot = handler(false, None, SECRET);
        let body = b"not json at all";

        let err = bot
            .handle_payment_notification(&sign(SECRET, body), body)
            .await
            .unwrap_err();

        assert!(matches!(err, HandleNotificationError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_to_the_caller() {
        let bot = handler(true, None, SECRET);
        let body = br#"{"payment_status":"confirmed","custom_id":"987654321"}"#;

        let err = bot
            .handle_payment_notification(&sign(SECRET, body), body)
            .await
            .unwrap_err();

        assert!(matches!(err, HandleNotificationError::DeliveryFailed(_)));
    }
}
