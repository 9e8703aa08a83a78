use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::warn;

use crate::bot_handler::{HandleNotificationError, BOT};
use crate::external_services::telegram::Update;

pub async fn health() -> &'static str {
    "✅ Bot de pagos activo"
}

/// Inbound Telegram updates. A syntactically valid update is always
/// acknowledged with 200 so Telegram's redelivery never fires on
/// business-logic failures.
pub async fn telegram_webhook(Json(update): Json<Update>) -> StatusCode {
    BOT.handle_update(update).await;

    StatusCode::OK
}

/// Inbound NOWPayments IPN callbacks. The signature covers the raw body,
/// so the body is taken unparsed.
pub async fn nowpayments_webhook(
    headers: HeaderMap,
    body: String,
) -> (StatusCode, &'static str) {
    let Some(signature) = headers
        .get("x-nowpayments-sig")
        .and_then(|v| v.to_str().ok())
    else {
        return (StatusCode::BAD_REQUEST, "Missing signature");
    };

    match BOT.handle_payment_notification(signature, body.as_bytes()).await {
        Ok(_) => (StatusCode::OK, "OK"),

        Err(err) => {
            warn!("Rejected NOWPayments notification: {err}");

            match err {
                HandleNotificationError::VerificationNotConfigured => {
                    (StatusCode::FORBIDDEN, "Verification not configured")
                }
                HandleNotificationError::InvalidSignature => {
                    (StatusCode::BAD_REQUEST, "Invalid signature")
                }
                HandleNotificationError::MalformedBody(_) => {
                    (StatusCode::BAD_REQUEST, "Malformed body")
                }
                HandleNotificationError::DeliveryFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
                }
            }
        }
    }
}
