mod api;
mod bot_handler;
mod external_services;
mod messages;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::api::webhooks::{health, nowpayments_webhook, telegram_webhook};
use crate::bot_handler::BOT;

lazy_static! {
    static ref CONFIG: MainConfig = envy::from_env::<MainConfig>().unwrap();
}

#[derive(Deserialize, Debug)]
struct MainConfig {
    #[serde(rename = "ebook_bot_telegram_token")]
    telegram_token: String,
    #[serde(rename = "ebook_bot_nowpayments_api_key", default)]
    nowpayments_api_key: String,
    #[serde(rename = "ebook_bot_nowpayments_ipn_secret")]
    nowpayments_ipn_secret: String,
    #[serde(
        rename = "ebook_bot_ipn_callback_url",
        default = "default_callback_url"
    )]
    ipn_callback_url: String,
    #[serde(rename = "port", default = "default_port")]
    port: u16,
}

fn default_callback_url() -> String {
    "https://mi-ebook-bot.onrender.com/webhook/nowpayments".to_string()
}

fn default_port() -> u16 {
    10000
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Fail at startup on missing token/secret instead of on the first request.
    lazy_static::initialize(&CONFIG);
    lazy_static::initialize(&BOT);

    let app = Router::new()
        .route("/", get(health))
        .route("/telegram", post(telegram_webhook))
        .route("/webhook/nowpayments", post(nowpayments_webhook));

    let addr = SocketAddr::from(([0, 0, 0, 0], CONFIG.port));
    tracing::info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
