use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lexicon_bot::backend::{BackendGateway, HttpBackend, InMemoryBackend};
use lexicon_bot::bot;
use lexicon_bot::config::AppConfig;
use lexicon_bot::dispatcher::SessionDispatcher;
use lexicon_bot::errors::ConfigError;
use lexicon_bot::fsm::SessionEngine;
use lexicon_bot::localization;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting Lexicon Telegram Bot");

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let bot_token = env::var("TELEGRAM_BOT_TOKEN").map_err(|_| ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

    localization::init_localization().context("Failed to load localization resources")?;

    let bot = Bot::new(bot_token);
    match config.backend.base_url.clone() {
        Some(url) => {
            info!(backend_url = %url, "Using HTTP backend");
            let backend = HttpBackend::new(&url, &config.backend)?;
            run(bot, backend, config).await
        }
        None => {
            info!("BACKEND_URL not set, using the in-memory demo backend");
            run(bot, InMemoryBackend::demo(), config).await
        }
    }
}

async fn run<B: BackendGateway>(bot: Bot, backend: B, config: AppConfig) -> Result<()> {
    let engine = SessionEngine::new(Arc::new(backend), &config);
    let dispatcher = Arc::new(
        SessionDispatcher::new(engine, &config.admin_chat_ids)
            .with_idle_timeout(Duration::from_secs(config.session.idle_timeout_secs)),
    );

    info!(admins = config.admin_chat_ids.len(), "Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let dispatcher = Arc::clone(&dispatcher);
            move |bot: Bot, msg: Message| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { bot::message_handler(bot, msg, dispatcher).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let dispatcher = Arc::clone(&dispatcher);
            move |bot: Bot, q: CallbackQuery| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { bot::callback_handler(bot, q, dispatcher).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
