mod config;
mod dispatcher;
mod markdown;
mod platform;
mod pricing;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatcher::UpdateDispatcher;
use crate::pricing::{CoinMarketService, PricingService};
use crate::scheduler::tasks::register_refresh_task;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coinbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let token = Config::bot_token()?;

    info!("Configuration loaded successfully");
    info!("  Bot: {}", config.bot_name().unwrap_or("<unnamed>"));
    info!("  Text command: {:?}", config.commands.text_prefix());
    info!("  Image command: {:?}", config.commands.image_prefix());
    info!("  Pricing API: {}", config.pricing.api_url);

    let pricing: Arc<dyn PricingService> = Arc::new(
        CoinMarketService::new(config.pricing.clone())
            .context("Failed to create pricing client")?,
    );

    // Keep the market cache warm; failing here aborts startup
    let scheduler = Scheduler::new().await?;
    register_refresh_task(&scheduler, pricing.clone(), &config.refresh).await?;
    scheduler.start().await?;

    let dispatcher = Arc::new(UpdateDispatcher::new(config.commands.clone(), pricing));
    let bot = teloxide::Bot::new(token);

    info!("Bot is starting...");
    platform::telegram::run(dispatcher, bot).await?;

    Ok(())
}
