use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Telegram bot token
pub const TOKEN_ENV: &str = "CMBOT_TELEGRAM_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    /// Bot username, without the leading '@'
    #[serde(default)]
    pub bot_name: Option<String>,
}

/// Command prefixes selecting the reply mode. Empty strings count as unset.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CommandConfig {
    #[serde(default)]
    pub string_command: Option<String>,
    #[serde(default)]
    pub image_command: Option<String>,
}

impl CommandConfig {
    pub fn text_prefix(&self) -> Option<&str> {
        non_empty(self.string_command.as_deref())
    }

    pub fn image_prefix(&self) -> Option<&str> {
        non_empty(self.image_command.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    /// Image endpoint template; `{slug}` is replaced by the currency id.
    /// When unset the currency's own image from the market listing is used.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            vs_currency: default_vs_currency(),
            image_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_api_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_interval_secs() -> u64 {
    60 * 60
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if config.refresh.interval_secs == 0 {
            anyhow::bail!("[refresh] interval_secs must be greater than zero");
        }

        Ok(config)
    }

    /// Bot username from [telegram] bot_name
    pub fn bot_name(&self) -> Option<&str> {
        self.telegram.bot_name.as_deref()
    }

    /// Bot token, read from the environment rather than the config file
    pub fn bot_token() -> Result<String> {
        std::env::var(TOKEN_ENV).with_context(|| format!("{} is not set", TOKEN_ENV))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_name = "coin_bot"

            [commands]
            string_command = "/c "
            image_command = "/img "

            [pricing]
            api_url = "http://localhost:9000"
            vs_currency = "eur"

            [refresh]
            initial_delay_ms = 5
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.bot_name(), Some("coin_bot"));
        assert_eq!(config.commands.text_prefix(), Some("/c "));
        assert_eq!(config.commands.image_prefix(), Some("/img "));
        assert_eq!(config.pricing.api_url, "http://localhost:9000");
        assert_eq!(config.pricing.vs_currency, "eur");
        assert_eq!(config.pricing.timeout_secs, 30);
        assert_eq!(config.refresh.initial_delay(), Duration::from_millis(5));
        assert_eq!(config.refresh.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.bot_name(), None);
        assert_eq!(config.commands, CommandConfig::default());
        assert_eq!(config.refresh.initial_delay(), Duration::from_millis(100));
        assert_eq!(config.refresh.interval(), Duration::from_secs(3600));
        assert_eq!(config.pricing.image_url, None);
    }

    #[test]
    fn test_empty_prefix_is_unconfigured() {
        let config = Config::parse(
            r#"
            [commands]
            string_command = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.commands.text_prefix(), None);
        assert_eq!(config.commands.image_prefix(), None);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = Config::parse(
            r#"
            [refresh]
            interval_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }
}
