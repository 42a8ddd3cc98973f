use std::env;

use config::builder::DefaultState;
use config::{Case, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Deployment-level variables read without the `COACH_` prefix.
/// These take precedence over every other source.
const DEPLOYMENT_VARS: [(&str, &str); 4] = [
    ("DAILY_API_BUDGET", "daily_api_budget"),
    ("USER_HOURLY_LIMIT", "user_hourly_limit"),
    ("API_KILL_SWITCH", "api_kill_switch"),
    ("ANTHROPIC_API_KEY", "anthropic_api_key"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Anthropic API key
    pub anthropic_api_key: String,

    /// Accepted requests per UTC day across all users
    #[serde(default = "default_daily_api_budget")]
    pub daily_api_budget: u32,

    /// Accepted requests per user key in any rolling hour
    #[serde(default = "default_user_hourly_limit")]
    pub user_hourly_limit: u32,

    /// When set, every generation request is answered with 503
    #[serde(default)]
    pub api_kill_switch: bool,

    /// Prompt text beyond this many characters is dropped before templating
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Completion API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Per-token prices used for the cost estimate in the monitoring log
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Messages endpoint URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Value of the `anthropic-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_version: default_api_version(),
            model: default_model(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PricingConfig {
    /// USD per million input tokens
    #[serde(default = "default_input_usd_per_mtok")]
    pub input_usd_per_mtok: f64,

    /// USD per million output tokens
    #[serde(default = "default_output_usd_per_mtok")]
    pub output_usd_per_mtok: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_usd_per_mtok: default_input_usd_per_mtok(),
            output_usd_per_mtok: default_output_usd_per_mtok(),
        }
    }
}

impl PricingConfig {
    /// Estimated cost in USD of a single completion
    pub fn estimate_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_usd_per_mtok
            + output_tokens as f64 * self.output_usd_per_mtok)
            / 1_000_000.0
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_daily_api_budget() -> u32 {
    2000
}

fn default_user_hourly_limit() -> u32 {
    10
}

fn default_max_prompt_chars() -> usize {
    2000
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_input_usd_per_mtok() -> f64 {
    3.0
}

fn default_output_usd_per_mtok() -> f64 {
    15.0
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with COACH_)
            .add_source(
                Environment::with_prefix("COACH")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            );

        builder = apply_deployment_vars(builder, |var| env::var(var).ok())?;

        Self::from_config(builder.build()?)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.anthropic_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "anthropic_api_key must not be empty".to_string(),
            ));
        }
        if self.daily_api_budget == 0 {
            return Err(ConfigError::Message(
                "daily_api_budget must be greater than zero".to_string(),
            ));
        }
        if self.user_hourly_limit == 0 {
            return Err(ConfigError::Message(
                "user_hourly_limit must be greater than zero".to_string(),
            ));
        }
        if self.max_prompt_chars == 0 {
            return Err(ConfigError::Message(
                "max_prompt_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Override keys from the unprefixed deployment variables. Empty values
/// count as unset.
fn apply_deployment_vars(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in DEPLOYMENT_VARS {
        let value = lookup(var).filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(key, value)?;
    }
    Ok(builder)
}
