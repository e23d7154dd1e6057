use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the credits engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub pricing: PricingConfig,
    pub stripe: StripeConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        Ok(Self {
            environment,
            pricing: PricingConfig::load()?,
            stripe: StripeConfig::load(),
            telemetry: TelemetryConfig {
                log_level: env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
        })
    }
}

/// Credit prices for unlock tiers and contact requests, and the money/credit
/// packages offered for top-ups. Amounts are credits except the `_cents`
/// fields, which are USD cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    pub unlock_summary: i64,
    pub unlock_detailed: i64,
    pub unlock_full: i64,
    pub contact_request: i64,
    pub topup_small_cents: i64,
    pub topup_small_credits: i64,
    pub topup_medium_cents: i64,
    pub topup_medium_credits: i64,
    pub topup_large_cents: i64,
    pub topup_large_credits: i64,
}

impl PricingConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            unlock_summary: credit_var("CREDIT_PRICE_UNLOCK_SUMMARY", 5)?,
            unlock_detailed: credit_var("CREDIT_PRICE_UNLOCK_DETAILED", 15)?,
            unlock_full: credit_var("CREDIT_PRICE_UNLOCK_FULL", 30)?,
            contact_request: credit_var("CREDIT_PRICE_CONTACT_REQUEST", 25)?,
            topup_small_cents: credit_var("CREDIT_TOPUP_SMALL_CENTS", 500)?,
            topup_small_credits: credit_var("CREDIT_TOPUP_SMALL_CREDITS", 20)?,
            topup_medium_cents: credit_var("CREDIT_TOPUP_MEDIUM_CENTS", 1000)?,
            topup_medium_credits: credit_var("CREDIT_TOPUP_MEDIUM_CREDITS", 50)?,
            topup_large_cents: credit_var("CREDIT_TOPUP_LARGE_CENTS", 1800)?,
            topup_large_credits: credit_var("CREDIT_TOPUP_LARGE_CREDITS", 100)?,
        })
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            unlock_summary: 5,
            unlock_detailed: 15,
            unlock_full: 30,
            contact_request: 25,
            topup_small_cents: 500,
            topup_small_credits: 20,
            topup_medium_cents: 1000,
            topup_medium_credits: 50,
            topup_large_cents: 1800,
            topup_large_credits: 100,
        }
    }
}

fn credit_var(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(var) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidAmount { var })?;
            if value < 0 {
                return Err(ConfigError::InvalidAmount { var });
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

/// Payment provider credentials. The webhook secret feeds the provider
/// client's signature verification; the engine itself never touches it.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

impl StripeConfig {
    fn load() -> Self {
        Self {
            secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidAmount { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAmount { var } => {
                write!(f, "{var} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
