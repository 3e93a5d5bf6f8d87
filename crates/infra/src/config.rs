//! Back-office configuration.
//!
//! Hierarchical loading:
//! 1. Default values in code
//! 2. `config/<environment>.toml` (optional)
//! 3. Environment variable overrides with `PETALERP_` prefix, `__` as separator

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use petalerp_parties::DiscountTier;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackOfficeConfig {
    /// Current environment (development, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub commission: CommissionConfig,

    #[serde(default)]
    pub discounts: DiscountConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommissionConfig {
    /// Salesman share of net opted-in product sales, in percent
    pub salesman_percent: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DiscountConfig {
    /// Whether completed orders move auto-discount clients between tiers
    pub enabled: bool,

    /// Lifetime purchase thresholds and the percent each unlocks
    #[serde(default = "default_tiers")]
    pub tiers: Vec<DiscountTier>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_tiers() -> Vec<DiscountTier> {
    vec![
        DiscountTier { threshold: 50_000, percent: 3 },
        DiscountTier { threshold: 200_000, percent: 5 },
        DiscountTier { threshold: 500_000, percent: 10 },
    ]
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self { salesman_percent: 5 }
    }
}

impl Default for DiscountConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tiers: default_tiers(),
        }
    }
}

impl Default for BackOfficeConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            commission: CommissionConfig::default(),
            discounts: DiscountConfig::default(),
        }
    }
}

impl BackOfficeConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("PETALERP_ENVIRONMENT").unwrap_or_else(|_| default_environment());
        Self::load_for(&environment)
    }

    pub fn load_for(environment: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .set_default("environment", environment)?
            .set_default("commission.salesman_percent", 5)?
            .set_default("discounts.enabled", true)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("PETALERP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
