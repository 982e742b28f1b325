use std::env;

use crate::domain::billing::DEFAULT_TAX_RATE;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// VAT rate (percent) used when an invoice request does not carry one
    pub default_tax_rate: f64,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tabali.db?mode=rwc".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            default_tax_rate: DEFAULT_TAX_RATE,
            seed_demo: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| parse_origins(&s))
                .unwrap_or_else(Vec::new),
            default_tax_rate: env::var("DEFAULT_TAX_RATE")
                .ok()
                .and_then(|r| r.parse::<f64>().ok())
                .filter(|r| *r >= 0.0)
                .unwrap_or(defaults.default_tax_rate),
            seed_demo: env::var("SEED_DEMO")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(false),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
