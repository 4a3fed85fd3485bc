use alloy::primitives::Address;
use std::env;

/// USDC on Polygon — the collateral every NegRisk market splits against.
const DEFAULT_COLLATERAL_TOKEN: &str = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174";

/// A day of block time before a pending question is reported unresolvable.
const DEFAULT_RESOLUTION_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Optional — without it the catalog is built in memory only.
    pub database_url: Option<String>,
    /// JSONL file of decoded events from the log-decoding collaborator.
    pub events_path: Option<String>,
    pub collateral_token: Address,
    pub resolution_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let collateral_token = env::var("COLLATERAL_TOKEN")
            .unwrap_or_else(|_| DEFAULT_COLLATERAL_TOKEN.into())
            .parse()
            .map_err(|_| anyhow::anyhow!("COLLATERAL_TOKEN is not a valid address"))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            events_path: env::var("EVENTS_PATH").ok(),
            collateral_token,
            resolution_timeout_secs: env::var("RESOLUTION_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_RESOLUTION_TIMEOUT_SECS.to_string())
                .parse()?,
        })
    }
}
