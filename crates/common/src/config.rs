use alloy::primitives::Address;
use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Protocol owner: the only identity allowed to list/update markets,
    /// pause the protocol, and recover assets from custody.
    pub owner_address: Address,

    /// Port the query API listens on (default: 3000)
    pub api_port: u16,

    /// Optional webhook URL for ledger event delivery
    pub event_webhook_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            owner_address: std::env::var("OWNER_ADDRESS")
                .map_err(|_| anyhow::anyhow!("OWNER_ADDRESS environment variable is required"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("OWNER_ADDRESS must be a valid address"))?,
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
            event_webhook_url: std::env::var("EVENT_WEBHOOK_URL").ok(),
        })
    }
}
