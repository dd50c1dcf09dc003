use anyhow::{ensure, Context, Result};

use crate::roster::DEFAULT_MAX_PLAYERS_PER_TEAM;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Cap used when a request does not name its own.
    pub default_max_players_per_team: i64,
    /// When set, requests without their own seed shuffle reproducibly.
    pub shuffle_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_max_players_per_team = match std::env::var("DEFAULT_MAX_PLAYERS_PER_TEAM") {
            Ok(raw) => raw
                .parse::<i64>()
                .context("DEFAULT_MAX_PLAYERS_PER_TEAM must be an integer")?,
            Err(_) => DEFAULT_MAX_PLAYERS_PER_TEAM,
        };
        ensure!(
            default_max_players_per_team > 0,
            "DEFAULT_MAX_PLAYERS_PER_TEAM must be positive, got {default_max_players_per_team}"
        );

        let shuffle_seed = std::env::var("ROSTER_SHUFFLE_SEED")
            .ok()
            .map(|raw| {
                raw.parse::<u64>()
                    .context("ROSTER_SHUFFLE_SEED must be an unsigned integer")
            })
            .transpose()?;

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_max_players_per_team,
            shuffle_seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            default_max_players_per_team: DEFAULT_MAX_PLAYERS_PER_TEAM,
            shuffle_seed: None,
        }
    }
}
