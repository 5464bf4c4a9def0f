use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub default_rest_seconds: u32,
    pub rest_poll_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:trainlog.db?mode=rwc".to_string()),
            default_rest_seconds: env::var("DEFAULT_REST_SECONDS")
                .unwrap_or_else(|_| "90".to_string())
                .parse()
                .unwrap_or(90),
            rest_poll_ms: env::var("REST_POLL_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .unwrap_or(250),
        })
    }

    pub fn rest_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rest_poll_ms.max(1))
    }
}
