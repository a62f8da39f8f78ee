use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Which `ChatStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("Invalid STORE_BACKEND value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub admin_username: String,
    /// Argon2 PHC string. `None` denies every admin login.
    pub admin_password_hash: Option<String>,
    pub guest_name: String,
    pub poll_interval_secs: u64,
    pub event_buffer: usize,
    pub session_create_limit: u32,
    pub session_create_window_secs: u64,
    pub login_limit: u32,
    pub login_window_secs: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/printdesk".to_string());

        let bind_raw = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .map_err(|_| anyhow!("Invalid BIND_ADDR value: {}", bind_raw))?;

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let admin_password_hash = env::var("ADMIN_PASSWORD_HASH")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Config {
            database_url,
            bind_addr,
            store_backend,
            jwt_secret,
            jwt_expiration_hours: parse_or("JWT_EXPIRATION_HOURS", 8),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password_hash,
            guest_name: env::var("CHAT_GUEST_NAME").unwrap_or_else(|_| "Guest User".to_string()),
            poll_interval_secs: parse_or("CHAT_POLL_INTERVAL_SECS", 3u64).max(1),
            event_buffer: parse_or("CHAT_EVENT_BUFFER", 256usize).max(16),
            session_create_limit: parse_or("CHAT_SESSION_CREATE_LIMIT", 5u32).max(1),
            session_create_window_secs: parse_or("CHAT_SESSION_CREATE_WINDOW_SECS", 60u64).max(1),
            login_limit: parse_or("ADMIN_LOGIN_LIMIT", 10u32).max(1),
            login_window_secs: parse_or("ADMIN_LOGIN_WINDOW_SECS", 60u64).max(1),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/printdesk".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_backend: StoreBackend::Postgres,
            jwt_secret: "your-secret-key-change-this-in-production".to_string(),
            jwt_expiration_hours: 8,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
            guest_name: "Guest User".to_string(),
            poll_interval_secs: 3,
            event_buffer: 256,
            session_create_limit: 5,
            session_create_window_secs: 60,
            login_limit: 10,
            login_window_secs: 60,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
