use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const MAX_NODE_ID: u16 = 1023;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string, or `memory` for the in-process store
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; `*` allows any origin
    pub frontend_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    /// Node component embedded into generated ids
    pub node_id: u16,
    pub seed_sample_data: bool,
}

/// Parse an optional environment value; unset or blank falls back to the
/// default, anything else must parse
fn parse_setting<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid {} value '{}'", name, value)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let node_id: u16 = parse_setting("NODE_ID", env::var("NODE_ID").ok(), 0)?;
        if node_id > MAX_NODE_ID {
            anyhow::bail!("NODE_ID must be at most {}, got {}", MAX_NODE_ID, node_id);
        }
        let port: u16 = parse_setting("SERVER_PORT", env::var("SERVER_PORT").ok(), 3000)?;

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/attendance.db".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                frontend_origin: env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            },
            app: AppConfig {
                environment: Environment::parse(
                    &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                ),
                node_id,
                seed_sample_data: env::var("SEED_SAMPLE_DATA")
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
        })
    }

    /// In-memory configuration used by tests and local experiments
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "memory".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                frontend_origin: "*".to_string(),
            },
            app: AppConfig {
                environment: Environment::Development,
                node_id: 0,
                seed_sample_data: false,
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == Environment::Development
    }
}
