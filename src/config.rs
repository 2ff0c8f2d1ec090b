use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub mailer: MailerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StripeConfig {
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailerConfig {
    pub base_url: String,
    pub api_key: String,
    pub sender: String,
    /// Inbox that receives payment grievances.
    pub support_inbox: String,
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // Prefer the config file; fall back to environment variables alone.
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .with_context(|| format!("failed to parse {config_path}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // Without a config file the database URL must come from the env.
                let database_url = get_env("DATABASE_URL").context(
                    "DATABASE_URL environment variable missing and no config.toml found",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8005u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    stripe: StripeConfig {
                        secret_key: get_env("STRIPE_SECRET_KEY").unwrap_or_default(),
                    },
                    mailer: MailerConfig {
                        base_url: get_env("MAILER_BASE_URL").unwrap_or_default(),
                        api_key: get_env("MAILER_API_KEY").unwrap_or_default(),
                        sender: get_env("MAILER_SENDER").unwrap_or_default(),
                        support_inbox: get_env("MAILER_SUPPORT_INBOX").unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to read config file {config_path}")));
            }
        };

        // Env vars override file values so deployments can patch single fields.
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(key) = env::var("STRIPE_SECRET_KEY") {
            config.stripe.secret_key = key;
        }
        if let Ok(key) = env::var("MAILER_API_KEY") {
            config.mailer.api_key = key;
        }

        Ok(config)
    }
}
