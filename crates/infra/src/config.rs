//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `APP_ENV` | `development` | `development`, `test` or `production` |
//! | `PORT` | `3001` | HTTP listen port |
//! | `JWT_SECRET` | dev secret outside production | HS256 signing secret for bearer tokens |
//! | `USE_PERSISTENT_STORES` | `false` | use Postgres instead of the in-memory store |
//! | `DATABASE_URL` | none | Postgres URL, required with `USE_PERSISTENT_STORES=true` |
//! | `SEED_DEMO_DATA` | `true` outside production | load the demo inventory at startup |
//! | `CORS_ORIGIN` | `http://localhost:5173` | browser origin allowed to call the API |

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Deployment environment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "production" | "prod" => Ok(AppEnv::Production),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: value.to_string(),
            }),
        }
    }
}

/// Which ledger store backs the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub env: AppEnv,
    pub port: u16,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub seed_demo_data: bool,
    /// Single origin allowed for credentialed cross-origin requests.
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = match lookup("APP_ENV") {
            Some(v) => AppEnv::parse(&v)?,
            None => AppEnv::Development,
        };

        let port = match lookup("PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if env == AppEnv::Production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let persistent = parse_flag(
            "USE_PERSISTENT_STORES",
            lookup("USE_PERSISTENT_STORES"),
            false,
        )?;
        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StoreBackend::Postgres { database_url }
        } else {
            StoreBackend::InMemory
        };

        let seed_demo_data = parse_flag(
            "SEED_DEMO_DATA",
            lookup("SEED_DEMO_DATA"),
            env != AppEnv::Production,
        )?;

        let cors_origin = match lookup("CORS_ORIGIN").filter(|s| !s.is_empty()) {
            None => DEFAULT_CORS_ORIGIN.to_string(),
            Some(origin) if is_http_origin(&origin) => origin,
            Some(origin) => {
                return Err(ConfigError::Invalid {
                    key: "CORS_ORIGIN",
                    value: origin,
                });
            }
        };

        Ok(Self {
            env,
            port,
            jwt_secret,
            store,
            seed_demo_data,
            cors_origin,
        })
    }
}

/// `scheme://host[:port]` with no path and nothing a header value cannot carry.
fn is_http_origin(value: &str) -> bool {
    let Some(host) = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
    else {
        return false;
    };
    !host.is_empty()
        && !host.contains('/')
        && value.chars().all(|c| c.is_ascii_graphic())
}

fn parse_flag(
    key: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}
