use std::path::PathBuf;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub redemption: RedemptionConfig,
    #[serde(default)]
    pub badges: BadgeSweepConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    SingleUser,
    BasicAuth,
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub proxy: Option<ProxyAuthConfig>,
    pub single_user: Option<SingleUserAuthConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAuthConfig {
    /// Header carrying the authenticated user's email.
    #[serde(default = "default_proxy_header")]
    pub header: String,
}

fn default_proxy_header() -> String {
    String::from("X-Remote-Email")
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleUserAuthConfig {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub serve_origin: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the bind address as "host:port".
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the public origin URL, falling back to the bind address.
    #[must_use]
    pub fn origin(&self) -> String {
        self.serve_origin
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_address()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Clone, Deserialize)]
pub struct RedemptionConfig {
    pub hmac_secret: String,
    /// Lifetime of issued codes. Absent means codes never expire.
    pub code_ttl_hours: Option<u32>,
}

// The secret must not reach the startup config log.
impl std::fmt::Debug for RedemptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedemptionConfig")
            .field("hmac_secret", &"<redacted>")
            .field("code_ttl_hours", &self.code_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BadgeSweepConfig {
    /// Interval of the periodic auto-grant sweep. Absent disables it.
    pub sweep_interval_secs: Option<u64>,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `config.toml`, then validates it.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the
    /// configuration fails.
    pub fn load() -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults plus the environment source; shared by `load` and tests.
    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "debug")?
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            ))
    }

    /// ## Summary
    /// Checks cross-field constraints serde cannot express.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` for an empty HMAC secret, a zero TTL or
    /// sweep interval, or an auth method missing its section.
    pub fn validate(&self) -> CoreResult<()> {
        if self.redemption.hmac_secret.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "redemption.hmac_secret must not be empty".to_string(),
            ));
        }
        if self.redemption.code_ttl_hours == Some(0) {
            return Err(CoreError::ConfigError(
                "redemption.code_ttl_hours must be positive when set".to_string(),
            ));
        }
        if self.badges.sweep_interval_secs == Some(0) {
            return Err(CoreError::ConfigError(
                "badges.sweep_interval_secs must be positive when set".to_string(),
            ));
        }
        if self.auth.method == AuthMethod::SingleUser && self.auth.single_user.is_none() {
            return Err(CoreError::ConfigError(
                "auth.single_user section is required for single_user auth".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    note_dotenv(dotenvy::dotenv());

    let settings = Settings::load()?;
    tracing::debug!(
        auth_method = ?settings.auth.method,
        host = %settings.server.host,
        port = settings.server.port,
        "Configuration loaded"
    );
    Ok(settings)
}

/// A missing `.env` is normal; any other read failure is logged and ignored.
fn note_dotenv(result: std::result::Result<PathBuf, dotenvy::Error>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            Some(path)
        }
        Err(e) if e.not_found() => {
            tracing::trace!("No .env file found");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read .env file");
            None
        }
    }
}
