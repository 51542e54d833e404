use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8080)
    pub port: u16,
    pub identity: IdentityConfig,
    pub store: StoreConfig,
    pub telegram: TelegramConfig,
    pub update: UpdateConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
}

/// Identity provider settings: the account-operations endpoint and the
/// parameters used to validate its ID tokens.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the provider's REST API
    /// (default: https://identitytoolkit.googleapis.com)
    pub base_url: String,
    /// Project API key appended to account operations
    pub api_key: String,
    /// Expected `iss` claim of ID tokens
    pub issuer: String,
    /// Expected `aud` claim of ID tokens
    pub audience: String,
    /// JWKS endpoint publishing the provider's signing keys
    pub jwks_url: String,
}

/// Hosted profile store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store's REST surface
    pub base_url: String,
    /// Service key with row-level-security bypass
    pub service_key: String,
}

/// Optional pricing-order forwarding. Both fields must be set for the
/// notifier to be active.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// Optional version polling.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// URL serving the current version manifest; polling is disabled when
    /// unset
    pub version_url: Option<String>,
    /// Poll interval in seconds (default: 30)
    pub interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// CORS allowed origins (comma-separated, default: *)
    pub origins: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            identity: IdentityConfig {
                base_url: env::var("IDENTITY_BASE_URL")
                    .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com".to_string()),
                api_key: env::var("IDENTITY_API_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("IDENTITY_API_KEY"))?,
                issuer: env::var("IDENTITY_ISSUER")
                    .map_err(|_| ConfigError::MissingEnvVar("IDENTITY_ISSUER"))?,
                audience: env::var("IDENTITY_AUDIENCE")
                    .map_err(|_| ConfigError::MissingEnvVar("IDENTITY_AUDIENCE"))?,
                jwks_url: env::var("IDENTITY_JWKS_URL")
                    .map_err(|_| ConfigError::MissingEnvVar("IDENTITY_JWKS_URL"))?,
            },
            store: StoreConfig {
                base_url: env::var("STORE_URL")
                    .map_err(|_| ConfigError::MissingEnvVar("STORE_URL"))?,
                service_key: env::var("STORE_SERVICE_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("STORE_SERVICE_KEY"))?,
            },
            telegram: TelegramConfig {
                bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            },
            update: UpdateConfig {
                version_url: env::var("VERSION_URL").ok(),
                interval_secs: env::var("UPDATE_INTERVAL_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("UPDATE_INTERVAL_SECS"))?,
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            cors: CorsConfig {
                origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
    #[error("Invalid port number")]
    InvalidPort,
}
