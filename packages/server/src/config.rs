use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the service that issues session tokens.
    pub jwt_secret: String,
}

/// Listing and view-counting knobs for the content service.
#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Page size used when the client omits `limit`. Default: 10.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Upper bound for `limit`. Default: 100.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Window during which repeated views from one `X-View-Session` count once.
    /// Zero disables debouncing. Default: 1800.
    #[serde(default = "default_view_debounce_secs")]
    pub view_debounce_secs: u64,
}

fn default_page_size() -> u64 {
    10
}
fn default_max_page_size() -> u64 {
    100
}
fn default_view_debounce_secs() -> u64 {
    1800
}

/// Upper bound for `view_debounce_secs`: 30 days.
pub const MAX_VIEW_DEBOUNCE_SECS: u64 = 30 * 24 * 60 * 60;

impl ContentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view_debounce_secs > MAX_VIEW_DEBOUNCE_SECS {
            return Err(ConfigError::Message(format!(
                "content.view_debounce_secs must be at most {MAX_VIEW_DEBOUNCE_SECS}"
            )));
        }
        Ok(())
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            view_debounce_secs: default_view_debounce_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONTENTHUB_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 50)?
            .set_default("content.default_page_size", 10)?
            .set_default("content.max_page_size", 100)?
            .set_default("content.view_debounce_secs", 1800)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., CONTENTHUB__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CONTENTHUB").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.content.validate()?;
        Ok(config)
    }
}
