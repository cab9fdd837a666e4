//! Configuration management for the chat relay.
//!
//! Configuration comes from the process environment (a `.env` file is loaded
//! by the binary before this is read). Provider credentials are optional at
//! startup; a provider without a key fails its upstream sessions instead.

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_FIREWORKS_API_BASE: &str = "https://api.fireworks.ai/inference/v1";

/// Main application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Server configuration (host, port)
    pub server: ServerConfig,

    /// Whether to verify SSL certificates for upstream requests
    pub verify_ssl: bool,

    /// Overall upstream request timeout. `None` leaves the call bounded only
    /// by the provider.
    pub request_timeout_secs: Option<u64>,

    /// Timeout for establishing the upstream TCP/TLS connection
    pub connect_timeout_secs: u64,

    /// Google Gemini endpoint and credentials
    pub gemini: ProviderConfig,

    /// Fireworks AI endpoint and credentials
    pub fireworks: ProviderConfig,
}

/// Endpoint and credentials for one upstream provider family.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Base URL for the provider's API
    pub api_base: String,

    /// API key for authentication
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_verify_ssl() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout(),
            gemini: ProviderConfig::new(DEFAULT_GEMINI_API_BASE, None),
            fireworks: ProviderConfig::new(DEFAULT_FIREWORKS_API_BASE, None),
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// Recognized variables: `HOST`, `PORT`, `VERIFY_SSL`,
    /// `REQUEST_TIMEOUT_SECS`, `CONNECT_TIMEOUT_SECS`, `GEMINI_API_KEY`,
    /// `GEMINI_API_BASE`, `FIREWORKS_API_KEY`, `FIREWORKS_API_BASE`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            config.server.port = port_str
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("Invalid PORT '{}': {}", port_str, e))?;
        }

        if let Ok(verify_ssl_str) = std::env::var("VERIFY_SSL") {
            config.verify_ssl = str_to_bool(&verify_ssl_str);
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(timeout_str.parse::<u64>().map_err(|e| {
                anyhow::anyhow!("Invalid REQUEST_TIMEOUT_SECS '{}': {}", timeout_str, e)
            })?);
        }

        if let Ok(timeout_str) = std::env::var("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = timeout_str.parse::<u64>().map_err(|e| {
                anyhow::anyhow!("Invalid CONNECT_TIMEOUT_SECS '{}': {}", timeout_str, e)
            })?;
        }

        config.gemini = ProviderConfig::new(
            env_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            non_empty_env("GEMINI_API_KEY"),
        );
        config.fireworks = ProviderConfig::new(
            env_or("FIREWORKS_API_BASE", DEFAULT_FIREWORKS_API_BASE),
            non_empty_env("FIREWORKS_API_KEY"),
        );

        Ok(config)
    }
}

fn env_or(name: &str, default: &str) -> String {
    non_empty_env(name).unwrap_or_else(|| default.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "VERIFY_SSL",
        "REQUEST_TIMEOUT_SECS",
        "CONNECT_TIMEOUT_SECS",
        "GEMINI_API_KEY",
        "GEMINI_API_BASE",
        "FIREWORKS_API_KEY",
        "FIREWORKS_API_BASE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_str_to_bool() {
        assert!(str_to_bool("true"));
        assert!(str_to_bool("TRUE"));
        assert!(str_to_bool("1"));
        assert!(str_to_bool("yes"));
        assert!(str_to_bool("On"));
        assert!(!str_to_bool("false"));
        assert!(!str_to_bool("0"));
        assert!(!str_to_bool(""));
        assert!(!str_to_bool("invalid"));
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.verify_ssl);
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.gemini.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.fireworks.api_base, DEFAULT_FIREWORKS_API_BASE);
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_provider_config_trims_trailing_slash() {
        let config = ProviderConfig::new("http://localhost:9000/", None);
        assert_eq!(config.api_base, "http://localhost:9000");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.fireworks.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("HOST", "127.0.0.1");
        std::env::set_var("PORT", "9999");
        std::env::set_var("VERIFY_SSL", "false");
        std::env::set_var("REQUEST_TIMEOUT_SECS", "120");
        std::env::set_var("GEMINI_API_KEY", "g-key");
        std::env::set_var("FIREWORKS_API_KEY", "  ");
        std::env::set_var("FIREWORKS_API_BASE", "http://localhost:8001/v1/");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9999);
        assert!(!config.verify_ssl);
        assert_eq!(config.request_timeout_secs, Some(120));
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));
        assert!(config.fireworks.api_key.is_none());
        assert_eq!(config.fireworks.api_base, "http://localhost:8001/v1");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        assert!(AppConfig::from_env().is_err());
        clear_env();
    }
}
