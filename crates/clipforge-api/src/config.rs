//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Wall-clock budget for one compilation, in seconds
    pub compile_deadline_secs: u64,
    /// Regular face for quote rendering
    pub quote_font_regular: PathBuf,
    /// Bold face for quote rendering
    pub quote_font_bold: PathBuf,
    /// Optional logo composited onto quote images
    pub quote_logo: Option<PathBuf>,
    /// Download limit per source, in bytes
    pub max_source_bytes: u64,
    /// Per-download request timeout
    pub fetch_timeout: Duration,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 64 * 1024,
            compile_deadline_secs: 300,
            quote_font_regular: PathBuf::from("assets/fonts/Inter-Regular.ttf"),
            quote_font_bold: PathBuf::from("assets/fonts/Inter-Bold.ttf"),
            quote_logo: None,
            max_source_bytes: 200 * 1024 * 1024,
            fetch_timeout: Duration::from_secs(60),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            compile_deadline_secs: std::env::var("COMPILE_DEADLINE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compile_deadline_secs),
            quote_font_regular: std::env::var("QUOTE_FONT_REGULAR")
                .map(PathBuf::from)
                .unwrap_or(defaults.quote_font_regular),
            quote_font_bold: std::env::var("QUOTE_FONT_BOLD")
                .map(PathBuf::from)
                .unwrap_or(defaults.quote_font_bold),
            quote_logo: std::env::var("QUOTE_LOGO").ok().map(PathBuf::from),
            max_source_bytes: std::env::var("MAX_SOURCE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_source_bytes),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
