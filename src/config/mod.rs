use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::explorer::Variant;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Tree source settings.
    pub trees: TreeSourceConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// HTTP request settings.
    pub request: RequestConfig,
    /// Session limits.
    pub sessions: SessionConfig,
}

/// Where trees come from and which slug backs each variant
#[derive(Debug, Clone)]
pub struct TreeSourceConfig {
    /// Tree service base URL.
    pub base_url: String,
    /// When set, trees are read from `{data_dir}/{slug}.json` instead of over HTTP.
    pub data_dir: Option<PathBuf>,
    /// Slug of the windows tree.
    pub windows_slug: String,
    /// Slug of the linux tree.
    pub linux_slug: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite file.
    pub path: PathBuf,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// JSON lines.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Session (tab) limits
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum tabs per variant.
    pub max_sessions: usize,
}

/// Default number of tabs a variant may hold.
pub const DEFAULT_MAX_SESSIONS: usize = 10;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = env::var("TREE_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config {
                message: format!("TREE_API_BASE_URL must be an http(s) URL, got '{}'", base_url),
            });
        }

        let trees = TreeSourceConfig {
            base_url,
            data_dir: env::var("TREE_DATA_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            windows_slug: env::var("TREE_SLUG_WINDOWS")
                .unwrap_or_else(|_| "nmap-basics-windows".to_string()),
            linux_slug: env::var("TREE_SLUG_LINUX")
                .unwrap_or_else(|_| "nmap-basics-linux".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/tracetree.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        let sessions = SessionConfig {
            max_sessions: env::var("MAX_SESSIONS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(DEFAULT_MAX_SESSIONS),
        };

        Ok(Config {
            trees,
            database,
            logging,
            request,
            sessions,
        })
    }
}

impl TreeSourceConfig {
    /// Tree slug for the given variant
    pub fn slug(&self, variant: Variant) -> &str {
        match variant {
            Variant::Windows => &self.windows_slug,
            Variant::Linux => &self.linux_slug,
        }
    }
}

impl Default for TreeSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            data_dir: None,
            windows_slug: "nmap-basics-windows".to_string(),
            linux_slug: "nmap-basics-linux".to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}
