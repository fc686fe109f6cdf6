use std::env::var;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 10)
    pub request_timeout: Duration,

    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Database file path
    /// Env: DATABASE_PATH (default: "cloudsign.db")
    pub database_path: String,

    /// Base url of the cloud controller REST API
    /// Env: CONTROLLER_URL (default: "http://127.0.0.1:8080")
    pub controller_url: String,

    /// Timeout for a single controller request
    /// Env: CONTROLLER_TIMEOUT_SECS (default: 5)
    pub controller_timeout: Duration,

    /// Directory of layout json files
    /// Env: LAYOUTS_DIR (default: "layouts")
    pub layouts_dir: PathBuf,

    /// Directory of rule json files
    /// Env: RULES_DIR (default: "rules")
    pub rules_dir: PathBuf,

    /// Interval of the sign update tick
    /// Env: SIGN_TICK_MILLIS (default: 50)
    pub tick_interval: Duration,

    /// Interval of the server cache refresh
    /// Env: CACHE_REFRESH_MILLIS (default: 1000)
    pub cache_refresh_interval: Duration,

    /// Bearer token for mutating routes
    /// Env: ADMIN_TOKEN (optional, mutating routes answer 403 without it)
    pub admin_token: Option<String>,

    /// Rate limit for mutating operator routes (requests per second)
    /// Env: RATE_LIMIT_OPERATOR_PER_SEC (default: 2)
    pub rate_limit_operator_per_sec: u64,

    /// Burst size for operator routes
    /// Env: RATE_LIMIT_OPERATOR_BURST (default: 5)
    pub rate_limit_operator_burst: u32,

    /// Rate limit for read routes (requests per second)
    /// Env: RATE_LIMIT_READ_PER_SEC (default: 20)
    pub rate_limit_read_per_sec: u64,

    /// Burst size for read routes
    /// Env: RATE_LIMIT_READ_BURST (default: 40)
    pub rate_limit_read_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        let defaults = Self::default();
        Self {
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 10)),
            port: env_or_default("PORT", defaults.port),
            database_path: env_or_default_string("DATABASE_PATH", &defaults.database_path),
            controller_url: env_or_default_string("CONTROLLER_URL", &defaults.controller_url),
            controller_timeout: Duration::from_secs(env_or_default("CONTROLLER_TIMEOUT_SECS", 5)),
            layouts_dir: env_or_default_string("LAYOUTS_DIR", "layouts").into(),
            rules_dir: env_or_default_string("RULES_DIR", "rules").into(),
            tick_interval: Duration::from_millis(env_or_default("SIGN_TICK_MILLIS", 50)),
            cache_refresh_interval: Duration::from_millis(env_or_default("CACHE_REFRESH_MILLIS", 1000)),
            admin_token: var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            rate_limit_operator_per_sec: env_or_default(
                "RATE_LIMIT_OPERATOR_PER_SEC",
                defaults.rate_limit_operator_per_sec,
            ),
            rate_limit_operator_burst: env_or_default(
                "RATE_LIMIT_OPERATOR_BURST",
                defaults.rate_limit_operator_burst,
            ),
            rate_limit_read_per_sec: env_or_default("RATE_LIMIT_READ_PER_SEC", defaults.rate_limit_read_per_sec),
            rate_limit_read_burst: env_or_default("RATE_LIMIT_READ_BURST", defaults.rate_limit_read_burst),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_body_limit: 64 * 1024,
            request_timeout: Duration::from_secs(10),
            port: 3000,
            database_path: "cloudsign.db".to_string(),
            controller_url: "http://127.0.0.1:8080".to_string(),
            controller_timeout: Duration::from_secs(5),
            layouts_dir: PathBuf::from("layouts"),
            rules_dir: PathBuf::from("rules"),
            tick_interval: Duration::from_millis(50),
            cache_refresh_interval: Duration::from_secs(1),
            admin_token: None,
            rate_limit_operator_per_sec: 2,
            rate_limit_operator_burst: 5,
            rate_limit_read_per_sec: 20,
            rate_limit_read_burst: 40,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
