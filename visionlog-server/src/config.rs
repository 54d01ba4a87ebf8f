//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::time::Duration;

use visionlog_core::bigquery::DEFAULT_BIGQUERY_API_URL;
use visionlog_core::token::DEFAULT_METADATA_TOKEN_URL;
use visionlog_core::vision::DEFAULT_VISION_API_URL;
use visionlog_core::{DEFAULT_API_TIMEOUT, INSERT_RETRY_DELAY};

/// Suffix removed from the default hostname to obtain the project id.
pub const APPSPOT_SUFFIX: &str = ".appspot.com";

/// Default login URL template; `{continue}` receives the encoded return URL.
pub const DEFAULT_LOGIN_URL_TEMPLATE: &str =
    "https://accounts.google.com/ServiceLogin?continue={continue}";

/// Allowance for token refreshes and local work on top of the API calls.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(20);

/// Shortest request timeout that lets an upload run to completion: one
/// annotate call and two insert attempts, each bounded by
/// `DEFAULT_API_TIMEOUT`, plus the pause between the inserts.
pub fn min_request_timeout() -> Duration {
    DEFAULT_API_TIMEOUT * 3 + INSERT_RETRY_DELAY + REQUEST_TIMEOUT_MARGIN
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 33, one more than the upload cap for form overhead)
    pub body_limit_mb: usize,
    /// Maximum uploaded file size in MB (default: 32)
    pub max_upload_mb: usize,
    /// Request timeout in seconds (default: 120, at least [`min_request_timeout`])
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Default hostname of the deployment, e.g. `my-app.appspot.com`
    pub default_hostname: String,
    /// Deployment version shown on the landing page
    pub version_id: String,
    /// Emails of users allowed on the admin endpoints
    pub admin_emails: Vec<String>,
    /// Login URL template with a `{continue}` placeholder
    pub login_url_template: String,
    /// Vision API base URL
    pub vision_api_url: String,
    /// BigQuery API base URL
    pub bigquery_api_url: String,
    /// Static OAuth2 token (development); the metadata server is used when unset
    pub access_token: Option<String>,
    /// Metadata server token endpoint
    pub metadata_token_url: String,
    /// Destination dataset
    pub dataset_id: String,
    /// Destination table
    pub table_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 33,
            max_upload_mb: 32,
            timeout_secs: 120,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            default_hostname: "localhost.appspot.com".to_string(),
            version_id: env!("CARGO_PKG_VERSION").to_string(),
            admin_emails: Vec::new(),
            login_url_template: DEFAULT_LOGIN_URL_TEMPLATE.to_string(),
            vision_api_url: DEFAULT_VISION_API_URL.to_string(),
            bigquery_api_url: DEFAULT_BIGQUERY_API_URL.to_string(),
            access_token: None,
            metadata_token_url: DEFAULT_METADATA_TOKEN_URL.to_string(),
            dataset_id: "demo".to_string(),
            table_id: "vision".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|v| split_list(&v));

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.body_limit_mb);

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_upload_mb);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);
        if Duration::from_secs(timeout_secs) < min_request_timeout() {
            tracing::warn!(
                timeout_secs,
                minimum_secs = min_request_timeout().as_secs(),
                "REQUEST_TIMEOUT_SECS can cut off the insert retry"
            );
        }

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_sec);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_burst);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let default_hostname = std::env::var("DEFAULT_VERSION_HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .or_else(|| {
                std::env::var("GOOGLE_CLOUD_PROJECT")
                    .ok()
                    .map(|p| format!("{p}{APPSPOT_SUFFIX}"))
            })
            .unwrap_or(defaults.default_hostname);

        let version_id = std::env::var("GAE_VERSION").unwrap_or(defaults.version_id);

        let admin_emails = std::env::var("ADMIN_EMAILS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let login_url_template =
            std::env::var("LOGIN_URL_TEMPLATE").unwrap_or(defaults.login_url_template);

        let vision_api_url = std::env::var("VISION_API_URL").unwrap_or(defaults.vision_api_url);
        let bigquery_api_url =
            std::env::var("BIGQUERY_API_URL").unwrap_or(defaults.bigquery_api_url);

        let access_token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let metadata_token_url =
            std::env::var("METADATA_TOKEN_URL").unwrap_or(defaults.metadata_token_url);

        let dataset_id = std::env::var("BQ_DATASET").unwrap_or(defaults.dataset_id);
        let table_id = std::env::var("BQ_TABLE").unwrap_or(defaults.table_id);

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            max_upload_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            default_hostname,
            version_id,
            admin_emails,
            login_url_template,
            vision_api_url,
            bigquery_api_url,
            access_token,
            metadata_token_url,
            dataset_id,
            table_id,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Project id of the deployment
    pub fn project_id(&self) -> String {
        project_id_from_hostname(&self.default_hostname)
    }

    /// Public base URL used for login return addresses
    pub fn public_base_url(&self) -> String {
        format!("https://{}", self.default_hostname)
    }
}

/// `my-app.appspot.com` -> `my-app`
pub fn project_id_from_hostname(hostname: &str) -> String {
    hostname.replacen(APPSPOT_SUFFIX, "", 1)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
