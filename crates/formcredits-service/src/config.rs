//! Service configuration.

use formcredits_core::CreditConfig;

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: String,

    /// Path to the RocksDB database directory.
    pub db_path: String,

    /// HMAC secret for validating user JWTs.
    pub auth_secret: Option<String>,

    /// Expected issuer claim on user JWTs.
    pub auth_issuer: String,

    /// API key for service-to-service requests.
    pub service_api_key: Option<String>,

    /// Payment processor API base URL.
    pub payments_api_url: Option<String>,

    /// Payment processor API key.
    pub payments_api_key: Option<String>,

    /// Secret for verifying payment webhook signatures.
    pub payments_webhook_secret: Option<String>,

    /// URL the checkout flow redirects back to on success.
    pub checkout_return_url: String,

    /// Allowed CORS origins. `*` allows any origin.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Credit configuration (signup bonus, costs, pack catalog).
    pub credits: CreditConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let credits = CreditConfig {
            signup_bonus: env_u64("FORMCREDITS_SIGNUP_BONUS", defaults.credits.signup_bonus),
            manual_form_cost: env_u64(
                "FORMCREDITS_MANUAL_FORM_COST",
                defaults.credits.manual_form_cost,
            ),
            file_import_cost: env_u64(
                "FORMCREDITS_FILE_IMPORT_COST",
                defaults.credits.file_import_cost,
            ),
            ai_form_cost: env_u64("FORMCREDITS_AI_FORM_COST", defaults.credits.ai_form_cost),
            packs: defaults.credits.packs,
        };

        Self {
            bind_addr: env_string("FORMCREDITS_BIND_ADDR", defaults.bind_addr),
            db_path: env_string("FORMCREDITS_DB_PATH", defaults.db_path),
            auth_secret: std::env::var("FORMCREDITS_AUTH_SECRET").ok(),
            auth_issuer: env_string("FORMCREDITS_AUTH_ISSUER", defaults.auth_issuer),
            service_api_key: std::env::var("FORMCREDITS_SERVICE_API_KEY").ok(),
            payments_api_url: std::env::var("FORMCREDITS_PAYMENTS_API_URL").ok(),
            payments_api_key: std::env::var("FORMCREDITS_PAYMENTS_API_KEY").ok(),
            payments_webhook_secret: std::env::var("FORMCREDITS_PAYMENTS_WEBHOOK_SECRET").ok(),
            checkout_return_url: env_string(
                "FORMCREDITS_CHECKOUT_RETURN_URL",
                defaults.checkout_return_url,
            ),
            cors_origins: std::env::var("FORMCREDITS_CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: std::env::var("FORMCREDITS_MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_u64(
                "FORMCREDITS_REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            credits,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: "./data/formcredits".to_string(),
            auth_secret: None,
            auth_issuer: "formcredits".to_string(),
            service_api_key: None,
            payments_api_url: None,
            payments_api_key: None,
            payments_webhook_secret: None,
            checkout_return_url: "http://localhost:3000/credits".to_string(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 256 * 1024,
            request_timeout_seconds: 30,
            credits: CreditConfig::default(),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
