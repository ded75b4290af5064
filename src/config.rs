use dotenvy::dotenv;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the remote cart resource.
#[derive(Clone, Debug)]
pub struct CartConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl CartConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        CartConfig {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `CART_BASE_URL` and `CART_REQUEST_TIMEOUT_SECS` from the
    /// environment, falling back to defaults when unset.
    pub fn from_env() -> Self {
        dotenv().ok();

        let base_url =
            std::env::var("CART_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());

        let timeout = std::env::var("CART_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        CartConfig { base_url, timeout }
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        CartConfig::new(DEFAULT_BASE_URL)
    }
}
