use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://smartrecruit-9ofm.onrender.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the recruitment API lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `RECRUIT_API_BASE` and `RECRUIT_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base = env::var("RECRUIT_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.into());
        let timeout = env::var("RECRUIT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(base).with_timeout(Duration::from_secs(timeout))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join a path onto the base. Paths keep the server's trailing slash.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_trailing_slash_is_normalized() {
        let config = ApiConfig::new("http://localhost:8000/api/");
        assert_eq!(
            config.url("/test-schedule/42/"),
            "http://localhost:8000/api/test-schedule/42/"
        );
    }
}
