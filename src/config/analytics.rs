//! Analytics forwarding configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Analytics forwarding configuration (third-party conversion tracking)
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Whether forwarding is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Tracking endpoint URL
    pub endpoint: Option<String>,

    /// API token sent as a bearer header
    pub api_token: Option<String>,

    /// Per-forward timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AnalyticsConfig {
    /// Validate analytics configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }
        match &self.endpoint {
            None => Err(ValidationError::MissingRequired("ANALYTICS_ENDPOINT")),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                Err(ValidationError::InvalidAnalyticsEndpoint)
            }
            Some(_) => Ok(()),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    3
}
