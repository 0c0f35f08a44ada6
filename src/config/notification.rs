//! Notification configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Notification configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Resend API key
    pub api_key: String,

    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Per-send timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl NotificationConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATION_API_KEY"));
        }
        if !self.api_key.starts_with("re_") {
            return Err(ValidationError::InvalidNotificationApiKey);
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_from_email() -> String {
    "no-reply@vendaflow.app".to_string()
}

fn default_from_name() -> String {
    "Vendaflow".to_string()
}

fn default_timeout() -> u64 {
    5
}
