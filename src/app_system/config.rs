//! Runtime configuration, read from the environment (and `.env` via dotenvy
//! in the binary).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::clients::AdminSeed;
use crate::gateways::PayPalMode;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid { key: &'static str, expected: &'static str, value: String },
    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

#[derive(Clone, PartialEq)]
pub struct PayPalSettings {
    pub client_id: String,
    pub client_secret: String,
    pub mode: PayPalMode,
}

impl fmt::Debug for PayPalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayPalSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub actor_buffer_size: usize,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub mail_from: String,
    /// No key means emails are only logged.
    pub resend_api_key: Option<String>,
    pub admin_notify_email: Option<String>,
    /// No credentials means every payment call fails with an external-service error.
    pub paypal: Option<PayPalSettings>,
    pub currency: String,
    pub admin_seed: Option<AdminSeed>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("actor_buffer_size", &self.actor_buffer_size)
            .field("upload_dir", &self.upload_dir)
            .field("public_base_url", &self.public_base_url)
            .field("mail_from", &self.mail_from)
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "<redacted>"))
            .field("admin_notify_email", &self.admin_notify_email)
            .field("paypal", &self.paypal)
            .field("currency", &self.currency)
            .field("admin_seed", &self.admin_seed)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            actor_buffer_size: 32,
            upload_dir: PathBuf::from("./uploads"),
            public_base_url: "http://localhost:8080/uploads".to_string(),
            mail_from: "Order Desk <orders@localhost>".to_string(),
            resend_api_key: None,
            admin_notify_email: None,
            paypal: None,
            currency: "USD".to_string(),
            admin_seed: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let actor_buffer_size = match get("ACTOR_BUFFER_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ACTOR_BUFFER_SIZE",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            },
            None => defaults.actor_buffer_size,
        };

        let paypal = match (get("PAYPAL_CLIENT_ID"), get("PAYPAL_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => {
                let mode = match get("PAYPAL_MODE").as_deref() {
                    None | Some("sandbox") => PayPalMode::Sandbox,
                    Some("live") => PayPalMode::Live,
                    Some(other) => {
                        return Err(ConfigError::Invalid {
                            key: "PAYPAL_MODE",
                            expected: "sandbox or live",
                            value: other.to_string(),
                        })
                    }
                };
                Some(PayPalSettings { client_id, client_secret, mode })
            }
            (Some(_), None) => return Err(ConfigError::Incomplete("PAYPAL_CLIENT_ID", "PAYPAL_CLIENT_SECRET")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("PAYPAL_CLIENT_SECRET", "PAYPAL_CLIENT_ID")),
            (None, None) => None,
        };

        let admin_seed = match get("ADMIN_SEED_EMAIL") {
            Some(email) => Some(AdminSeed {
                name: get("ADMIN_SEED_NAME").unwrap_or_else(|| "Administrator".to_string()),
                username: get("ADMIN_SEED_USERNAME").unwrap_or_else(|| "admin".to_string()),
                email,
            }),
            None => None,
        };

        Ok(Self {
            actor_buffer_size,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            public_base_url: get("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            mail_from: get("MAIL_FROM").unwrap_or(defaults.mail_from),
            resend_api_key: get("RESEND_API_KEY"),
            admin_notify_email: get("ADMIN_NOTIFY_EMAIL"),
            paypal,
            currency: get("CURRENCY").map(|c| c.to_ascii_uppercase()).unwrap_or(defaults.currency),
            admin_seed,
        })
    }
}
