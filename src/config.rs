//! Provider configuration.
//!
//! Every attribute can be omitted from the configuration block and supplied
//! through the environment instead:
//!
//! - `BLUECAT_USERNAME`
//! - `BLUECAT_PASSWORD`
//! - `BLUECAT_ENDPOINT`
//! - `BLUECAT_SSL_VERIFY`

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::bam::properties::parse_bool;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Credentials and location of the BAM server.
#[derive(Clone, PartialEq, Eq)]
pub struct BamConfig {
    /// API user name.
    pub username: String,
    /// API password.
    pub password: String,
    /// Host name or URL of the BAM server.
    pub endpoint: String,
    /// Verify the server's TLS certificate.
    pub ssl_verify: bool,
}

// The password never reaches logs.
impl fmt::Debug for BamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BamConfig")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("ssl_verify", &self.ssl_verify)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    username: Option<String>,
    password: Option<String>,
    bluecat_endpoint: Option<String>,
    ssl_verify: Option<bool>,
}

impl BamConfig {
    /// Settings for `endpoint` with certificate verification on.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            endpoint: endpoint.into(),
            ssl_verify: true,
        }
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("BAM API user. Defaults to $BLUECAT_USERNAME."),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("BAM API password. Defaults to $BLUECAT_PASSWORD."),
            )
            .with_attribute(
                "bluecat_endpoint",
                Attribute::optional_string()
                    .with_description("BAM host name or URL. Defaults to $BLUECAT_ENDPOINT."),
            )
            .with_attribute(
                "ssl_verify",
                Attribute::optional_bool().with_description(
                    "Verify the BAM TLS certificate. Defaults to $BLUECAT_SSL_VERIFY or true.",
                ),
            )
    }

    /// Build the configuration from the provider block, falling back to the
    /// process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Like [`BamConfig::from_value`] with an explicit environment lookup.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?,
        };

        let mut diagnostics = Vec::new();
        let mut required = |value: Option<String>, attribute: &str, env_key: &str| {
            match value.or_else(|| env(env_key)).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    diagnostics.push(
                        Diagnostic::error(format!("Missing required attribute '{}'", attribute))
                            .with_detail(format!(
                                "Set '{}' in the provider configuration or the {} environment variable",
                                attribute, env_key
                            ))
                            .with_attribute(attribute),
                    );
                    String::new()
                }
            }
        };

        let username = required(raw.username, "username", "BLUECAT_USERNAME");
        let password = required(raw.password, "password", "BLUECAT_PASSWORD");
        let endpoint = required(raw.bluecat_endpoint, "bluecat_endpoint", "BLUECAT_ENDPOINT");

        let ssl_verify = match raw.ssl_verify {
            Some(v) => v,
            None => match env("BLUECAT_SSL_VERIFY") {
                Some(v) => parse_bool("BLUECAT_SSL_VERIFY", &v).unwrap_or_else(|e| {
                    diagnostics.push(
                        Diagnostic::error("Invalid ssl_verify value")
                            .with_detail(e.to_string())
                            .with_attribute("ssl_verify"),
                    );
                    true
                }),
                None => true,
            },
        };

        if diagnostics.is_empty() {
            Ok(Self {
                username,
                password,
                endpoint,
                ssl_verify,
            })
        } else {
            Err(diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_config_block() {
        let config = BamConfig::from_value_with_env(
            &json!({
                "username": "admin",
                "password": "secret",
                "bluecat_endpoint": "bam.example.com",
                "ssl_verify": false
            }),
            env_from(&[]),
        )
        .unwrap();

        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert_eq!(config.endpoint, "bam.example.com");
        assert!(!config.ssl_verify);
    }

    #[test]
    fn test_env_fallback() {
        let config = BamConfig::from_value_with_env(
            &json!({"username": "admin"}),
            env_from(&[
                ("BLUECAT_USERNAME", "ignored"),
                ("BLUECAT_PASSWORD", "from-env"),
                ("BLUECAT_ENDPOINT", "10.0.0.5"),
                ("BLUECAT_SSL_VERIFY", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "from-env");
        assert_eq!(config.endpoint, "10.0.0.5");
        assert!(!config.ssl_verify);
    }

    #[test]
    fn test_ssl_verify_defaults_true() {
        let config = BamConfig::from_value_with_env(
            &Value::Null,
            env_from(&[
                ("BLUECAT_USERNAME", "admin"),
                ("BLUECAT_PASSWORD", "secret"),
                ("BLUECAT_ENDPOINT", "bam"),
            ]),
        )
        .unwrap();

        assert!(config.ssl_verify);
    }

    #[test]
    fn test_missing_attributes_reported() {
        let diagnostics =
            BamConfig::from_value_with_env(&json!({"username": "admin"}), env_from(&[]))
                .unwrap_err();

        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attributes, vec!["password", "bluecat_endpoint"]);
    }

    #[test]
    fn test_invalid_ssl_verify_env() {
        let diagnostics = BamConfig::from_value_with_env(
            &json!({"username": "a", "password": "b", "bluecat_endpoint": "c"}),
            env_from(&[("BLUECAT_SSL_VERIFY", "sometimes")]),
        )
        .unwrap_err();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("ssl_verify"));
    }

    #[test]
    fn test_wrong_type_is_diagnostic() {
        let diagnostics =
            BamConfig::from_value_with_env(&json!({"ssl_verify": "yes"}), env_from(&[]))
                .unwrap_err();
        assert_eq!(diagnostics[0].summary, "Invalid provider configuration");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = BamConfig::new("admin", "hunter2", "bam");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
    }
}
