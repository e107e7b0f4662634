//! Error types for the BlueCat provider.

use thiserror::Error;

use crate::bam::properties::PropertyError;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested BAM object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A configuration or state value failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is missing configuration or was configured incorrectly.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or configuration value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A call to the BlueCat Address Manager API failed.
    #[error(transparent)]
    Bam(#[from] BamError),

    /// A BAM property string could not be parsed.
    #[error("Error parsing IPv4 network properties: {0}")]
    Properties(#[from] PropertyError),
}

/// Errors returned by a BlueCat Address Manager client.
#[derive(Debug, Error)]
pub enum BamError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("{operation} failed: {source}")]
    Http {
        /// The BAM method being called.
        operation: &'static str,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// BAM answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Api {
        /// The BAM method being called.
        operation: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The error text returned by BAM.
        message: String,
    },

    /// Authentication against BAM failed.
    #[error("BlueCat login failed: {0}")]
    Login(String),

    /// BAM answered with a body that could not be interpreted.
    #[error("{operation} returned an unexpected response: {message}")]
    Decode {
        /// The BAM method being called.
        operation: &'static str,
        /// What was wrong with the response.
        message: String,
    },
}

impl BamError {
    /// Build an [`BamError::Api`] error.
    pub fn api(operation: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Build a [`BamError::Decode`] error.
    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("IP4Network 42".to_string());
        assert_eq!(format!("{}", err), "Resource not found: IP4Network 42");

        let err = ProviderError::Validation("size must be positive".to_string());
        assert_eq!(format!("{}", err), "Validation error: size must be positive");

        let err = ProviderError::UnknownResource("bluecat_host_record".to_string());
        assert_eq!(
            format!("{}", err),
            "Unknown resource type: bluecat_host_record"
        );
    }

    #[test]
    fn test_bam_error_display() {
        let err = BamError::api("GetEntityById", 500, "internal error");
        assert_eq!(
            format!("{}", err),
            "GetEntityById failed with HTTP 500: internal error"
        );

        let err = BamError::decode("Login", "missing token");
        assert_eq!(
            format!("{}", err),
            "Login returned an unexpected response: missing token"
        );
    }

    #[test]
    fn test_bam_error_is_transparent() {
        let err: ProviderError = BamError::Login("bad credentials".to_string()).into();
        assert_eq!(format!("{}", err), "BlueCat login failed: bad credentials");
    }

    #[test]
    fn test_property_error_converts() {
        let err: ProviderError = PropertyError::MissingSeparator("CIDR".to_string()).into();
        assert!(format!("{}", err).starts_with("Error parsing IPv4 network properties"));
    }
}
