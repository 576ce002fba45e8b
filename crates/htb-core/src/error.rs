//! Error types for Hack The Box API operations.
//!
//! Every failure of the request/response layer and of the domain operations is
//! reported through [`Error`]. Nothing in this crate retries; each error is
//! terminal and handed back to the caller.

use thiserror::Error;

/// Main error type for Hack The Box API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Host and path did not compose into a valid URL
    #[error("Malformed URL `{url}`: {source}")]
    MalformedUrl {
        /// The URL text that failed to parse
        url: String,
        /// Underlying parse failure
        #[source]
        source: url::ParseError,
    },

    /// The outbound request object could not be built
    #[error("Failed to construct request: {0}")]
    RequestConstructionFailed(String),

    /// Network, DNS, timeout or cancellation failure
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// Failure status whose body was not an error envelope
    #[error("Unexpected status code: {status}")]
    UnexpectedStatusCode {
        /// HTTP status code
        status: u16,
    },

    /// Failure status carrying a server message
    #[error("API error: status code {status}: {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Message reported by the server
        message: String,
    },

    /// Success status with a body that is not JSON
    #[error("Unexpected content type `{actual}`, expected `{expected}`")]
    UnexpectedContentType {
        /// Content type the operation requires
        expected: String,
        /// Content type the server sent (empty when absent)
        actual: String,
    },

    /// Success payload failed to decode
    #[error("Failed to decode response: {0}")]
    DecodeError(#[from] serde_json::Error),

    /// No machine matched a lookup expected to be unique
    #[error("Machine not found: {name}")]
    MachineNotFound {
        /// Name that was searched for
        name: String,
    },

    /// Several machines matched a lookup expected to be unique
    #[error("Multiple machines found for the name: {name}")]
    MultipleMachinesFound {
        /// Name that was searched for
        name: String,
    },

    /// The account has no running lab machine
    #[error("No active lab machine")]
    NoActiveLabMachine,

    /// The account has no VPN server assigned for the product
    #[error("No assigned VPN server")]
    NoAssignedVpnServer,

    /// A VPN server name matched none of the known subscription tiers
    #[error("Unknown subscription tier for VPN server `{friendly_name}`")]
    UnknownSubscriptionTier {
        /// Display name that could not be classified
        friendly_name: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Specialized result type for Hack The Box API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported while talking to the transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP transport itself failed (DNS, connect, TLS, timeout, body read)
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The request context was cancelled before the exchange finished
    #[error("request cancelled")]
    Cancelled,

    /// The request context deadline passed before the exchange finished
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedUrl { .. } => "MALFORMED_URL",
            Self::RequestConstructionFailed(_) => "REQUEST_CONSTRUCTION_FAILED",
            Self::TransportFailure(_) => "TRANSPORT_FAILURE",
            Self::UnexpectedStatusCode { .. } => "UNEXPECTED_STATUS_CODE",
            Self::ApiError { .. } => "API_ERROR",
            Self::UnexpectedContentType { .. } => "UNEXPECTED_CONTENT_TYPE",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::MachineNotFound { .. } => "MACHINE_NOT_FOUND",
            Self::MultipleMachinesFound { .. } => "MULTIPLE_MACHINES_FOUND",
            Self::NoActiveLabMachine => "NO_ACTIVE_LAB_MACHINE",
            Self::NoAssignedVpnServer => "NO_ASSIGNED_VPN_SERVER",
            Self::UnknownSubscriptionTier { .. } => "UNKNOWN_SUBSCRIPTION_TIER",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Returns the HTTP status code when the error came from a failure status.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatusCode { status } | Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the transport was cancelled or ran past its deadline.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure(TransportError::Cancelled | TransportError::DeadlineExceeded)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportFailure(TransportError::Http(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::RequestConstructionFailed("test".to_string()).error_code(),
            "REQUEST_CONSTRUCTION_FAILED"
        );
        assert_eq!(
            Error::UnexpectedStatusCode { status: 502 }.error_code(),
            "UNEXPECTED_STATUS_CODE"
        );
        assert_eq!(
            Error::ApiError {
                status: 404,
                message: "not found".to_string()
            }
            .error_code(),
            "API_ERROR"
        );
        assert_eq!(
            Error::MachineNotFound {
                name: "Lame".to_string()
            }
            .error_code(),
            "MACHINE_NOT_FOUND"
        );
        assert_eq!(Error::NoActiveLabMachine.error_code(), "NO_ACTIVE_LAB_MACHINE");
        assert_eq!(
            Error::NoAssignedVpnServer.error_code(),
            "NO_ASSIGNED_VPN_SERVER"
        );
        assert_eq!(
            Error::TransportFailure(TransportError::Cancelled).error_code(),
            "TRANSPORT_FAILURE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::ApiError {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error: status code 404: not found");

        let err = Error::UnexpectedContentType {
            expected: "application/json".to_string(),
            actual: "text/html".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected content type `text/html`, expected `application/json`"
        );

        let err = Error::MultipleMachinesFound {
            name: "Lame".to_string(),
        };
        assert_eq!(err.to_string(), "Multiple machines found for the name: Lame");
    }

    #[test]
    fn test_status_code() {
        assert_eq!(
            Error::UnexpectedStatusCode { status: 500 }.status_code(),
            Some(500)
        );
        assert_eq!(
            Error::ApiError {
                status: 401,
                message: "Unauthenticated.".to_string()
            }
            .status_code(),
            Some(401)
        );
        assert_eq!(Error::NoActiveLabMachine.status_code(), None);
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::TransportFailure(TransportError::Cancelled).is_cancelled());
        assert!(Error::TransportFailure(TransportError::DeadlineExceeded).is_cancelled());
        assert!(!Error::NoAssignedVpnServer.is_cancelled());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let htb_err: Error = err.into();
        assert!(matches!(htb_err, Error::DecodeError(_)));
        assert_eq!(htb_err.error_code(), "DECODE_ERROR");
    }

    #[test]
    fn test_malformed_url_keeps_source() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = Error::MalformedUrl {
            url: "not a url".to_string(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.error_code(), "MALFORMED_URL");
    }
}
