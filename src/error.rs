// tolino-cloud - Tolino Cloud Library Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Error types for tolino-cloud
//!
//! Every cloud operation fails with its own variant so callers can react to
//! the failing step instead of matching on message text. Domain variants
//! carry a [`Failure`] that tells a service-reported rejection apart from a
//! response that did not have the expected shape.
//!
//! Transport failures (connection refused, timeouts, TLS) are never folded
//! into a domain variant: they surface as [`CloudError::Transport`] exactly as
//! `reqwest` reported them.

use std::fmt;
use thiserror::Error;

/// Result type alias using our CloudError type
pub type Result<T> = std::result::Result<T, CloudError>;

/// Message used when the service rejected a call without saying why
pub const REASON_UNKNOWN: &str = "reason unknown";

/// Why a cloud operation failed after the transport delivered a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The service answered with an unexpected HTTP status.
    ///
    /// `message` is the service's `ResponseInfo.message` when the body had one.
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The response body was missing a field or had the wrong shape
    Malformed(String),
}

impl Failure {
    /// Create a Status failure
    pub fn status(status: u16, message: Option<String>) -> Self {
        Failure::Status { status, message }
    }

    /// Create a Malformed failure
    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Failure::Malformed(reason.into())
    }

    /// The message the service attached to its rejection, if any
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Failure::Status { message, .. } => message.as_deref(),
            Failure::Malformed(_) => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status { message: Some(message), .. } => f.write_str(message),
            Failure::Status { status, message: None } => {
                write!(f, "{} (HTTP {})", REASON_UNKNOWN, status)
            }
            Failure::Malformed(reason) => write!(f, "unexpected response: {}", reason),
        }
    }
}

/// Main error type for tolino-cloud
#[derive(Error, Debug)]
pub enum CloudError {
    // ===== Configuration =====

    /// Unknown partner id or invalid partner/client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ===== Session =====

    /// The partner site did not hand out its login cookie
    #[error("Login to {partner} failed")]
    Authentication { partner: String },

    /// The OAuth authorize step did not yield an authorization code
    #[error("OAuth code request failed: {0}")]
    Authorization(Failure),

    /// The authorization code could not be exchanged for tokens
    #[error("OAuth access token request failed: {0}")]
    TokenExchange(Failure),

    /// The refresh token could not be revoked
    #[error("Logout failed: {0}")]
    Revocation(Failure),

    /// An authenticated call was made without a usable session
    #[error("Not authenticated: log in first")]
    NotAuthenticated,

    /// The session is in the wrong state for the requested operation
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    // ===== Devices =====

    /// Hardware registration was rejected
    #[error("Device registration failed: {0}")]
    DeviceRegistration(Failure),

    /// Removing a device from the account failed
    #[error("Unregister {device_id} failed: {failure}")]
    DeviceUnregistration { device_id: String, failure: Failure },

    /// The device list could not be retrieved or parsed
    #[error("Device list request failed: {0}")]
    DeviceList(Failure),

    // ===== Catalog =====

    /// The inventory could not be retrieved or one of its records was malformed
    #[error("Inventory request failed: {0}")]
    CatalogParse(Failure),

    // ===== Content transfer =====

    /// File upload was rejected or returned no deliverable id
    #[error("File upload failed: {0}")]
    Upload(Failure),

    /// Deleting content failed
    #[error("Delete {id} failed: {failure}")]
    Delete { id: String, failure: Failure },

    /// The download location of a deliverable could not be resolved
    #[error("Download info request failed: {0}")]
    DownloadInfo(Failure),

    /// The content stream could not be fetched
    #[error("Download request failed: {0}")]
    Download(Failure),

    // ===== General =====

    /// Caller-supplied value cannot be used (e.g. not representable in a header)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ===== External Library Errors =====

    /// Network transport failure from reqwest
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl CloudError {
    /// Create a Configuration error with a message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        CloudError::Configuration(message.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        CloudError::InvalidInput(message.into())
    }

    /// Create an InvalidState error with a message
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        CloudError::InvalidState(message.into())
    }

    /// The failure detail of a domain error, if this is one
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CloudError::Authorization(f)
            | CloudError::TokenExchange(f)
            | CloudError::Revocation(f)
            | CloudError::DeviceRegistration(f)
            | CloudError::DeviceList(f)
            | CloudError::CatalogParse(f)
            | CloudError::Upload(f)
            | CloudError::DownloadInfo(f)
            | CloudError::Download(f) => Some(f),
            CloudError::DeviceUnregistration { failure, .. }
            | CloudError::Delete { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// The message the service attached to its rejection, if any
    pub fn service_message(&self) -> Option<&str> {
        self.failure().and_then(Failure::service_message)
    }

    /// HTTP status the service answered with, if the failure was service-reported
    pub fn status_code(&self) -> Option<u16> {
        match self.failure() {
            Some(Failure::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Check if error came from the network transport rather than the service
    pub fn is_transport(&self) -> bool {
        matches!(self, CloudError::Transport(_))
    }

    /// Check if error means the user has to log in (again)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            CloudError::Authentication { .. }
                | CloudError::Authorization(_)
                | CloudError::TokenExchange(_)
                | CloudError::NotAuthenticated
        ) || self.status_code() == Some(401)
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            CloudError::Authentication { partner } => {
                format!("Login to {} failed. Please check your credentials and try again.", partner)
            }
            CloudError::NotAuthenticated => "You are not logged in. Please log in first.".to_string(),
            CloudError::Transport(e) if e.is_timeout() => {
                "The cloud service did not answer in time. Please try again.".to_string()
            }
            CloudError::Transport(e) if e.is_connect() => {
                "Could not connect to the cloud service. Please check your connection.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_failure_with_message_displays_message() {
        let failure = Failure::status(400, Some("Device not found".to_string()));
        assert_eq!(failure.to_string(), "Device not found");
        assert_eq!(failure.service_message(), Some("Device not found"));
    }

    #[test]
    fn test_status_failure_without_message_is_reason_unknown() {
        let failure = Failure::status(500, None);
        assert_eq!(failure.to_string(), "reason unknown (HTTP 500)");
        assert_eq!(failure.service_message(), None);
    }

    #[test]
    fn test_unregister_error_carries_device_and_message() {
        let err = CloudError::DeviceUnregistration {
            device_id: "abc".to_string(),
            failure: Failure::status(400, Some("nope".to_string())),
        };
        assert_eq!(err.to_string(), "Unregister abc failed: nope");
        assert_eq!(err.service_message(), Some("nope"));
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_malformed_has_no_service_message() {
        let err = CloudError::CatalogParse(Failure::malformed("missing field `title`"));
        assert_eq!(err.service_message(), None);
        assert_eq!(err.status_code(), None);
        assert!(err.to_string().contains("missing field `title`"));
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(CloudError::NotAuthenticated.is_auth_error());
        assert!(CloudError::Authentication { partner: "x".into() }.is_auth_error());
        assert!(CloudError::Upload(Failure::status(401, None)).is_auth_error());
        assert!(!CloudError::Upload(Failure::status(500, None)).is_auth_error());
        assert!(!CloudError::configuration("x").is_transport());
    }

    #[test]
    fn test_user_message_for_login_failure() {
        let err = CloudError::Authentication { partner: "Hugendubel.de".to_string() };
        assert!(err.user_message().contains("Hugendubel.de"));
    }
}
