//! Error taxonomy for the update decision
//!
//! The `Display` text of each variant is exactly the line written to the
//! request log when a request is rejected.

use std::path::PathBuf;

use thiserror::Error;

/// Reason phrase sent with every 500 response from the update endpoint
pub const RESOLUTION_FAILED_REASON: &str = "no version for ESP MAC";

/// Result type for update decisions
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Reasons an update request is rejected
#[derive(Debug, Error)]
pub enum UpdateError {
    /// User-Agent missing or not the ESP8266 updater
    #[error("Invalid request.")]
    ClientRejected,

    /// One of the X-ESP8266-* device headers is missing
    #[error("Invalid request. Missing headers.")]
    MissingHeaders,

    /// Combined version header missing or too short
    #[error("Invalid version: {0}")]
    MalformedVersion(String),

    /// No usable catalog entry for this hardware revision
    #[error("Missing info for: {hardware_revision}")]
    CatalogMiss { hardware_revision: String },

    /// Catalog points at a file that is not in the binary store
    #[error(
        "Missing file: {} {hardware_revision} {software_version} = {catalog_version}",
        path.display()
    )]
    BinaryMissing {
        path: PathBuf,
        hardware_revision: String,
        software_version: String,
        catalog_version: String,
    },
}

impl UpdateError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            UpdateError::ClientRejected => 403,
            UpdateError::MissingHeaders => 403,
            UpdateError::MalformedVersion(_) => 500,
            UpdateError::CatalogMiss { .. } => 500,
            UpdateError::BinaryMissing { .. } => 500,
        }
    }

    /// Reason phrase to send instead of the canonical one, if any
    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self {
            UpdateError::ClientRejected | UpdateError::MissingHeaders => None,
            _ => Some(RESOLUTION_FAILED_REASON),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_messages() {
        assert_eq!(UpdateError::ClientRejected.to_string(), "Invalid request.");
        assert_eq!(
            UpdateError::MissingHeaders.to_string(),
            "Invalid request. Missing headers."
        );
        assert_eq!(
            UpdateError::MalformedVersion("1_A".into()).to_string(),
            "Invalid version: 1_A"
        );
        assert_eq!(
            UpdateError::CatalogMiss {
                hardware_revision: "ABCD".into()
            }
            .to_string(),
            "Missing info for: ABCD"
        );

        let err = UpdateError::BinaryMissing {
            path: PathBuf::from("bin/fw_2_0.bin"),
            hardware_revision: "ABCD".into(),
            software_version: "1.9".into(),
            catalog_version: "2.0".into(),
        };
        assert_eq!(err.to_string(), "Missing file: bin/fw_2_0.bin ABCD 1.9 = 2.0");
    }

    #[test]
    fn test_status_and_reason() {
        assert_eq!(UpdateError::ClientRejected.status_code(), 403);
        assert_eq!(UpdateError::MissingHeaders.status_code(), 403);
        assert_eq!(UpdateError::ClientRejected.reason_phrase(), None);

        let miss = UpdateError::CatalogMiss {
            hardware_revision: "ABCD".into(),
        };
        assert_eq!(miss.status_code(), 500);
        assert_eq!(miss.reason_phrase(), Some(RESOLUTION_FAILED_REASON));
        assert_eq!(
            UpdateError::MalformedVersion(String::new()).reason_phrase(),
            Some("no version for ESP MAC")
        );
    }
}
