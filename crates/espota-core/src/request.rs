//! Update request model built from the ESP8266 updater's headers

use crate::error::{UpdateError, UpdateResult};
use crate::version::VersionIdentifier;

/// Header names sent by `ESP8266httpUpdate` (lowercase, as `http` stores them)
pub mod header {
    pub const USER_AGENT: &str = "user-agent";
    pub const STA_MAC: &str = "x-esp8266-sta-mac";
    pub const AP_MAC: &str = "x-esp8266-ap-mac";
    pub const FREE_SPACE: &str = "x-esp8266-free-space";
    pub const SKETCH_SIZE: &str = "x-esp8266-sketch-size";
    pub const SKETCH_MD5: &str = "x-esp8266-sketch-md5";
    pub const CHIP_SIZE: &str = "x-esp8266-chip-size";
    pub const SDK_VERSION: &str = "x-esp8266-sdk-version";
    pub const VERSION: &str = "x-esp8266-version";
    pub const MODE: &str = "x-esp8266-mode";
}

/// User-Agent sent by the ESP8266 Arduino core updater
pub const ESP8266_USER_AGENT: &str = "ESP8266-http-Update";

/// Everything the server reads from one update request
///
/// Every field is `None` when the header is absent. Presence is all that is
/// checked for the device headers; an empty value still counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    pub user_agent: Option<String>,
    pub sta_mac: Option<String>,
    pub ap_mac: Option<String>,
    pub free_space: Option<String>,
    pub sketch_size: Option<String>,
    pub sketch_md5: Option<String>,
    pub chip_size: Option<String>,
    pub sdk_version: Option<String>,
    /// Combined `<software>_<hardware>` version string
    pub version: Option<String>,
    /// `sketch` or `spiffs`; logged, never checked
    pub mode: Option<String>,
}

impl UpdateRequest {
    /// Build a request from a header lookup function keyed by lowercase name
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            user_agent: lookup(header::USER_AGENT),
            sta_mac: lookup(header::STA_MAC),
            ap_mac: lookup(header::AP_MAC),
            free_space: lookup(header::FREE_SPACE),
            sketch_size: lookup(header::SKETCH_SIZE),
            sketch_md5: lookup(header::SKETCH_MD5),
            chip_size: lookup(header::CHIP_SIZE),
            sdk_version: lookup(header::SDK_VERSION),
            version: lookup(header::VERSION),
            mode: lookup(header::MODE),
        }
    }

    /// Reject anything that is not the expected updater client
    pub fn check_client(&self, expected_user_agent: &str) -> UpdateResult<()> {
        match self.user_agent.as_deref() {
            Some(agent) if agent == expected_user_agent => Ok(()),
            _ => Err(UpdateError::ClientRejected),
        }
    }

    /// Require all device headers to be present
    pub fn check_device_headers(&self) -> UpdateResult<()> {
        let present = [
            &self.sta_mac,
            &self.ap_mac,
            &self.free_space,
            &self.sketch_size,
            &self.sketch_md5,
            &self.chip_size,
            &self.sdk_version,
        ]
        .iter()
        .all(|h| h.is_some());

        if present {
            Ok(())
        } else {
            Err(UpdateError::MissingHeaders)
        }
    }

    /// Parse the combined version header
    pub fn version_identifier(&self) -> UpdateResult<VersionIdentifier> {
        VersionIdentifier::parse(self.version.as_deref().unwrap_or_default())
    }

    /// Station MAC, or an empty string if absent
    pub fn station_mac(&self) -> &str {
        self.sta_mac.as_deref().unwrap_or_default()
    }
}
