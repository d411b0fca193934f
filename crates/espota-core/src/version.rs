//! Combined version string parsing
//!
//! Devices report `<softwareVersion>_<hardwareRevision>` in one header. The
//! hardware revision is always the last four characters; the character in
//! front of it is a separator and is dropped without being checked.

use std::fmt;
use std::str::FromStr;

use crate::error::UpdateError;

/// Fixed width of the hardware revision suffix
pub const HARDWARE_REVISION_LEN: usize = 4;

/// Shortest combined string accepted (suffix plus separator)
pub const MIN_VERSION_LEN: usize = HARDWARE_REVISION_LEN + 1;

/// Software version and hardware revision reported by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionIdentifier {
    pub software_version: String,
    pub hardware_revision: String,
}

impl VersionIdentifier {
    /// Parse a combined version string such as `1.2.3_ABCD`
    ///
    /// Lengths are counted in characters, not bytes, so a multi-byte
    /// character is never split. A byte count would accept `ÄÖÜß` (8 bytes);
    /// here it is 4 characters and rejected as too short.
    pub fn parse(combined: &str) -> Result<Self, UpdateError> {
        let len = combined.chars().count();
        if len < MIN_VERSION_LEN {
            return Err(UpdateError::MalformedVersion(combined.to_string()));
        }

        let hardware_start = char_offset(combined, len - HARDWARE_REVISION_LEN);
        let software_end = char_offset(combined, len - MIN_VERSION_LEN);

        Ok(Self {
            software_version: combined[..software_end].to_string(),
            hardware_revision: combined[hardware_start..].to_string(),
        })
    }
}

/// Byte offset of the `n`th character
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

impl FromStr for VersionIdentifier {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HW: {} SW: {}", self.hardware_revision, self.software_version)
    }
}
