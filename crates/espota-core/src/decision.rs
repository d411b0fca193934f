//! The update decision
//!
//! Runs the checks in order and stops at the first failure:
//!
//! ```text
//! Received -> ClientChecked -> HeadersChecked -> VersionParsed
//!          -> CatalogResolved -> FileResolved -> { Available | UpToDate }
//! ```
//!
//! Any failure is an [`UpdateError`] and ends the request.

use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{UpdateError, UpdateResult};
use crate::request::UpdateRequest;
use crate::version::VersionIdentifier;

/// Firmware chosen for a device that needs an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareTarget {
    /// What the device reported
    pub device: VersionIdentifier,
    /// Version published in the catalog
    pub catalog_version: String,
    /// Binary inside the store
    pub path: PathBuf,
}

/// Outcome of a request that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Catalog version differs from the device: send the binary
    Available(FirmwareTarget),
    /// Device already runs the catalog version
    UpToDate {
        station_mac: String,
        device: VersionIdentifier,
    },
}

impl UpdateDecision {
    /// Request log line for this outcome
    pub fn log_message(&self) -> String {
        match self {
            UpdateDecision::Available(target) => format!(
                "Update: {} {} -> {}",
                target.device.hardware_revision,
                target.device.software_version,
                target.catalog_version
            ),
            UpdateDecision::UpToDate {
                station_mac,
                device,
            } => format!("Up to date: {}  {}", station_mac, device),
        }
    }
}

/// Decide what to answer a device
///
/// The catalog is read fresh on every call. A catalog that cannot be read or
/// parsed counts as a miss for the requested hardware revision.
pub async fn decide(request: &UpdateRequest, config: &Config) -> UpdateResult<UpdateDecision> {
    request.check_client(&config.update.user_agent)?;
    request.check_device_headers()?;
    let device = request.version_identifier()?;

    let catalog_path = config.catalog_path();
    let catalog = match Catalog::load(&catalog_path).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(
                path = %catalog_path.display(),
                error = %e,
                "Failed to load firmware catalog"
            );
            return Err(catalog_miss(&device));
        }
    };

    let entry = catalog
        .entry(&device.hardware_revision)
        .ok_or_else(|| catalog_miss(&device))?;

    let path = entry.path_in(&config.store.binary_dir).ok_or_else(|| {
        tracing::warn!(
            hardware_revision = %device.hardware_revision,
            file = %entry.file,
            "Catalog file name points outside the binary store"
        );
        catalog_miss(&device)
    })?;

    if !is_file(&path).await {
        return Err(UpdateError::BinaryMissing {
            path,
            hardware_revision: device.hardware_revision,
            software_version: device.software_version,
            catalog_version: entry.version,
        });
    }

    if entry.version != device.software_version {
        Ok(UpdateDecision::Available(FirmwareTarget {
            device,
            catalog_version: entry.version,
            path,
        }))
    } else {
        Ok(UpdateDecision::UpToDate {
            station_mac: request.station_mac().to_string(),
            device,
        })
    }
}

fn catalog_miss(device: &VersionIdentifier) -> UpdateError {
    UpdateError::CatalogMiss {
        hardware_revision: device.hardware_revision.clone(),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
