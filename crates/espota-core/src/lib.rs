//! espota-core - Core types and decision logic for the ESP8266 OTA server
//!
//! This crate decides whether a device gets a new firmware image. It knows
//! nothing about HTTP frameworks: the API layer turns request headers into an
//! [`UpdateRequest`], calls [`decide`], and renders the outcome.
//!
//! # Usage
//!
//! ```ignore
//! use espota_core::{decide, Config, UpdateDecision};
//!
//! let config = Config::default();
//! match decide(&request, &config).await? {
//!     UpdateDecision::Available(target) => { /* send target.path */ }
//!     UpdateDecision::UpToDate { .. } => { /* 304 */ }
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod decision;
pub mod error;
pub mod firmware;
pub mod request;
pub mod version;

pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use config::{Config, ConfigError};
pub use decision::{decide, FirmwareTarget, UpdateDecision};
pub use error::{UpdateError, UpdateResult, RESOLUTION_FAILED_REASON};
pub use firmware::{md5_hex, DigestCache, FileStamp, FirmwareImage};
pub use request::UpdateRequest;
pub use version::VersionIdentifier;
