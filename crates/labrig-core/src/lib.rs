//! Core types and configuration for labrig.
//!
//! This crate defines the bundle catalog ([`Catalog`]), base image families
//! ([`family`]), the `labrig.toml` schema ([`LabrigConfig`]), the resolution
//! [`Context`], `renv.lock` parsing ([`Lockfile`]), and shared error and
//! diagnostic types.

pub mod catalog;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod family;
pub mod lockfile;
pub mod version;

pub use catalog::{Catalog, LibraryBundle, PackageBundle, PackageManager, Profile};
pub use config::{BuildConfig, LabrigConfig, ProjectConfig, RegistryConfig, Role};
pub use context::Context;
pub use diagnostics::{Diagnostics, Severity, Violation, Warning, WarningKind};
pub use error::{Error, ErrorKind, Result};
pub use family::{FamilyRule, ImageFamily, RInstaller};
pub use lockfile::Lockfile;
pub use version::{RVersion, VersionSource, VersionSpec};
