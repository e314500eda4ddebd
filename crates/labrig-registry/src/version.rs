//! R version priority chain, lockfile drift detection, and the remote
//! existence check.

use crate::client::RegistryClient;
use crate::transport::{RegistryTransport, TagLookup};
use labrig_core::{
    Diagnostics, Error, Lockfile, RVersion, Result, VersionSource, VersionSpec, WarningKind,
};
use std::path::Path;

/// Pick the R version: explicit flag, then `[build].r_version`, then the lockfile.
///
/// The lockfile is read only when it exists. When a flag or config version
/// is given and the lockfile pins a different one, the drift is an error.
pub fn resolve_version(
    explicit: Option<&str>,
    config_default: Option<&str>,
    lockfile_path: &Path,
) -> Result<VersionSpec> {
    let requested = explicit
        .map(|v| (v.trim(), VersionSource::Explicit))
        .or_else(|| config_default.map(|v| (v.trim(), VersionSource::Config)));

    if let Some((version, origin)) = requested {
        validate_format(version, origin)?;
    }

    let lockfile = Lockfile::load_optional(lockfile_path)?;

    let spec = match (requested, lockfile) {
        (Some((version, origin)), Some(lock)) => {
            if version != lock.r_version {
                return Err(Error::VersionMismatch {
                    requested: version.to_owned(),
                    origin,
                    lockfile: lock.r_version,
                    lockfile_path: lockfile_path.to_path_buf(),
                });
            }
            VersionSpec::new(version, origin)
        }
        (Some((version, origin)), None) => VersionSpec::new(version, origin),
        (None, Some(lock)) => {
            validate_format(&lock.r_version, VersionSource::Lockfile)?;
            VersionSpec::new(lock.r_version, VersionSource::Lockfile)
        }
        (None, None) => {
            return Err(Error::VersionIndeterminate {
                lockfile: lockfile_path.to_path_buf(),
            });
        }
    };

    tracing::info!(version = %spec.version, source = ?spec.source, "resolved R version");
    Ok(spec)
}

/// `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`, all numeric.
pub fn validate_format(version: &str, origin: VersionSource) -> Result<RVersion> {
    RVersion::parse(version).ok_or_else(|| Error::InvalidVersionFormat {
        version: version.to_owned(),
        origin,
    })
}

/// Confirm the version exists in the registry.
///
/// An unreachable registry is not fatal: the version is returned unconfirmed
/// and a warning is recorded.
pub async fn validate_version<T: RegistryTransport>(
    mut spec: VersionSpec,
    client: &RegistryClient<T>,
    diagnostics: &mut Diagnostics,
) -> Result<VersionSpec> {
    match client.check(&spec.version).await {
        Ok(TagLookup::Found) => {
            spec.confirmed = true;
            Ok(spec)
        }
        Ok(TagLookup::NotFound) => {
            let suggestion = match client.highest_version().await {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(error = %e, "could not list tags for a suggestion");
                    None
                }
            };
            Err(Error::VersionNotFound {
                version: spec.version,
                repository: client.repository().to_owned(),
                suggestion,
            })
        }
        Err(e) => {
            diagnostics.warn(
                WarningKind::RegistryUnreachable,
                format!(
                    "could not confirm R {} in {}: {e}; continuing unverified",
                    spec.version,
                    client.repository()
                ),
            );
            Ok(spec)
        }
    }
}
