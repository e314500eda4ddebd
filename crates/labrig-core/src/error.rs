use std::path::PathBuf;

use serde::Serialize;

use crate::diagnostics::Violation;
use crate::version::VersionSource;

pub type Result<T> = std::result::Result<T, Error>;

/// Machine-distinguishable error kind, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConfigLoad,
    ConfigParse,
    CatalogNotFound,
    CatalogMalformed,
    UnknownProfile,
    IncompatibleCombination,
    RestrictedOverrideDenied,
    VersionIndeterminate,
    InvalidVersionFormat,
    VersionNotFound,
    VersionMismatch,
    RegistryUnreachable,
    LockfileRead,
    LockfileMalformed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigLoad => "config-load",
            Self::ConfigParse => "config-parse",
            Self::CatalogNotFound => "catalog-not-found",
            Self::CatalogMalformed => "catalog-malformed",
            Self::UnknownProfile => "unknown-profile",
            Self::IncompatibleCombination => "incompatible-combination",
            Self::RestrictedOverrideDenied => "restricted-override-denied",
            Self::VersionIndeterminate => "version-indeterminate",
            Self::InvalidVersionFormat => "invalid-version-format",
            Self::VersionNotFound => "version-not-found",
            Self::VersionMismatch => "version-mismatch",
            Self::RegistryUnreachable => "registry-unreachable",
            Self::LockfileRead => "lockfile-read",
            Self::LockfileMalformed => "lockfile-malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Bundle catalog ──
    #[error("bundle catalog not found at {path}")]
    CatalogNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bundle catalog {origin} is malformed: {detail}")]
    CatalogMalformed { origin: String, detail: String },

    #[error("unknown profile '{name}'; available profiles: {}", format_list(available))]
    UnknownProfile {
        name: String,
        available: Vec<String>,
    },

    // ── Resolution ──
    #[error("incompatible build configuration:\n{}", format_violations(violations))]
    IncompatibleCombination { violations: Vec<Violation> },

    #[error(
        "{field} is fixed by the shared team image {team_image} \
         and cannot be overridden by team members"
    )]
    RestrictedOverrideDenied {
        field: &'static str,
        team_image: String,
    },

    // ── R version ──
    #[error(
        "cannot determine the R version: no --r-version flag, \
         no [build].r_version in labrig.toml, and no lockfile at {}",
        lockfile.display()
    )]
    VersionIndeterminate { lockfile: PathBuf },

    #[error(
        "invalid R version '{version}' from {origin}: \
         expected MAJOR.MINOR or MAJOR.MINOR.PATCH"
    )]
    InvalidVersionFormat {
        version: String,
        origin: VersionSource,
    },

    #[error("R version {version} does not exist in registry repository {repository}")]
    VersionNotFound {
        version: String,
        repository: String,
        suggestion: Option<String>,
    },

    #[error(
        "R version drift: {origin} requests {requested} but {} records {lockfile}",
        lockfile_path.display()
    )]
    VersionMismatch {
        requested: String,
        origin: VersionSource,
        lockfile: String,
        lockfile_path: PathBuf,
    },

    #[error("image registry unreachable: {detail}")]
    RegistryUnreachable { detail: String },

    // ── Lockfile ──
    #[error("failed to read lockfile {path}")]
    LockfileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("lockfile {path} is malformed: {detail}")]
    LockfileMalformed { path: PathBuf, detail: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigLoad { .. } => ErrorKind::ConfigLoad,
            Self::ConfigParse { .. } => ErrorKind::ConfigParse,
            Self::CatalogNotFound { .. } => ErrorKind::CatalogNotFound,
            Self::CatalogMalformed { .. } => ErrorKind::CatalogMalformed,
            Self::UnknownProfile { .. } => ErrorKind::UnknownProfile,
            Self::IncompatibleCombination { .. } => ErrorKind::IncompatibleCombination,
            Self::RestrictedOverrideDenied { .. } => ErrorKind::RestrictedOverrideDenied,
            Self::VersionIndeterminate { .. } => ErrorKind::VersionIndeterminate,
            Self::InvalidVersionFormat { .. } => ErrorKind::InvalidVersionFormat,
            Self::VersionNotFound { .. } => ErrorKind::VersionNotFound,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::RegistryUnreachable { .. } => ErrorKind::RegistryUnreachable,
            Self::LockfileRead { .. } => ErrorKind::LockfileRead,
            Self::LockfileMalformed { .. } => ErrorKind::LockfileMalformed,
        }
    }

    /// A concrete, directly runnable fix for the error.
    pub fn remediation(&self) -> String {
        match self {
            Self::ConfigLoad { path, .. } => format!(
                "check that {} is readable, or remove it to use defaults",
                path.display()
            ),
            Self::ConfigParse { path, .. } => format!(
                "fix the TOML syntax in {}, or regenerate it with `labrig init`",
                path.display()
            ),
            Self::CatalogNotFound { path, .. } => format!(
                "create {} or drop `--catalog` to use the built-in catalog",
                path.display()
            ),
            Self::CatalogMalformed { .. } => {
                "every profile needs base_image, description and arch; every library bundle needs \
                 deps and package_manager; every package bundle needs packages"
                    .to_owned()
            }
            Self::UnknownProfile { available, .. } => match available.first() {
                Some(first) => format!(
                    "labrig resolve --profile {first}   (available: {})",
                    format_list(available)
                ),
                None => "add a profile to the bundle catalog".to_owned(),
            },
            Self::IncompatibleCombination { violations } => violations
                .iter()
                .map(|v| v.remediation.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::RestrictedOverrideDenied { field, .. } => format!(
                "drop the {field} override or the --profile that changes it; ask the team lead \
                 to change [build] in labrig.toml and rebuild the team image"
            ),
            Self::VersionIndeterminate { lockfile } => format!(
                "pass `--r-version 4.4.0`, set `r_version = \"4.4.0\"` under [build] \
                 in labrig.toml, or create {} with `renv::init()`",
                lockfile.display()
            ),
            Self::InvalidVersionFormat { .. } => {
                "use a dotted numeric version such as `--r-version 4.4.0`".to_owned()
            }
            Self::VersionNotFound { suggestion, .. } => match suggestion {
                Some(s) => format!("labrig resolve --r-version {s}"),
                None => "pick a released R version, e.g. `--r-version 4.4.0`".to_owned(),
            },
            Self::VersionMismatch {
                requested,
                lockfile,
                ..
            } => format!(
                "either adopt the lockfile version with `labrig resolve --r-version {lockfile}`, \
                 or switch to R {requested} and regenerate the lockfile with `renv::snapshot()`"
            ),
            Self::RegistryUnreachable { .. } => {
                "retry when the registry is reachable, or pass `--offline`".to_owned()
            }
            Self::LockfileRead { path, .. } => format!(
                "check that {} is readable, or pass `--r-version`",
                path.display()
            ),
            Self::LockfileMalformed { path, .. } => format!(
                "regenerate {} with `renv::snapshot()`",
                path.display()
            ),
        }
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_owned()
    } else {
        items.join(", ")
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - [{}] {}", v.rule, v.cause))
        .collect::<Vec<_>>()
        .join("\n")
}
