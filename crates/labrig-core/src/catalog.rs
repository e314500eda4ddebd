//! Bundle catalog: named profiles, library bundles and package bundles.
//!
//! The catalog is a YAML document with three top-level maps:
//!
//! ```yaml
//! profiles:
//!   minimal:
//!     base_image: rocker/r-ver
//!     description: Bare R
//!     arch: [amd64, arm64]
//!     libs: minimal        # optional, family default otherwise
//!     pkgs: minimal        # optional, family default otherwise
//! library_bundles:
//!   minimal:
//!     deps: [libcurl4-openssl-dev]
//!     package_manager: apt
//! package_bundles:
//!   minimal:
//!     packages: [renv]
//!     requires_bootstrap: false
//! ```
//!
//! A [`Catalog`] is loaded once per invocation and never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

const BUILTIN_CATALOG: &str = include_str!("../catalog/bundles.yaml");

/// OS-level package manager family used to install a library bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// Debian / Ubuntu `apt-get`
    Apt,
    /// Alpine `apk`
    Apk,
}

impl PackageManager {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "apt" | "apt-get" => Some(Self::Apt),
            "apk" => Some(Self::Apk),
            _ => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt => f.write_str("apt"),
            Self::Apk => f.write_str("apk"),
        }
    }
}

/// Named shortcut for a `(base_image, libs, pkgs)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub base_image: String,
    pub description: String,
    /// Architectures the base image is published for (`amd64`, `arm64`).
    pub arch: Vec<String>,
    pub libs: Option<String>,
    pub pkgs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryBundle {
    pub name: String,
    pub description: String,
    pub deps: Vec<String>,
    pub package_manager: PackageManager,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageBundle {
    pub name: String,
    pub description: String,
    pub packages: Vec<String>,
    /// Install an installer first (e.g. BiocManager), then the packages through it.
    pub requires_bootstrap: bool,
    pub tags: Vec<String>,
}

impl LibraryBundle {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl PackageBundle {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Indexed, validated bundle catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    origin: String,
    profiles: BTreeMap<String, Profile>,
    library_bundles: BTreeMap<String, LibraryBundle>,
    package_bundles: BTreeMap<String, PackageBundle>,
}

// ── Raw YAML shape ──

#[derive(Deserialize)]
struct RawCatalog {
    profiles: Option<BTreeMap<String, RawProfile>>,
    library_bundles: Option<BTreeMap<String, RawLibraryBundle>>,
    package_bundles: Option<BTreeMap<String, RawPackageBundle>>,
}

#[derive(Deserialize)]
struct RawProfile {
    base_image: Option<String>,
    description: Option<String>,
    arch: Option<Vec<String>>,
    libs: Option<String>,
    pkgs: Option<String>,
}

#[derive(Deserialize)]
struct RawLibraryBundle {
    #[serde(default)]
    description: String,
    deps: Option<Vec<String>>,
    package_manager: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct RawPackageBundle {
    #[serde(default)]
    description: String,
    packages: Option<Vec<String>>,
    #[serde(default)]
    requires_bootstrap: bool,
    #[serde(default)]
    tags: Vec<String>,
}

impl Catalog {
    /// Load and validate a catalog file.
    ///
    /// # Errors
    ///
    /// - [`Error::CatalogNotFound`](crate::Error::CatalogNotFound) if the file cannot be read
    /// - [`Error::CatalogMalformed`](crate::Error::CatalogMalformed) if it fails schema validation
    pub fn load(path: &Path) -> crate::Result<Self> {
        tracing::debug!(path = %path.display(), "loading bundle catalog");
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::Error::CatalogNotFound {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// The catalog shipped with labrig.
    pub fn builtin() -> crate::Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG, "<builtin>")
    }

    /// Parse and validate catalog YAML. `origin` names the source in errors.
    pub fn from_yaml_str(content: &str, origin: &str) -> crate::Result<Self> {
        let malformed = |detail: String| crate::Error::CatalogMalformed {
            origin: origin.to_owned(),
            detail,
        };

        let raw: RawCatalog = serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let raw_profiles = raw
            .profiles
            .ok_or_else(|| malformed("missing top-level `profiles` section".to_owned()))?;
        let raw_libs = raw
            .library_bundles
            .ok_or_else(|| malformed("missing top-level `library_bundles` section".to_owned()))?;
        let raw_pkgs = raw
            .package_bundles
            .ok_or_else(|| malformed("missing top-level `package_bundles` section".to_owned()))?;

        let mut library_bundles = BTreeMap::new();
        for (name, lib) in raw_libs {
            let deps = lib
                .deps
                .ok_or_else(|| malformed(format!("library bundle '{name}' is missing `deps`")))?;
            let manager_text = lib.package_manager.ok_or_else(|| {
                malformed(format!("library bundle '{name}' is missing `package_manager`"))
            })?;
            let package_manager = PackageManager::parse(&manager_text).ok_or_else(|| {
                malformed(format!(
                    "library bundle '{name}' has unsupported package_manager \
                     '{manager_text}' (expected apt or apk)"
                ))
            })?;
            library_bundles.insert(
                name.clone(),
                LibraryBundle {
                    name,
                    description: lib.description,
                    deps,
                    package_manager,
                    tags: lib.tags,
                },
            );
        }

        let mut package_bundles = BTreeMap::new();
        for (name, pkg) in raw_pkgs {
            let packages = pkg.packages.ok_or_else(|| {
                malformed(format!("package bundle '{name}' is missing `packages`"))
            })?;
            package_bundles.insert(
                name.clone(),
                PackageBundle {
                    name,
                    description: pkg.description,
                    packages,
                    requires_bootstrap: pkg.requires_bootstrap,
                    tags: pkg.tags,
                },
            );
        }

        let mut profiles = BTreeMap::new();
        for (name, profile) in raw_profiles {
            if !is_profile_identifier(&name) {
                return Err(malformed(format!(
                    "profile name '{name}' must be a lowercase identifier"
                )));
            }
            let base_image = profile
                .base_image
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| malformed(format!("profile '{name}' is missing `base_image`")))?;
            let description = profile
                .description
                .ok_or_else(|| malformed(format!("profile '{name}' is missing `description`")))?;
            let arch = profile
                .arch
                .filter(|a| !a.is_empty())
                .ok_or_else(|| malformed(format!("profile '{name}' is missing `arch`")))?;
            if let Some(libs) = &profile.libs
                && !library_bundles.contains_key(libs)
            {
                return Err(malformed(format!(
                    "profile '{name}' references unknown library bundle '{libs}'"
                )));
            }
            if let Some(pkgs) = &profile.pkgs
                && !package_bundles.contains_key(pkgs)
            {
                return Err(malformed(format!(
                    "profile '{name}' references unknown package bundle '{pkgs}'"
                )));
            }
            profiles.insert(
                name.clone(),
                Profile {
                    name,
                    base_image,
                    description,
                    arch,
                    libs: profile.libs,
                    pkgs: profile.pkgs,
                },
            );
        }

        tracing::debug!(
            origin,
            profiles = profiles.len(),
            library_bundles = library_bundles.len(),
            package_bundles = package_bundles.len(),
            "bundle catalog loaded"
        );

        Ok(Self {
            origin: origin.to_owned(),
            profiles,
            library_bundles,
            package_bundles,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// # Errors
    ///
    /// [`Error::UnknownProfile`](crate::Error::UnknownProfile) listing every valid name.
    pub fn lookup_profile(&self, name: &str) -> crate::Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| crate::Error::UnknownProfile {
                name: name.to_owned(),
                available: self.profile_names(),
            })
    }

    pub fn lookup_library_bundle(&self, name: &str) -> Option<&LibraryBundle> {
        self.library_bundles.get(name)
    }

    pub fn lookup_package_bundle(&self, name: &str) -> Option<&PackageBundle> {
        self.package_bundles.get(name)
    }

    /// Profile names in sorted order.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn library_bundle_names(&self) -> Vec<String> {
        self.library_bundles.keys().cloned().collect()
    }

    pub fn package_bundle_names(&self) -> Vec<String> {
        self.package_bundles.keys().cloned().collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}

fn is_profile_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
