//! Base image families and their smart defaults.
//!
//! [`FAMILY_RULES`] is evaluated in order; the first rule whose patterns
//! match the base image wins. The last rule has no patterns and matches
//! everything, so classification is total.

use std::fmt;

use serde::Serialize;

use crate::catalog::PackageManager;

/// Bundle used for libraries and packages when nothing else applies.
pub const GLOBAL_DEFAULT_BUNDLE: &str = "minimal";

/// Profile whose base image is used when neither a profile nor a base image is given.
pub const GLOBAL_DEFAULT_PROFILE: &str = "minimal";

/// Base image used when even the default profile is missing from the catalog.
pub const FALLBACK_BASE_IMAGE: &str = "rocker/r-ver";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFamily {
    /// Minimal Alpine system image (r-hub r-minimal)
    Alpine,
    Bioconductor,
    Geospatial,
    /// TeX-bearing publishing images (rocker/verse)
    Publishing,
    Shiny,
    Tidyverse,
    /// Plain rocker/r-ver
    Rocker,
    /// Anything unrecognized
    Generic,
}

impl fmt::Display for ImageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alpine => "alpine",
            Self::Bioconductor => "bioconductor",
            Self::Geospatial => "geospatial",
            Self::Publishing => "publishing",
            Self::Shiny => "shiny",
            Self::Tidyverse => "tidyverse",
            Self::Rocker => "rocker",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// How R packages are installed on a family's images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RInstaller {
    /// `install2.r` from littler, preconfigured for binary packages
    Littler,
    /// `install.packages()` pointed at a binary-serving mirror
    Generic,
}

#[derive(Debug, Clone, Copy)]
pub struct FamilyRule {
    pub family: ImageFamily,
    /// Substrings of the lowercase base image; empty matches anything.
    pub patterns: &'static [&'static str],
    pub default_libs: &'static str,
    pub default_pkgs: &'static str,
    pub os_package_manager: PackageManager,
    pub installer: RInstaller,
    pub arch: &'static [&'static str],
}

impl FamilyRule {
    pub fn matches(&self, base_image: &str) -> bool {
        let image = base_image.to_ascii_lowercase();
        self.patterns.is_empty() || self.patterns.iter().any(|p| image.contains(p))
    }

    pub fn supports_arch(&self, arch: &str) -> bool {
        self.arch.contains(&arch)
    }
}

pub const FAMILY_RULES: &[FamilyRule] = &[
    FamilyRule {
        family: ImageFamily::Alpine,
        patterns: &["r-minimal", "alpine"],
        default_libs: "alpine",
        default_pkgs: "minimal",
        os_package_manager: PackageManager::Apk,
        installer: RInstaller::Generic,
        arch: &["amd64", "arm64"],
    },
    FamilyRule {
        family: ImageFamily::Bioconductor,
        patterns: &["bioconductor"],
        default_libs: "bioinfo",
        default_pkgs: "bioinfo",
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Generic,
        arch: &["amd64", "arm64"],
    },
    FamilyRule {
        family: ImageFamily::Geospatial,
        patterns: &["geospatial"],
        default_libs: "geospatial",
        default_pkgs: "geospatial",
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Littler,
        arch: &["amd64"],
    },
    // Before publishing: "tidyverse" contains "verse".
    FamilyRule {
        family: ImageFamily::Tidyverse,
        patterns: &["tidyverse"],
        default_libs: "minimal",
        default_pkgs: "tidyverse",
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Littler,
        arch: &["amd64", "arm64"],
    },
    FamilyRule {
        family: ImageFamily::Publishing,
        patterns: &["verse"],
        default_libs: "publishing",
        default_pkgs: "publishing",
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Littler,
        arch: &["amd64"],
    },
    FamilyRule {
        family: ImageFamily::Shiny,
        patterns: &["shiny"],
        default_libs: "minimal",
        default_pkgs: "shiny",
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Littler,
        arch: &["amd64"],
    },
    FamilyRule {
        family: ImageFamily::Rocker,
        patterns: &["rocker/"],
        default_libs: GLOBAL_DEFAULT_BUNDLE,
        default_pkgs: GLOBAL_DEFAULT_BUNDLE,
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Littler,
        arch: &["amd64", "arm64"],
    },
    FamilyRule {
        family: ImageFamily::Generic,
        patterns: &[],
        default_libs: GLOBAL_DEFAULT_BUNDLE,
        default_pkgs: GLOBAL_DEFAULT_BUNDLE,
        os_package_manager: PackageManager::Apt,
        installer: RInstaller::Generic,
        arch: &["amd64", "arm64"],
    },
];

/// First rule matching `base_image`; always succeeds thanks to the catch-all.
pub fn classify(base_image: &str) -> &'static FamilyRule {
    FAMILY_RULES
        .iter()
        .find(|rule| rule.matches(base_image))
        .unwrap_or(&FAMILY_RULES[FAMILY_RULES.len() - 1])
}

/// The rule for a given family.
pub fn rule_for(family: ImageFamily) -> &'static FamilyRule {
    FAMILY_RULES
        .iter()
        .find(|rule| rule.family == family)
        .unwrap_or(&FAMILY_RULES[FAMILY_RULES.len() - 1])
}

/// Map a Rust `std::env::consts::ARCH` value to the Docker platform name.
pub fn docker_arch(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}
