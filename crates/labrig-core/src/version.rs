use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Where a pinned R version came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    Explicit,
    Config,
    Lockfile,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("--r-version"),
            Self::Config => f.write_str("[build].r_version in labrig.toml"),
            Self::Lockfile => f.write_str("the lockfile"),
        }
    }
}

/// The resolved R version and whether the registry confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSpec {
    pub version: String,
    pub source: VersionSource,
    /// `true` only after the remote registry reported the tag as present.
    pub confirmed: bool,
}

impl VersionSpec {
    pub fn new(version: impl Into<String>, source: VersionSource) -> Self {
        Self {
            version: version.into(),
            source,
            confirmed: false,
        }
    }
}

/// A dotted numeric R version with two or three components.
///
/// ```
/// use labrig_core::RVersion;
///
/// let v = RVersion::parse("4.4.1").unwrap();
/// assert!(v > RVersion::parse("4.4").unwrap());
/// assert!(RVersion::parse("4.4.1-rc").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RVersion {
    major: u32,
    minor: u32,
    patch: Option<u32>,
}

impl RVersion {
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return None;
        }
        let mut numbers = Vec::with_capacity(parts.len());
        for part in parts {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // arch-lint: allow(no-silent-result-drop) reason="overflow is not a valid version"
            numbers.push(part.parse::<u32>().ok()?);
        }
        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers.get(2).copied(),
        })
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch.unwrap_or(0))
    }
}

impl Ord for RVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // "4.4" sorts before "4.4.0" so that fully qualified tags win ties.
        self.key()
            .cmp(&other.key())
            .then_with(|| self.patch.is_some().cmp(&other.patch.is_some()))
    }
}

impl PartialOrd for RVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}
