//! `renv.lock` parsing.
//!
//! Only the fields the resolver needs are modelled: the R version and the
//! pinned package versions. Unknown fields are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// A parsed dependency lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lockfile {
    pub r_version: String,
    /// Package name to pinned version.
    pub packages: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawLockfile {
    #[serde(rename = "R")]
    r: Option<RawR>,
    #[serde(rename = "Packages", default)]
    packages: BTreeMap<String, RawPackage>,
}

#[derive(Deserialize)]
struct RawR {
    #[serde(rename = "Version")]
    version: Option<String>,
}

#[derive(Deserialize)]
struct RawPackage {
    #[serde(rename = "Version")]
    version: Option<String>,
}

impl Lockfile {
    /// Read the lockfile at `path`; `Ok(None)` when the file does not exist.
    pub fn load_optional(path: &Path) -> crate::Result<Option<Self>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no lockfile");
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::LockfileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content, path).map(Some)
    }

    pub fn from_json(content: &str, path: &Path) -> crate::Result<Self> {
        let malformed = |detail: String| crate::Error::LockfileMalformed {
            path: path.to_path_buf(),
            detail,
        };

        let raw: RawLockfile = serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;
        let r_version = raw
            .r
            .and_then(|r| r.version)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| malformed("missing R.Version".to_owned()))?;

        let packages = raw
            .packages
            .into_iter()
            .filter_map(|(name, pkg)| pkg.version.map(|v| (name, v)))
            .collect();

        Ok(Self {
            r_version,
            packages,
        })
    }
}
