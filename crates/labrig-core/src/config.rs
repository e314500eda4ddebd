use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// labrig.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabrigConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Who is running the resolution against the team image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns the shared image and may change any field.
    #[default]
    Lead,
    /// Builds on top of the shared image; base image and libraries are fixed.
    Member,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (defaults to the directory name)
    pub name: Option<String>,
    /// Team namespace for shared images
    pub team: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Default profile when `--profile` is not given
    pub profile: Option<String>,
    /// Pinned R version
    pub r_version: Option<String>,
    /// Lockfile path, relative to the project directory
    #[serde(default = "default_lockfile")]
    pub lockfile: PathBuf,
    /// Custom bundle catalog (built-in catalog when unset)
    pub catalog: Option<PathBuf>,
    /// Binary package mirror used by the generic R installer
    #[serde(default = "default_binary_mirror")]
    pub binary_mirror: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry API base URL
    #[serde(default = "default_registry_url")]
    pub url: String,
    /// Repository whose tags are R versions
    #[serde(default = "default_version_repository")]
    pub version_repository: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on tag-list pages fetched when computing a suggestion
    #[serde(default = "default_max_tag_pages")]
    pub max_tag_pages: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            profile: None,
            r_version: None,
            lockfile: default_lockfile(),
            catalog: None,
            binary_mirror: default_binary_mirror(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            version_repository: default_version_repository(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_tag_pages: default_max_tag_pages(),
        }
    }
}

impl LabrigConfig {
    /// Load from labrig.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join("labrig.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

fn default_lockfile() -> PathBuf {
    PathBuf::from("renv.lock")
}

fn default_binary_mirror() -> String {
    "https://packagemanager.posit.co/cran/__linux__/noble/latest".to_owned()
}

fn default_registry_url() -> String {
    "https://hub.docker.com".to_owned()
}

fn default_version_repository() -> String {
    "rocker/r-ver".to_owned()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_max_tag_pages() -> u32 {
    10
}
