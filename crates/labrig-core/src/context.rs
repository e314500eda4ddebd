use std::path::{Path, PathBuf};

use crate::config::{LabrigConfig, Role};

/// Everything one resolution needs to know about its surroundings.
///
/// Built once by the caller and passed by reference into every stage;
/// no stage reads the process environment on its own.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_dir: PathBuf,
    pub project_name: String,
    pub team: Option<String>,
    pub role: Role,
    /// Docker architecture of the host (`amd64`, `arm64`).
    pub host_arch: String,
    /// Short version-control revision of the working tree, if any.
    pub revision: Option<String>,
    /// Build date as `YYYYMMDD`, used when no revision is available.
    pub build_date: String,
    pub config: LabrigConfig,
}

impl Context {
    /// Context with values taken from `config`, falling back to the
    /// directory name for the project and `amd64` for the host.
    pub fn new(project_dir: &Path, config: LabrigConfig) -> Self {
        let project_name = config.project.name.clone().unwrap_or_else(|| {
            project_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| !n.is_empty() && n != ".")
                .unwrap_or_else(|| "project".to_owned())
        });
        Self {
            project_dir: project_dir.to_path_buf(),
            project_name,
            team: config.project.team.clone(),
            role: config.project.role,
            host_arch: "amd64".to_owned(),
            revision: None,
            build_date: "19700101".to_owned(),
            config,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_host_arch(mut self, arch: impl Into<String>) -> Self {
        self.host_arch = arch.into();
        self
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_build_date(mut self, date: impl Into<String>) -> Self {
        self.build_date = date.into();
        self
    }

    /// Image repository for this project: `team/project` or `project`.
    pub fn image_repository(&self) -> String {
        match &self.team {
            Some(team) => format!("{team}/{project}", project = self.project_name),
            None => self.project_name.clone(),
        }
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.project_dir.join(&self.config.build.lockfile)
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.config
            .build
            .catalog
            .as_ref()
            .map(|p| self.project_dir.join(p))
    }

    pub fn is_restricted(&self) -> bool {
        self.role == Role::Member
    }
}
