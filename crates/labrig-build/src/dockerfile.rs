use std::collections::BTreeMap;

use labrig_core::{Context, VersionSpec};
use serde::Serialize;

use crate::resolve::ResolvedConfig;
use crate::strategy::{BuildStrategy, template_source};

/// Values substituted into a build description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitutions {
    pub r_version: String,
    pub platform: Option<String>,
    pub project_name: String,
    /// Copy the lockfile in and run `renv::restore()`.
    pub restore_lockfile: bool,
}

impl Substitutions {
    pub fn new(
        config: &ResolvedConfig,
        version: &VersionSpec,
        ctx: &Context,
        restore_lockfile: bool,
    ) -> Self {
        Self {
            r_version: version.version.clone(),
            platform: config.platform.clone(),
            project_name: ctx.project_name.clone(),
            restore_lockfile,
        }
    }
}

/// Output handed to the build-execution step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildArtifact {
    Static {
        template_id: String,
        build_args: BTreeMap<String, String>,
        /// Template text; built with `build_args` as `--build-arg`s.
        dockerfile: String,
    },
    Synthesized {
        dockerfile: String,
    },
}

impl BuildArtifact {
    /// Dockerfile text to write out; `None` for an unknown template.
    pub fn dockerfile(&self) -> Option<&str> {
        let text = match self {
            Self::Static { dockerfile, .. } | Self::Synthesized { dockerfile } => dockerfile,
        };
        (!text.is_empty()).then_some(text.as_str())
    }
}

/// Render the artifact for `strategy`. Identical input yields identical output.
pub fn generate(strategy: &BuildStrategy, subs: &Substitutions) -> BuildArtifact {
    match strategy {
        BuildStrategy::Static { template_id } => {
            let mut build_args = BTreeMap::new();
            build_args.insert("R_VERSION".to_owned(), subs.r_version.clone());
            build_args.insert("PROJECT_NAME".to_owned(), subs.project_name.clone());
            if let Some(platform) = &subs.platform {
                build_args.insert("TARGETPLATFORM".to_owned(), platform.clone());
            }
            let dockerfile = match template_source(template_id) {
                Some(text) => text.to_owned(),
                None => {
                    tracing::warn!(template_id, "no bundled template with this id");
                    String::new()
                }
            };
            BuildArtifact::Static {
                template_id: template_id.clone(),
                build_args,
                dockerfile,
            }
        }
        BuildStrategy::Synthesize {
            base_image,
            library_install_cmd,
            package_install_cmd,
        } => BuildArtifact::Synthesized {
            dockerfile: render(
                base_image,
                library_install_cmd.as_deref(),
                package_install_cmd.as_deref(),
                subs,
            ),
        },
    }
}

fn render(
    base_image: &str,
    library_install_cmd: Option<&str>,
    package_install_cmd: Option<&str>,
    subs: &Substitutions,
) -> String {
    let platform = subs
        .platform
        .as_deref()
        .map(|p| format!("--platform={p} "))
        .unwrap_or_default();

    let system_libs = match library_install_cmd {
        Some(cmd) => format!("RUN {cmd}\n"),
        None => "# (no additional system libraries)\n".to_owned(),
    };
    let r_packages = match package_install_cmd {
        Some(cmd) => format!("RUN {cmd}\n"),
        None => "# (no additional R packages)\n".to_owned(),
    };
    let restore = if subs.restore_lockfile {
        "COPY renv.lock renv.lock\nRUN Rscript -e \"renv::restore(prompt = FALSE)\"\n"
    } else {
        ""
    };

    format!(
        r#"# Generated by labrig; regenerate instead of editing.
ARG R_VERSION={r_version}
FROM {platform}{image}

# === System libraries ===
{system_libs}
# === R packages ===
{r_packages}
# === Project ===
WORKDIR /home/analyst/{project}
{restore}CMD ["R"]
"#,
        r_version = subs.r_version,
        image = image_reference(base_image),
        project = subs.project_name,
    )
}

/// `FROM` reference pinned to `R_VERSION` unless the image already carries a tag.
fn image_reference(base_image: &str) -> String {
    let last_segment = base_image.rsplit('/').next().unwrap_or(base_image);
    if last_segment.contains(':') || base_image.contains('@') {
        base_image.to_owned()
    } else {
        format!("{base_image}:${{R_VERSION}}")
    }
}
