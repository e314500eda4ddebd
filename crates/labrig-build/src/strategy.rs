//! Static-template vs synthesized build selection and install command text.

use labrig_core::family::{self, RInstaller};
use labrig_core::{Catalog, LibraryBundle, PackageBundle, PackageManager};
use serde::Serialize;

use crate::compat::{BundlesExist, CompatibilityRule, RuleInput};
use crate::resolve::ResolvedConfig;

/// A maintained, pre-optimized Dockerfile and the expansion it was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticTemplate {
    pub profile: &'static str,
    pub id: &'static str,
    pub base_image: &'static str,
    pub libs: &'static str,
    pub pkgs: &'static str,
    pub contents: &'static str,
}

impl StaticTemplate {
    /// Whether the template builds exactly `config`'s image and bundles.
    pub fn fits(&self, config: &ResolvedConfig) -> bool {
        config.base_image == self.base_image && config.libs == self.libs && config.pkgs == self.pkgs
    }
}

pub const STATIC_TEMPLATES: &[StaticTemplate] = &[
    StaticTemplate {
        profile: "minimal",
        id: "Dockerfile.minimal",
        base_image: "rocker/r-ver",
        libs: "minimal",
        pkgs: "minimal",
        contents: include_str!("../templates/Dockerfile.minimal"),
    },
    StaticTemplate {
        profile: "analysis",
        id: "Dockerfile.analysis",
        base_image: "rocker/tidyverse",
        libs: "minimal",
        pkgs: "tidyverse",
        contents: include_str!("../templates/Dockerfile.analysis"),
    },
    StaticTemplate {
        profile: "modeling",
        id: "Dockerfile.modeling",
        base_image: "rocker/r-ver",
        libs: "modeling",
        pkgs: "modeling",
        contents: include_str!("../templates/Dockerfile.modeling"),
    },
    StaticTemplate {
        profile: "publishing",
        id: "Dockerfile.publishing",
        base_image: "rocker/verse",
        libs: "publishing",
        pkgs: "publishing",
        contents: include_str!("../templates/Dockerfile.publishing"),
    },
    StaticTemplate {
        profile: "shiny",
        id: "Dockerfile.shiny",
        base_image: "rocker/shiny",
        libs: "minimal",
        pkgs: "shiny",
        contents: include_str!("../templates/Dockerfile.shiny"),
    },
    StaticTemplate {
        profile: "geospatial",
        id: "Dockerfile.geospatial",
        base_image: "rocker/geospatial",
        libs: "geospatial",
        pkgs: "geospatial",
        contents: include_str!("../templates/Dockerfile.geospatial"),
    },
    StaticTemplate {
        profile: "bioinformatics",
        id: "Dockerfile.bioinformatics",
        base_image: "bioconductor/bioconductor_docker",
        libs: "bioinfo",
        pkgs: "bioinfo",
        contents: include_str!("../templates/Dockerfile.bioinformatics"),
    },
];

/// Template for `profile`, if it has one.
pub fn static_template(profile: &str) -> Option<&'static StaticTemplate> {
    STATIC_TEMPLATES.iter().find(|t| t.profile == profile)
}

/// Dockerfile text of the template named `id`.
pub fn template_source(id: &str) -> Option<&'static str> {
    STATIC_TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .map(|t| t.contents)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BuildStrategy {
    /// Reuse a maintained template.
    Static { template_id: String },
    /// Synthesize a Dockerfile from the resolved values.
    Synthesize {
        base_image: String,
        library_install_cmd: Option<String>,
        package_install_cmd: Option<String>,
    },
}

/// Choose how to build `config`.
///
/// `Static` only when the configuration is exactly a templated profile:
/// no override on base image, libraries or packages, and the catalog still
/// expands the profile to what the template installs.
///
/// # Errors
///
/// [`Error::IncompatibleCombination`](labrig_core::Error::IncompatibleCombination)
/// if the configured bundles are not in `catalog`.
pub fn select_strategy(
    config: &ResolvedConfig,
    catalog: &Catalog,
    binary_mirror: &str,
) -> labrig_core::Result<BuildStrategy> {
    if !config.has_overrides()
        && let Some(template) = config.profile.as_deref().and_then(static_template)
    {
        if template.fits(config) {
            tracing::info!(template = template.id, "using static build template");
            return Ok(BuildStrategy::Static {
                template_id: template.id.to_owned(),
            });
        }
        tracing::info!(
            template = template.id,
            base_image = %config.base_image,
            "catalog profile differs from its template; synthesizing instead"
        );
    }

    let input = RuleInput::new(config, catalog);
    let (Some(libs), Some(pkgs)) = (input.library_bundle, input.package_bundle) else {
        let violations = BundlesExist.check(&input).into_iter().collect();
        return Err(labrig_core::Error::IncompatibleCombination { violations });
    };

    let installer = family::rule_for(config.family).installer;
    tracing::info!(
        base_image = %config.base_image,
        installer = ?installer,
        "synthesizing build description"
    );
    Ok(BuildStrategy::Synthesize {
        base_image: config.base_image.clone(),
        library_install_cmd: library_install_command(libs),
        package_install_cmd: package_install_command(pkgs, installer, binary_mirror),
    })
}

/// System dependency install command; `None` for an empty bundle.
pub fn library_install_command(bundle: &LibraryBundle) -> Option<String> {
    if bundle.deps.is_empty() {
        return None;
    }
    let deps = bundle.deps.join(" ");
    Some(match bundle.package_manager {
        PackageManager::Apt => format!(
            "apt-get update && apt-get install -y --no-install-recommends {deps} \
             && rm -rf /var/lib/apt/lists/*"
        ),
        PackageManager::Apk => format!("apk add --no-cache {deps}"),
    })
}

/// R package install command; `None` for an empty bundle.
pub fn package_install_command(
    bundle: &PackageBundle,
    installer: RInstaller,
    binary_mirror: &str,
) -> Option<String> {
    if bundle.packages.is_empty() {
        return None;
    }
    if bundle.requires_bootstrap {
        let bootstrap = match installer {
            RInstaller::Littler => "install2.r --error --skipinstalled BiocManager".to_owned(),
            RInstaller::Generic => format!(
                "Rscript -e \"install.packages('BiocManager', repos = '{binary_mirror}')\""
            ),
        };
        return Some(format!(
            "{bootstrap} && Rscript -e \"BiocManager::install({}, ask = FALSE, update = FALSE)\"",
            r_vector(&bundle.packages)
        ));
    }
    Some(match installer {
        RInstaller::Littler => format!(
            "install2.r --error --skipinstalled --ncpus -1 {} && rm -rf /tmp/downloaded_packages",
            bundle.packages.join(" ")
        ),
        RInstaller::Generic => format!(
            "Rscript -e \"install.packages({}, repos = '{binary_mirror}')\"",
            r_vector(&bundle.packages)
        ),
    })
}

fn r_vector(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{i}'")).collect();
    format!("c({})", quoted.join(", "))
}
