//! Compatibility rules over `(base image family, library bundle, package bundle)`.
//!
//! Each rule is an independent [`CompatibilityRule`]; a [`RuleSet`] evaluates
//! all of them and reports every finding at once. Adding a rule never
//! touches the resolver.

use labrig_core::family::{self, GLOBAL_DEFAULT_BUNDLE};
use labrig_core::{Catalog, ImageFamily, LibraryBundle, PackageBundle, PackageManager, Violation};

use crate::resolve::ResolvedConfig;

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub base_image: &'a str,
    pub family: ImageFamily,
    pub libs: &'a str,
    pub pkgs: &'a str,
    pub library_bundle: Option<&'a LibraryBundle>,
    pub package_bundle: Option<&'a PackageBundle>,
    pub catalog: &'a Catalog,
}

impl<'a> RuleInput<'a> {
    pub fn new(config: &'a ResolvedConfig, catalog: &'a Catalog) -> Self {
        Self {
            base_image: &config.base_image,
            family: config.family,
            libs: &config.libs,
            pkgs: &config.pkgs,
            library_bundle: catalog.lookup_library_bundle(&config.libs),
            package_bundle: catalog.lookup_package_bundle(&config.pkgs),
            catalog,
        }
    }

    /// Invocation reproducing this input with some fields replaced.
    pub fn corrected(&self, libs: Option<&str>, pkgs: Option<&str>) -> String {
        format!(
            "labrig resolve --base-image {} --libs {} --pkgs {}",
            self.base_image,
            libs.unwrap_or(self.libs),
            pkgs.unwrap_or(self.pkgs)
        )
    }

    /// First catalog profile whose base image belongs to the same family.
    pub fn nearest_profile(&self) -> Option<&'a str> {
        self.catalog
            .profiles()
            .find(|p| family::classify(&p.base_image).family == self.family)
            .map(|p| p.name.as_str())
    }

    fn corrected_or_profile(&self, libs: Option<&str>, pkgs: Option<&str>) -> String {
        let invocation = self.corrected(libs, pkgs);
        match self.nearest_profile() {
            Some(profile) => format!("{invocation}   (or: labrig resolve --profile {profile})"),
            None => invocation,
        }
    }
}

pub trait CompatibilityRule: Send + Sync {
    fn id(&self) -> &'static str;

    /// `None` when the input satisfies the rule.
    fn check(&self, input: &RuleInput<'_>) -> Option<Violation>;
}

/// Ordered collection of rules evaluated uniformly.
pub struct RuleSet {
    rules: Vec<Box<dyn CompatibilityRule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The shipped rules.
    pub fn builtin() -> Self {
        Self::empty()
            .with_rule(BundlesExist)
            .with_rule(AlpineNeedsToolchain)
            .with_rule(BioconductorLibs)
            .with_rule(GeospatialLibs)
            .with_rule(PackageManagerMatchesOs)
            .with_rule(PackageTagsNeedLibs)
            .with_rule(PublishingWithoutLibs)
            .with_rule(PublishingPackagesWithoutTex)
    }

    pub fn with_rule(mut self, rule: impl CompatibilityRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn evaluate(&self, input: &RuleInput<'_>) -> Vec<Violation> {
        self.rules.iter().filter_map(|r| r.check(input)).collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Run every rule against `config`.
///
/// Returns the warnings on success. All hard violations are reported
/// together in one [`Error::IncompatibleCombination`](labrig_core::Error::IncompatibleCombination).
pub fn validate(
    config: &ResolvedConfig,
    catalog: &Catalog,
    rules: &RuleSet,
) -> labrig_core::Result<Vec<Violation>> {
    let input = RuleInput::new(config, catalog);
    let (errors, warnings): (Vec<_>, Vec<_>) =
        rules.evaluate(&input).into_iter().partition(Violation::is_error);

    if errors.is_empty() {
        tracing::debug!(
            base_image = %config.base_image,
            libs = %config.libs,
            pkgs = %config.pkgs,
            warnings = warnings.len(),
            "configuration is compatible"
        );
        Ok(warnings)
    } else {
        tracing::debug!(errors = errors.len(), "configuration rejected");
        Err(labrig_core::Error::IncompatibleCombination { violations: errors })
    }
}

// ── Built-in rules ──

pub struct BundlesExist;

impl CompatibilityRule for BundlesExist {
    fn id(&self) -> &'static str {
        "bundles-exist"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let mut causes = Vec::new();
        let mut fixes = Vec::new();
        if input.library_bundle.is_none() {
            causes.push(format!("unknown library bundle '{}'", input.libs));
            fixes.push(format!(
                "--libs one of: {}",
                input.catalog.library_bundle_names().join(", ")
            ));
        }
        if input.package_bundle.is_none() {
            causes.push(format!("unknown package bundle '{}'", input.pkgs));
            fixes.push(format!(
                "--pkgs one of: {}",
                input.catalog.package_bundle_names().join(", ")
            ));
        }
        if causes.is_empty() {
            return None;
        }
        let rule = family::rule_for(input.family);
        Some(Violation::error(
            self.id(),
            causes.join("; "),
            format!(
                "{}   ({})",
                input.corrected(
                    input.library_bundle.map_or(Some(rule.default_libs), |_| None),
                    input.package_bundle.map_or(Some(rule.default_pkgs), |_| None),
                ),
                fixes.join("; ")
            ),
        ))
    }
}

pub struct AlpineNeedsToolchain;

impl CompatibilityRule for AlpineNeedsToolchain {
    fn id(&self) -> &'static str {
        "alpine-needs-toolchain"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if input.family != ImageFamily::Alpine {
            return None;
        }
        let lib = input.library_bundle?;
        if lib.package_manager == PackageManager::Apk && !lib.deps.is_empty() {
            return None;
        }
        let cause = if lib.deps.is_empty() {
            format!(
                "{} is a minimal Alpine image; with library bundle '{}' R packages \
                 cannot compile (no toolchain)",
                input.base_image, input.libs
            )
        } else {
            format!(
                "{} is an Alpine image but library bundle '{}' is installed with {}",
                input.base_image, input.libs, lib.package_manager
            )
        };
        let default_libs = family::rule_for(ImageFamily::Alpine).default_libs;
        Some(Violation::error(
            self.id(),
            cause,
            input.corrected_or_profile(Some(default_libs), None),
        ))
    }
}

pub struct BioconductorLibs;

impl CompatibilityRule for BioconductorLibs {
    fn id(&self) -> &'static str {
        "bioconductor-libs"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if input.family != ImageFamily::Bioconductor {
            return None;
        }
        let default_libs = family::rule_for(ImageFamily::Bioconductor).default_libs;
        let lib = input.library_bundle?;
        if lib.name == default_libs || lib.has_tag("bioinformatics") {
            return None;
        }
        Some(Violation::error(
            self.id(),
            format!(
                "Bioconductor images need the '{default_libs}' library bundle, not '{}'",
                input.libs
            ),
            input.corrected_or_profile(Some(default_libs), None),
        ))
    }
}

pub struct GeospatialLibs;

impl CompatibilityRule for GeospatialLibs {
    fn id(&self) -> &'static str {
        "geospatial-libs"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if input.family != ImageFamily::Geospatial {
            return None;
        }
        let default_libs = family::rule_for(ImageFamily::Geospatial).default_libs;
        let lib = input.library_bundle?;
        if lib.name == default_libs
            || lib.name == GLOBAL_DEFAULT_BUNDLE
            || lib.has_tag("geospatial")
        {
            return None;
        }
        Some(Violation::error(
            self.id(),
            format!(
                "geospatial images need the '{default_libs}' or '{GLOBAL_DEFAULT_BUNDLE}' \
                 library bundle, not '{}'",
                input.libs
            ),
            input.corrected_or_profile(Some(default_libs), None),
        ))
    }
}

pub struct PackageManagerMatchesOs;

impl CompatibilityRule for PackageManagerMatchesOs {
    fn id(&self) -> &'static str {
        "package-manager-matches-os"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        // Alpine images are covered by `alpine-needs-toolchain`.
        if input.family == ImageFamily::Alpine {
            return None;
        }
        let lib = input.library_bundle?;
        let expected = family::rule_for(input.family).os_package_manager;
        if lib.deps.is_empty() || lib.package_manager == expected {
            return None;
        }
        let replacement = input
            .catalog
            .lookup_library_bundle(GLOBAL_DEFAULT_BUNDLE)
            .filter(|b| b.package_manager == expected)
            .map(|b| b.name.as_str())
            .unwrap_or("none");
        Some(Violation::error(
            self.id(),
            format!(
                "library bundle '{}' uses {} but {} installs system packages with {expected}",
                input.libs, lib.package_manager, input.base_image
            ),
            input.corrected_or_profile(Some(replacement), None),
        ))
    }
}

/// Tags on package bundles that require a matching library bundle.
const SYSTEM_DEPENDENT_TAGS: &[&str] = &["geospatial", "bioinformatics"];

pub struct PackageTagsNeedLibs;

impl CompatibilityRule for PackageTagsNeedLibs {
    fn id(&self) -> &'static str {
        "package-tags-need-libs"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let pkg = input.package_bundle?;
        let lib = input.library_bundle?;
        let tag = SYSTEM_DEPENDENT_TAGS
            .iter()
            .find(|tag| pkg.has_tag(tag) && !lib.has_tag(tag))?;
        let replacement = input
            .catalog
            .library_bundle_names()
            .into_iter()
            .find(|name| {
                input
                    .catalog
                    .lookup_library_bundle(name)
                    .is_some_and(|b| b.has_tag(tag))
            });
        let remediation = match replacement {
            Some(libs) => input.corrected(Some(libs.as_str()), None),
            None => format!("add a library bundle tagged '{tag}' to the catalog"),
        };
        Some(Violation::error(
            self.id(),
            format!(
                "package bundle '{}' is {tag} and needs a {tag} library bundle; \
                 '{}' does not provide one",
                input.pkgs, input.libs
            ),
            remediation,
        ))
    }
}

pub struct PublishingWithoutLibs;

impl CompatibilityRule for PublishingWithoutLibs {
    fn id(&self) -> &'static str {
        "publishing-without-libs"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if input.family != ImageFamily::Publishing {
            return None;
        }
        let lib = input.library_bundle?;
        if !lib.deps.is_empty() {
            return None;
        }
        let default_libs = family::rule_for(ImageFamily::Publishing).default_libs;
        Some(Violation::warning(
            self.id(),
            format!(
                "{} bundles TeX, but library bundle '{}' omits pandoc and font tooling",
                input.base_image, input.libs
            ),
            input.corrected(Some(default_libs), None),
        ))
    }
}

pub struct PublishingPackagesWithoutTex;

impl CompatibilityRule for PublishingPackagesWithoutTex {
    fn id(&self) -> &'static str {
        "publishing-packages-without-tex"
    }

    fn check(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let pkg = input.package_bundle?;
        let lib = input.library_bundle?;
        if !pkg.has_tag("publishing")
            || input.family == ImageFamily::Publishing
            || lib.has_tag("publishing")
        {
            return None;
        }
        Some(Violation::warning(
            self.id(),
            format!(
                "package bundle '{}' renders documents but {} has no TeX or pandoc; \
                 PDF output will fail",
                input.pkgs, input.base_image
            ),
            "labrig resolve --profile publishing".to_owned(),
        ))
    }
}
