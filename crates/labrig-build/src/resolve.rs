//! Override & default resolution.
//!
//! Precedence, highest first:
//!
//! 1. explicit user value (recorded as an override)
//! 2. value expanded from the named profile
//! 3. smart default from the base image family ([`labrig_core::family`])
//! 4. global `minimal` bundle

use std::fmt;

use labrig_core::family::{self, FALLBACK_BASE_IMAGE, GLOBAL_DEFAULT_PROFILE};
use labrig_core::{Catalog, Context, Diagnostics, ImageFamily, Profile, VersionSpec, WarningKind};
use serde::Serialize;

/// User-supplied selections for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    pub profile: Option<String>,
    pub base_image: Option<String>,
    pub libs: Option<String>,
    pub pkgs: Option<String>,
    pub r_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BaseImage,
    Libs,
    Pkgs,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseImage => f.write_str("base image"),
            Self::Libs => f.write_str("library bundle"),
            Self::Pkgs => f.write_str("package bundle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Override,
    Profile,
    FamilyDefault,
    GlobalDefault,
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("override"),
            Self::Profile => f.write_str("profile"),
            Self::FamilyDefault => f.write_str("family default"),
            Self::GlobalDefault => f.write_str("global default"),
        }
    }
}

/// One audited substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub field: Field,
    pub value: String,
    pub source: FieldSource,
    pub rationale: String,
}

/// The configuration accumulated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub profile: Option<String>,
    pub base_image: String,
    pub family: ImageFamily,
    pub libs: String,
    pub pkgs: String,
    /// Decisions in the order they were made.
    pub decisions: Vec<Decision>,
    /// `--platform` to build with when the host architecture is unsupported.
    pub platform: Option<String>,
    pub version: Option<VersionSpec>,
    pub image_tag: Option<String>,
}

impl ResolvedConfig {
    pub fn source_of(&self, field: Field) -> Option<FieldSource> {
        self.decisions
            .iter()
            .rev()
            .find(|d| d.field == field)
            .map(|d| d.source)
    }

    pub fn is_overridden(&self, field: Field) -> bool {
        self.source_of(field) == Some(FieldSource::Override)
    }

    pub fn has_overrides(&self) -> bool {
        self.decisions
            .iter()
            .any(|d| d.source == FieldSource::Override)
    }
}

/// Merge overrides, profile values and smart defaults into a [`ResolvedConfig`].
///
/// The profile comes from `request.profile`, falling back to
/// `[build].profile` in `labrig.toml`.
///
/// # Errors
///
/// - [`Error::RestrictedOverrideDenied`](labrig_core::Error::RestrictedOverrideDenied)
///   when a team member overrides the base image or library bundle, or picks
///   a profile that changes either of them
/// - [`Error::UnknownProfile`](labrig_core::Error::UnknownProfile)
pub fn resolve(
    ctx: &Context,
    catalog: &Catalog,
    request: &ResolveRequest,
    diagnostics: &mut Diagnostics,
) -> labrig_core::Result<ResolvedConfig> {
    if ctx.is_restricted() {
        deny_restricted(ctx, catalog, request)?;
    }

    let profile_name = request
        .profile
        .as_deref()
        .or(ctx.config.build.profile.as_deref());
    let profile = profile_name
        .map(|name| catalog.lookup_profile(name))
        .transpose()?;

    let mut decisions = Vec::new();

    let base_image = match (&request.base_image, profile) {
        (Some(image), _) => record(
            &mut decisions,
            Field::BaseImage,
            image,
            FieldSource::Override,
            "explicit --base-image".to_owned(),
        ),
        (None, Some(p)) => record(
            &mut decisions,
            Field::BaseImage,
            &p.base_image,
            FieldSource::Profile,
            format!("from profile '{}'", p.name),
        ),
        (None, None) => {
            let image = match catalog.lookup_profile(GLOBAL_DEFAULT_PROFILE) {
                Ok(p) => p.base_image.clone(),
                Err(e) => {
                    tracing::debug!(error = %e, "catalog has no default profile");
                    FALLBACK_BASE_IMAGE.to_owned()
                }
            };
            record(
                &mut decisions,
                Field::BaseImage,
                &image,
                FieldSource::GlobalDefault,
                format!(
                    "no profile or override; using the '{GLOBAL_DEFAULT_PROFILE}' base image"
                ),
            )
        }
    };

    let rule = family::classify(&base_image);
    tracing::debug!(
        base_image = %base_image,
        family = %rule.family,
        "classified base image"
    );

    let libs = pick_bundle(
        &mut decisions,
        Field::Libs,
        request.libs.as_deref(),
        profile.and_then(|p| p.libs.as_deref().map(|l| (p, l))),
        rule.family,
        rule.default_libs,
    );
    let pkgs = pick_bundle(
        &mut decisions,
        Field::Pkgs,
        request.pkgs.as_deref(),
        profile.and_then(|p| p.pkgs.as_deref().map(|l| (p, l))),
        rule.family,
        rule.default_pkgs,
    );

    let platform = select_platform(ctx, profile, request, rule, diagnostics);

    Ok(ResolvedConfig {
        profile: profile.map(|p| p.name.clone()),
        base_image,
        family: rule.family,
        libs,
        pkgs,
        decisions,
        platform,
        version: None,
        image_tag: None,
    })
}

fn deny_restricted(
    ctx: &Context,
    catalog: &Catalog,
    request: &ResolveRequest,
) -> labrig_core::Result<()> {
    let denied = if request.base_image.is_some() {
        Some(Field::BaseImage)
    } else if request.libs.is_some() {
        Some(Field::Libs)
    } else {
        profile_switch(ctx, catalog, request)?
    };
    if let Some(field) = denied {
        tracing::warn!(
            field = %field,
            team_image = %ctx.image_repository(),
            "override denied for team member"
        );
        return Err(labrig_core::Error::RestrictedOverrideDenied {
            field: match field {
                Field::BaseImage => "base image",
                Field::Libs => "library bundle",
                Field::Pkgs => "package bundle",
            },
            team_image: ctx.image_repository(),
        });
    }
    Ok(())
}

/// Members may pick another profile only when it keeps the team's base image
/// and library bundle.
fn profile_switch(
    ctx: &Context,
    catalog: &Catalog,
    request: &ResolveRequest,
) -> labrig_core::Result<Option<Field>> {
    let Some(requested) = request.profile.as_deref() else {
        return Ok(None);
    };
    if ctx.config.build.profile.as_deref() == Some(requested) {
        return Ok(None);
    }
    let requested = catalog.lookup_profile(requested)?;
    let (team_base, team_libs) = team_baseline(ctx, catalog)?;
    if requested.base_image != team_base {
        return Ok(Some(Field::BaseImage));
    }
    if profile_libs(requested) != team_libs {
        return Ok(Some(Field::Libs));
    }
    Ok(None)
}

/// Base image and library bundle the shared team image was built with.
fn team_baseline(ctx: &Context, catalog: &Catalog) -> labrig_core::Result<(String, String)> {
    let profile = match ctx.config.build.profile.as_deref() {
        Some(name) => catalog.lookup_profile(name)?,
        None => match catalog.lookup_profile(GLOBAL_DEFAULT_PROFILE) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "catalog has no default profile");
                let rule = family::classify(FALLBACK_BASE_IMAGE);
                return Ok((FALLBACK_BASE_IMAGE.to_owned(), rule.default_libs.to_owned()));
            }
        },
    };
    Ok((profile.base_image.clone(), profile_libs(profile)))
}

fn profile_libs(profile: &Profile) -> String {
    match &profile.libs {
        Some(libs) => libs.clone(),
        None => family::classify(&profile.base_image).default_libs.to_owned(),
    }
}

fn record(
    decisions: &mut Vec<Decision>,
    field: Field,
    value: &str,
    source: FieldSource,
    rationale: String,
) -> String {
    tracing::info!(field = %field, value, source = %source, "{rationale}");
    decisions.push(Decision {
        field,
        value: value.to_owned(),
        source,
        rationale,
    });
    value.to_owned()
}

fn pick_bundle(
    decisions: &mut Vec<Decision>,
    field: Field,
    user: Option<&str>,
    from_profile: Option<(&Profile, &str)>,
    family: ImageFamily,
    family_default: &str,
) -> String {
    if let Some(value) = user {
        let rationale = match from_profile {
            Some((p, replaced)) => {
                format!("explicit override replaces '{replaced}' from profile '{}'", p.name)
            }
            None => "explicit override".to_owned(),
        };
        return record(decisions, field, value, FieldSource::Override, rationale);
    }
    if let Some((p, value)) = from_profile {
        return record(
            decisions,
            field,
            value,
            FieldSource::Profile,
            format!("from profile '{}'", p.name),
        );
    }
    if family == ImageFamily::Generic {
        return record(
            decisions,
            field,
            family_default,
            FieldSource::GlobalDefault,
            "no profile, override or family match".to_owned(),
        );
    }
    record(
        decisions,
        field,
        family_default,
        FieldSource::FamilyDefault,
        format!("default for the {family} image family"),
    )
}

fn select_platform(
    ctx: &Context,
    profile: Option<&Profile>,
    request: &ResolveRequest,
    rule: &family::FamilyRule,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let supported: Vec<&str> = match profile {
        Some(p) if request.base_image.is_none() => p.arch.iter().map(String::as_str).collect(),
        _ => rule.arch.to_vec(),
    };
    if supported.iter().any(|a| *a == ctx.host_arch) {
        return None;
    }
    let target = if supported.contains(&"amd64") {
        "amd64"
    } else {
        supported.first().copied().unwrap_or("amd64")
    };
    let platform = format!("linux/{target}");
    diagnostics.warn(
        WarningKind::EmulatedPlatform,
        format!(
            "the base image is not published for {host}; building for {platform} under emulation",
            host = ctx.host_arch
        ),
    );
    Some(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labrig_core::LabrigConfig;
    use std::path::Path;

    fn ctx() -> Context {
        Context::new(Path::new("/work/demo"), LabrigConfig::default())
    }

    #[test]
    fn source_of_reports_latest_decision() {
        let catalog = Catalog::builtin().unwrap();
        let request = ResolveRequest {
            profile: Some("minimal".to_owned()),
            libs: Some("modeling".to_owned()),
            ..Default::default()
        };
        let config = resolve(&ctx(), &catalog, &request, &mut Diagnostics::new()).unwrap();
        assert_eq!(config.source_of(Field::Libs), Some(FieldSource::Override));
        assert_eq!(config.source_of(Field::Pkgs), Some(FieldSource::Profile));
        assert!(config.has_overrides());
    }

    #[test]
    fn profile_without_bundles_uses_family_defaults() {
        let yaml = r#"
profiles:
  spatial:
    base_image: rocker/geospatial
    description: spatial
    arch: [amd64]
library_bundles:
  geospatial: {deps: [libgdal-dev], package_manager: apt}
package_bundles:
  geospatial: {packages: [sf]}
"#;
        let catalog = Catalog::from_yaml_str(yaml, "test").unwrap();
        let request = ResolveRequest {
            profile: Some("spatial".to_owned()),
            ..Default::default()
        };
        let config = resolve(&ctx(), &catalog, &request, &mut Diagnostics::new()).unwrap();
        assert_eq!(config.libs, "geospatial");
        assert_eq!(config.source_of(Field::Libs), Some(FieldSource::FamilyDefault));
    }

    #[test]
    fn arm_host_on_amd64_only_image_is_emulated() {
        let catalog = Catalog::builtin().unwrap();
        let request = ResolveRequest {
            profile: Some("geospatial".to_owned()),
            ..Default::default()
        };
        let mut diags = Diagnostics::new();
        let ctx = ctx().with_host_arch("arm64");
        let config = resolve(&ctx, &catalog, &request, &mut diags).unwrap();
        assert_eq!(config.platform.as_deref(), Some("linux/amd64"));
        assert!(diags.has(WarningKind::EmulatedPlatform));
    }

    #[test]
    fn supported_arch_needs_no_platform() {
        let catalog = Catalog::builtin().unwrap();
        let request = ResolveRequest {
            profile: Some("minimal".to_owned()),
            ..Default::default()
        };
        let mut diags = Diagnostics::new();
        let ctx = ctx().with_host_arch("arm64");
        let config = resolve(&ctx, &catalog, &request, &mut diags).unwrap();
        assert!(config.platform.is_none());
        assert!(diags.is_empty());
    }
}
