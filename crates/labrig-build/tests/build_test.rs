use labrig_build::{
    BuildArtifact, BuildStrategy, Field, FieldSource, ResolveRequest, ResolvedConfig, RuleSet,
    STATIC_TEMPLATES, Substitutions, generate, resolve, select_strategy, validate,
};
use labrig_core::{
    Catalog, Context, Diagnostics, ErrorKind, ImageFamily, LabrigConfig, Role, VersionSource,
    VersionSpec,
};
use std::path::Path;

const MIRROR: &str = "https://mirror.example/cran";

fn ctx() -> Context {
    Context::new(Path::new("/work/penguins"), LabrigConfig::default())
}

fn request(
    profile: Option<&str>,
    base: Option<&str>,
    libs: Option<&str>,
    pkgs: Option<&str>,
) -> ResolveRequest {
    ResolveRequest {
        profile: profile.map(str::to_owned),
        base_image: base.map(str::to_owned),
        libs: libs.map(str::to_owned),
        pkgs: pkgs.map(str::to_owned),
        r_version: None,
    }
}

fn resolve_ok(req: &ResolveRequest) -> ResolvedConfig {
    let catalog = Catalog::builtin().unwrap();
    resolve(&ctx(), &catalog, req, &mut Diagnostics::new()).unwrap()
}

fn subs() -> Substitutions {
    Substitutions {
        r_version: "4.4.0".to_owned(),
        platform: None,
        project_name: "penguins".to_owned(),
        restore_lockfile: true,
    }
}

// ── Resolution precedence ──

#[test]
fn override_beats_profile_and_is_recorded() {
    let config = resolve_ok(&request(Some("minimal"), None, Some("modeling"), None));

    assert_eq!(config.libs, "modeling");
    assert_eq!(config.source_of(Field::Libs), Some(FieldSource::Override));
    let decision = config
        .decisions
        .iter()
        .find(|d| d.field == Field::Libs)
        .unwrap();
    assert!(decision.rationale.contains("minimal"), "got: {}", decision.rationale);
    // Untouched fields still come from the profile.
    assert_eq!(config.pkgs, "minimal");
    assert_eq!(config.source_of(Field::Pkgs), Some(FieldSource::Profile));
}

#[test]
fn base_image_override_beats_profile() {
    let config = resolve_ok(&request(Some("analysis"), Some("rocker/r-ver"), None, None));
    assert_eq!(config.base_image, "rocker/r-ver");
    assert_eq!(config.family, ImageFamily::Rocker);
    assert!(config.is_overridden(Field::BaseImage));
}

#[test]
fn family_defaults_apply_without_profile() {
    let config = resolve_ok(&request(None, Some("rocker/verse"), None, None));
    assert_eq!(config.family, ImageFamily::Publishing);
    assert_eq!(config.libs, "publishing");
    assert_eq!(config.pkgs, "publishing");
    assert_eq!(config.source_of(Field::Libs), Some(FieldSource::FamilyDefault));
}

#[test]
fn nothing_given_falls_back_to_global_minimal() {
    let config = resolve_ok(&ResolveRequest::default());
    assert_eq!(config.base_image, "rocker/r-ver");
    assert_eq!(config.libs, "minimal");
    assert_eq!(config.pkgs, "minimal");
    assert_eq!(config.source_of(Field::BaseImage), Some(FieldSource::GlobalDefault));
    assert!(config.profile.is_none());
}

#[test]
fn unrecognized_image_uses_global_default_bundles() {
    let config = resolve_ok(&request(None, Some("ghcr.io/acme/r-custom"), None, None));
    assert_eq!(config.family, ImageFamily::Generic);
    assert_eq!(config.libs, "minimal");
    assert_eq!(config.source_of(Field::Pkgs), Some(FieldSource::GlobalDefault));
}

#[test]
fn configured_profile_is_used_when_flag_absent() {
    let mut config = LabrigConfig::default();
    config.build.profile = Some("modeling".to_owned());
    let ctx = Context::new(Path::new("/work/p"), config);
    let catalog = Catalog::builtin().unwrap();

    let resolved =
        resolve(&ctx, &catalog, &ResolveRequest::default(), &mut Diagnostics::new()).unwrap();
    assert_eq!(resolved.profile.as_deref(), Some("modeling"));
    assert_eq!(resolved.libs, "modeling");
}

#[test]
fn unknown_profile_fails_with_available_names() {
    let catalog = Catalog::builtin().unwrap();
    let err = resolve(
        &ctx(),
        &catalog,
        &request(Some("quantum"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProfile);
    assert!(err.to_string().contains("bioinformatics"));
}

// ── Restricted callers ──

#[test]
fn member_cannot_override_base_image() {
    let catalog = Catalog::builtin().unwrap();
    let member = ctx().with_role(Role::Member);
    let err = resolve(
        &member,
        &catalog,
        &request(None, Some("rocker/verse"), None, None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RestrictedOverrideDenied);
    assert!(err.to_string().contains("base image"));
    assert!(err.remediation().contains("team lead"));
}

#[test]
fn member_cannot_override_libs() {
    let catalog = Catalog::builtin().unwrap();
    let member = ctx().with_role(Role::Member);
    let err = resolve(
        &member,
        &catalog,
        &request(None, None, Some("geospatial"), None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RestrictedOverrideDenied);
    assert!(err.to_string().contains("library bundle"));
}

#[test]
fn member_may_choose_packages() {
    let catalog = Catalog::builtin().unwrap();
    let member = ctx().with_role(Role::Member);
    let config = resolve(
        &member,
        &catalog,
        &request(None, None, None, Some("tidyverse")),
        &mut Diagnostics::new(),
    )
    .unwrap();
    assert_eq!(config.pkgs, "tidyverse");
}

fn member_of(team_profile: &str) -> Context {
    let mut config = LabrigConfig::default();
    config.build.profile = Some(team_profile.to_owned());
    Context::new(Path::new("/work/penguins"), config).with_role(Role::Member)
}

#[test]
fn member_cannot_switch_to_profile_with_other_base_image() {
    let catalog = Catalog::builtin().unwrap();
    let err = resolve(
        &member_of("minimal"),
        &catalog,
        &request(Some("bioinformatics"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RestrictedOverrideDenied);
    assert!(err.to_string().contains("base image"));
}

#[test]
fn member_cannot_switch_to_profile_with_other_libs() {
    let catalog = Catalog::builtin().unwrap();
    // modeling shares rocker/r-ver with minimal but installs other system libraries
    let err = resolve(
        &member_of("minimal"),
        &catalog,
        &request(Some("modeling"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RestrictedOverrideDenied);
    assert!(err.to_string().contains("library bundle"));
}

#[test]
fn member_without_team_profile_is_held_to_default_image() {
    let catalog = Catalog::builtin().unwrap();
    let member = ctx().with_role(Role::Member);
    let err = resolve(
        &member,
        &catalog,
        &request(Some("geospatial"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RestrictedOverrideDenied);

    let config = resolve(
        &member,
        &catalog,
        &request(Some("minimal"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap();
    assert_eq!(config.base_image, "rocker/r-ver");
}

#[test]
fn member_may_name_team_profile_or_one_with_same_image() {
    let yaml = r#"
profiles:
  minimal:
    base_image: rocker/r-ver
    description: bare
    arch: [amd64]
    libs: minimal
    pkgs: minimal
  reporting:
    base_image: rocker/r-ver
    description: same image, different packages
    arch: [amd64]
    libs: minimal
    pkgs: tidyverse
library_bundles:
  minimal: {deps: [git], package_manager: apt}
package_bundles:
  minimal: {packages: [renv]}
  tidyverse: {packages: [renv, dplyr]}
"#;
    let catalog = Catalog::from_yaml_str(yaml, "test").unwrap();
    let member = member_of("minimal");
    for profile in ["minimal", "reporting"] {
        let config = resolve(
            &member,
            &catalog,
            &request(Some(profile), None, None, None),
            &mut Diagnostics::new(),
        )
        .unwrap();
        assert_eq!(config.base_image, "rocker/r-ver");
        assert_eq!(config.libs, "minimal");
    }
}

#[test]
fn lead_may_switch_profiles() {
    let catalog = Catalog::builtin().unwrap();
    let mut config = LabrigConfig::default();
    config.build.profile = Some("minimal".to_owned());
    let lead = Context::new(Path::new("/work/penguins"), config);
    let resolved = resolve(
        &lead,
        &catalog,
        &request(Some("bioinformatics"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap();
    assert_eq!(resolved.profile.as_deref(), Some("bioinformatics"));
}

// ── Compatibility ──

#[test]
fn every_builtin_profile_is_compatible() {
    let catalog = Catalog::builtin().unwrap();
    for name in catalog.profile_names() {
        let config = resolve_ok(&request(Some(name.as_str()), None, None, None));
        let result = validate(&config, &catalog, &RuleSet::builtin());
        assert!(result.is_ok(), "profile {name} rejected: {:?}", result.unwrap_err());
    }
}

#[test]
fn known_hard_errors_carry_remediation() {
    let catalog = Catalog::builtin().unwrap();
    let cases = [
        ("rhub/r-minimal", "none", "minimal"),
        ("bioconductor/bioconductor_docker", "minimal", "bioinfo"),
        ("rocker/geospatial", "none", "geospatial"),
        ("rocker/r-ver", "minimal", "geospatial"),
        ("rocker/r-ver", "alpine", "minimal"),
    ];
    for (base, libs, pkgs) in cases {
        let config = resolve_ok(&request(None, Some(base), Some(libs), Some(pkgs)));
        let err = validate(&config, &catalog, &RuleSet::builtin()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleCombination, "{base} {libs} {pkgs}");
        assert!(!err.remediation().trim().is_empty(), "{base} {libs} {pkgs}");
    }
}

#[test]
fn geospatial_with_no_libs_suggests_geospatial_bundle() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(None, Some("rocker/geospatial"), Some("none"), None));

    let err = validate(&config, &catalog, &RuleSet::builtin()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IncompatibleCombination);
    assert!(err.remediation().contains("--libs geospatial"), "got: {}", err.remediation());
}

#[test]
fn violations_are_batched() {
    let catalog = Catalog::builtin().unwrap();
    // Wrong libs for the image AND the packages' tag.
    let req = request(None, Some("rocker/geospatial"), Some("none"), Some("geospatial"));
    let config = resolve_ok(&req);
    let err = validate(&config, &catalog, &RuleSet::builtin()).unwrap_err();
    match err {
        labrig_core::Error::IncompatibleCombination { violations } => {
            let rules: Vec<_> = violations.iter().map(|v| v.rule).collect();
            assert!(rules.contains(&"geospatial-libs"), "got: {rules:?}");
            assert!(rules.contains(&"package-tags-need-libs"), "got: {rules:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn publishing_with_no_libs_warns_but_passes() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(None, Some("rocker/verse"), Some("none"), None));
    let warnings = validate(&config, &catalog, &RuleSet::builtin()).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule, "publishing-without-libs");
}

#[test]
fn empty_rule_set_accepts_anything() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(None, Some("rhub/r-minimal"), Some("none"), None));
    assert!(validate(&config, &catalog, &RuleSet::empty()).unwrap().is_empty());
}

// ── Strategy & generation ──

#[test]
fn untouched_known_profile_uses_static_template() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(Some("minimal"), None, None, None));
    let strategy = select_strategy(&config, &catalog, MIRROR).unwrap();
    assert_eq!(
        strategy,
        BuildStrategy::Static {
            template_id: "Dockerfile.minimal".to_owned()
        }
    );
}

#[test]
fn redefined_profile_no_longer_matches_its_template() {
    let yaml = r#"
profiles:
  minimal:
    base_image: rocker/tidyverse
    description: site-specific minimal
    arch: [amd64, arm64]
    libs: minimal
    pkgs: minimal
library_bundles:
  minimal: {deps: [git], package_manager: apt}
package_bundles:
  minimal: {packages: [renv]}
"#;
    let catalog = Catalog::from_yaml_str(yaml, "site").unwrap();
    let config = resolve(
        &ctx(),
        &catalog,
        &request(Some("minimal"), None, None, None),
        &mut Diagnostics::new(),
    )
    .unwrap();
    assert!(!config.has_overrides());

    match select_strategy(&config, &catalog, MIRROR).unwrap() {
        BuildStrategy::Synthesize { base_image, .. } => {
            assert_eq!(base_image, "rocker/tidyverse");
        }
        other => panic!("expected synthesis, got {other:?}"),
    }
}

#[test]
fn templates_install_what_the_builtin_catalog_declares() {
    let catalog = Catalog::builtin().unwrap();
    for template in STATIC_TEMPLATES {
        let profile = catalog.lookup_profile(template.profile).unwrap();
        assert_eq!(profile.base_image, template.base_image, "{}", template.id);
        assert_eq!(profile.libs.as_deref(), Some(template.libs), "{}", template.id);
        assert_eq!(profile.pkgs.as_deref(), Some(template.pkgs), "{}", template.id);

        let libs = catalog.lookup_library_bundle(template.libs).unwrap();
        for dep in &libs.deps {
            assert!(template.contents.contains(dep.as_str()), "{} misses {dep}", template.id);
        }
        let pkgs = catalog.lookup_package_bundle(template.pkgs).unwrap();
        for package in &pkgs.packages {
            assert!(
                template.contents.contains(package.as_str()),
                "{} misses {package}",
                template.id
            );
        }
    }
}

#[test]
fn override_forces_synthesis() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(Some("minimal"), None, None, Some("tidyverse")));
    let strategy = select_strategy(&config, &catalog, MIRROR).unwrap();
    assert!(matches!(strategy, BuildStrategy::Synthesize { .. }));
}

#[test]
fn profile_without_template_is_synthesized() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(Some("alpine_minimal"), None, None, None));
    match select_strategy(&config, &catalog, MIRROR).unwrap() {
        BuildStrategy::Synthesize {
            base_image,
            library_install_cmd,
            package_install_cmd,
        } => {
            assert_eq!(base_image, "rhub/r-minimal");
            assert!(library_install_cmd.unwrap().starts_with("apk add --no-cache"));
            assert!(package_install_cmd.unwrap().contains(MIRROR));
        }
        other => panic!("expected synthesis, got {other:?}"),
    }
}

#[test]
fn synthesized_dockerfile_contains_resolved_values() {
    let catalog = Catalog::builtin().unwrap();
    let req = request(None, Some("rocker/r-ver"), Some("modeling"), Some("modeling"));
    let config = resolve_ok(&req);
    let strategy = select_strategy(&config, &catalog, MIRROR).unwrap();
    let artifact = generate(&strategy, &subs());
    let dockerfile = artifact.dockerfile().unwrap();

    assert!(dockerfile.contains("ARG R_VERSION=4.4.0"));
    assert!(dockerfile.contains("FROM rocker/r-ver:${R_VERSION}"));
    assert!(dockerfile.contains("apt-get install -y --no-install-recommends"));
    assert!(dockerfile.contains("gfortran"));
    assert!(
        dockerfile.contains("install2.r --error --skipinstalled --ncpus -1 renv here tidymodels")
    );
    assert!(dockerfile.contains("renv::restore"));
    assert!(dockerfile.contains("WORKDIR /home/analyst/penguins"));
}

#[test]
fn emulated_platform_is_written_into_from() {
    let catalog = Catalog::builtin().unwrap();
    let config = resolve_ok(&request(None, Some("rocker/r-ver"), None, None));
    let strategy = select_strategy(&config, &catalog, MIRROR).unwrap();
    let mut substitutions = subs();
    substitutions.platform = Some("linux/amd64".to_owned());
    let artifact = generate(&strategy, &substitutions);
    let dockerfile = artifact.dockerfile().unwrap();
    assert!(dockerfile.contains("FROM --platform=linux/amd64 rocker/r-ver"));
}

#[test]
fn static_artifact_carries_build_args() {
    let strategy = BuildStrategy::Static {
        template_id: "Dockerfile.minimal".to_owned(),
    };
    match generate(&strategy, &subs()) {
        BuildArtifact::Static {
            template_id,
            build_args,
            dockerfile,
        } => {
            assert_eq!(template_id, "Dockerfile.minimal");
            assert_eq!(build_args["R_VERSION"], "4.4.0");
            assert_eq!(build_args["PROJECT_NAME"], "penguins");
            assert!(dockerfile.contains("FROM --platform=${TARGETPLATFORM} rocker/r-ver"));
        }
        other => panic!("expected static artifact, got {other:?}"),
    }
}

#[test]
fn substitutions_follow_resolved_config() {
    let config = resolve_ok(&request(Some("minimal"), None, None, None));
    let version = VersionSpec::new("4.3.1", VersionSource::Lockfile);
    let substitutions = Substitutions::new(&config, &version, &ctx(), false);
    assert_eq!(substitutions.r_version, "4.3.1");
    assert_eq!(substitutions.project_name, "penguins");
    assert!(!substitutions.restore_lockfile);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn bundle_names() -> Vec<String> {
        let catalog = Catalog::builtin().unwrap();
        catalog.library_bundle_names()
    }

    proptest! {
        #[test]
        fn generate_is_idempotent(
            base in prop::sample::select(vec![
                "rocker/r-ver", "rocker/verse", "rocker/geospatial",
                "rhub/r-minimal", "bioconductor/bioconductor_docker", "ghcr.io/acme/r",
            ]),
            libs in prop::sample::select(bundle_names()),
            restore in any::<bool>(),
        ) {
            let catalog = Catalog::builtin().unwrap();
            let config = resolve_ok(&request(None, Some(base), Some(libs.as_str()), None));
            let strategy = select_strategy(&config, &catalog, MIRROR).unwrap();
            let mut substitutions = subs();
            substitutions.restore_lockfile = restore;
            let first = generate(&strategy, &substitutions);
            let second = generate(&strategy, &substitutions);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn override_always_wins(
            profile in prop::sample::select(Catalog::builtin().unwrap().profile_names()),
            libs in prop::sample::select(bundle_names()),
        ) {
            let req = request(Some(profile.as_str()), None, Some(libs.as_str()), None);
            let config = resolve_ok(&req);
            prop_assert_eq!(&config.libs, &libs);
            prop_assert_eq!(config.source_of(Field::Libs), Some(FieldSource::Override));
        }

        #[test]
        fn validation_is_total(
            base in "[a-z]{1,8}/[a-z-]{1,12}",
            libs in prop::sample::select(bundle_names()),
        ) {
            let catalog = Catalog::builtin().unwrap();
            let config = resolve_ok(&request(None, Some(base.as_str()), Some(libs.as_str()), None));
            // Either accepted (possibly with warnings) or rejected with a remediation.
            if let Err(err) = validate(&config, &catalog, &RuleSet::builtin()) {
                prop_assert_eq!(err.kind(), ErrorKind::IncompatibleCombination);
                prop_assert!(!err.remediation().is_empty());
            }
        }
    }
}
