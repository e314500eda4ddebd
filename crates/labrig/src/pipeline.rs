//! End-to-end resolution: request in, build artifact and image tag out.

use labrig_build::{
    BuildArtifact, BuildStrategy, ResolveRequest, ResolvedConfig, RuleSet, Substitutions,
    compute_image_tag, generate, resolve, select_strategy, validate,
};
use labrig_core::{Catalog, Context, Diagnostics, Result, WarningKind};
use labrig_registry::{
    HttpTransport, RegistryClient, RegistryTransport, resolve_version, validate_version,
};
use serde::Serialize;

/// Everything one successful resolution produces.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Resolved configuration with the pinned version and image tag filled in.
    pub config: ResolvedConfig,
    pub strategy: BuildStrategy,
    pub artifact: BuildArtifact,
    pub image_tag: String,
    pub diagnostics: Diagnostics,
}

/// Run the full pipeline with the built-in compatibility rules.
///
/// `registry = None` skips the remote version check and records a
/// [`WarningKind::RegistryCheckSkipped`] warning.
pub async fn run<T: RegistryTransport>(
    ctx: &Context,
    catalog: &Catalog,
    request: &ResolveRequest,
    registry: Option<&RegistryClient<T>>,
) -> Result<Resolution> {
    run_with_rules(ctx, catalog, &RuleSet::builtin(), request, registry).await
}

/// [`run`] without a registry.
pub async fn run_offline(
    ctx: &Context,
    catalog: &Catalog,
    request: &ResolveRequest,
) -> Result<Resolution> {
    run::<HttpTransport>(ctx, catalog, request, None).await
}

pub async fn run_with_rules<T: RegistryTransport>(
    ctx: &Context,
    catalog: &Catalog,
    rules: &RuleSet,
    request: &ResolveRequest,
    registry: Option<&RegistryClient<T>>,
) -> Result<Resolution> {
    let mut diagnostics = Diagnostics::new();

    // 1. Resolve
    let mut config = resolve(ctx, catalog, request, &mut diagnostics)?;

    // 2. Validate
    for warning in validate(&config, catalog, rules)? {
        diagnostics.warn(
            WarningKind::Compatibility,
            format!(
                "{}: {} (suggested: {})",
                warning.rule, warning.cause, warning.remediation
            ),
        );
    }

    // 3. Pin the R version
    let lockfile = ctx.lockfile_path();
    let version = resolve_version(
        request.r_version.as_deref(),
        ctx.config.build.r_version.as_deref(),
        &lockfile,
    )?;
    let version = match registry {
        Some(client) => validate_version(version, client, &mut diagnostics).await?,
        None => {
            diagnostics.warn(
                WarningKind::RegistryCheckSkipped,
                format!("offline: R {} was not checked against the registry", version.version),
            );
            version
        }
    };

    // 4. Strategy + artifact
    let strategy = select_strategy(&config, catalog, &ctx.config.build.binary_mirror)?;
    let substitutions = Substitutions::new(&config, &version, ctx, lockfile.exists());
    let artifact = generate(&strategy, &substitutions);

    // 5. Tag
    let image_tag = compute_image_tag(ctx, &mut diagnostics);

    config.version = Some(version);
    config.image_tag = Some(image_tag.clone());

    tracing::info!(
        image_tag = %image_tag,
        warnings = diagnostics.warnings.len(),
        "resolution complete"
    );

    Ok(Resolution {
        config,
        strategy,
        artifact,
        image_tag,
        diagnostics,
    })
}
