mod generate;
mod init;
mod profiles;
mod resolve;

use anyhow::Context as _;
use clap::Args;
use labrig::pipeline::{self, Resolution};
use labrig_build::{ResolveRequest, build_date_today, git_short_revision};
use labrig_core::{Catalog, Context, LabrigConfig, Role, family};
use labrig_registry::RegistryClient;
use std::path::{Path, PathBuf};

pub use generate::generate;
pub use init::init_project;
pub use profiles::profiles;
pub use resolve::resolve;

/// Flags shared by `resolve` and `generate`.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Profile to start from
    #[arg(long)]
    pub profile: Option<String>,
    /// Override the base image
    #[arg(long)]
    pub base_image: Option<String>,
    /// Override the system library bundle
    #[arg(long)]
    pub libs: Option<String>,
    /// Override the R package bundle
    #[arg(long)]
    pub pkgs: Option<String>,
    /// Pin the R version (MAJOR.MINOR[.PATCH])
    #[arg(long)]
    pub r_version: Option<String>,
    /// Bundle catalog file (defaults to [build].catalog, then the built-in catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Resolve as a team member building on the shared team image
    #[arg(long)]
    pub member: bool,
    /// Skip the registry check for the R version
    #[arg(long)]
    pub offline: bool,
}

impl ResolveArgs {
    fn request(&self) -> ResolveRequest {
        ResolveRequest {
            profile: self.profile.clone(),
            base_image: self.base_image.clone(),
            libs: self.libs.clone(),
            pkgs: self.pkgs.clone(),
            r_version: self.r_version.clone(),
        }
    }
}

/// Load the catalog from an explicit path, the configured path, or the built-in copy.
fn load_catalog(explicit: Option<&Path>, configured: Option<PathBuf>) -> anyhow::Result<Catalog> {
    let catalog = match explicit.map(Path::to_path_buf).or(configured) {
        Some(path) => Catalog::load(&path)?,
        None => Catalog::builtin()?,
    };
    tracing::debug!(origin = catalog.origin(), "loaded bundle catalog");
    Ok(catalog)
}

fn project_context(dir: &Path, member: bool) -> anyhow::Result<Context> {
    let config = LabrigConfig::load(dir)?;
    let mut ctx = Context::new(dir, config)
        .with_host_arch(family::docker_arch(std::env::consts::ARCH))
        .with_revision(git_short_revision(dir))
        .with_build_date(build_date_today());
    if member {
        ctx = ctx.with_role(Role::Member);
    }
    Ok(ctx)
}

/// Run the full pipeline for the current directory.
async fn run_pipeline(args: &ResolveArgs) -> anyhow::Result<Resolution> {
    let dir = std::env::current_dir().context("failed to read current directory")?;
    let ctx = project_context(&dir, args.member)?;
    let catalog = load_catalog(args.catalog.as_deref(), ctx.catalog_path())?;
    let request = args.request();

    let resolution = if args.offline {
        pipeline::run_offline(&ctx, &catalog, &request).await?
    } else {
        let client = RegistryClient::new(&ctx.config.registry)?;
        pipeline::run(&ctx, &catalog, &request, Some(&client)).await?
    };
    Ok(resolution)
}

/// Print an error with its kind and, for resolution errors, the fix.
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<labrig_core::Error>() {
        Some(e) => {
            eprintln!("error[{}]: {e}", e.kind());
            let mut source = std::error::Error::source(e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            eprintln!();
            eprintln!("To fix:");
            for line in e.remediation().lines() {
                eprintln!("  {line}");
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}
