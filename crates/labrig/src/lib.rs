//! Reproducible container builds for R data-analysis projects.
//!
//! This is the unified facade crate that re-exports the labrig sub-crates
//! and wires them into one resolution [`pipeline`].
//!
//! # Feature flags
//!
//! | Feature | Default | Crate | Description |
//! |---------|---------|-------|-------------|
//! | `build` | yes | [`labrig-build`](https://crates.io/crates/labrig-build) | Resolution, compatibility rules, Dockerfile generation |
//! | `registry` | yes | [`labrig-registry`](https://crates.io/crates/labrig-registry) | R version pinning and registry tag checks |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use labrig::{Catalog, Context, LabrigConfig};
//! use labrig::build::ResolveRequest;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = Path::new(".");
//! let ctx = Context::new(dir, LabrigConfig::load(dir)?);
//! let catalog = Catalog::builtin()?;
//! let request = ResolveRequest {
//!     profile: Some("analysis".to_owned()),
//!     ..Default::default()
//! };
//! let resolution = labrig::pipeline::run_offline(&ctx, &catalog, &request).await?;
//! println!("{}", resolution.image_tag);
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
pub use labrig_core::*;

/// Profile resolution, compatibility rules, strategy selection and generation.
///
/// See [`labrig-build`](https://crates.io/crates/labrig-build) for details.
#[cfg(feature = "build")]
pub mod build {
    pub use labrig_build::*;
}

/// R version priority chain and Docker Hub tag checks.
///
/// See [`labrig-registry`](https://crates.io/crates/labrig-registry) for details.
#[cfg(feature = "registry")]
pub mod registry {
    pub use labrig_registry::*;
}

#[cfg(all(feature = "build", feature = "registry"))]
pub mod pipeline;
