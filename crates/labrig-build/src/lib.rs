//! Build configuration resolution, validation, and generation for labrig.
//!
//! # Pipeline
//!
//! ```text
//! labrig resolve
//!   1. Resolve    ── overrides > profile > family default > global minimal
//!   2. Validate   ── RuleSet::builtin() (all violations batched)
//!   3. Strategy   ── Static(template) for untouched templated profiles, else Synthesize
//!   4. Generate   ── BuildArtifact (deterministic)
//!   5. Tag        ── team/project:<git revision>, date fallback
//! ```
//!
//! Version pinning lives in `labrig-registry` and runs between steps 2 and 3.

pub mod compat;
pub mod dockerfile;
pub mod resolve;
pub mod strategy;
pub mod tag;

pub use compat::{CompatibilityRule, RuleInput, RuleSet, validate};
pub use dockerfile::{BuildArtifact, Substitutions, generate};
pub use resolve::{Decision, Field, FieldSource, ResolveRequest, ResolvedConfig, resolve};
pub use strategy::{
    BuildStrategy, STATIC_TEMPLATES, StaticTemplate, select_strategy, template_source,
};
pub use tag::{build_date_today, compute_image_tag, git_short_revision};
