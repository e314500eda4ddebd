//! Image tagging for shared team images.
//!
//! The tag is the short git revision of the working tree. Without one the
//! tag falls back to the build date and reproducibility tracking degrades.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use labrig_core::{Context, Diagnostics, WarningKind};

/// `repository:tag` for the image built from `ctx`.
pub fn compute_image_tag(ctx: &Context, diagnostics: &mut Diagnostics) -> String {
    let repository = sanitize_repository(&ctx.image_repository());
    match ctx.revision.as_deref().filter(|r| !r.is_empty()) {
        Some(revision) => {
            tracing::debug!(revision, "tagging image with git revision");
            format!("{repository}:{revision}")
        }
        None => {
            diagnostics.warn(
                WarningKind::DegradedReproducibility,
                format!(
                    "no git revision available; tagging with build date {} \
                     (commit your work to tie the image to a source state)",
                    ctx.build_date
                ),
            );
            format!("{repository}:{}", ctx.build_date)
        }
    }
}

/// Short revision of `HEAD` in `project_dir`, or `None` outside a git repository.
pub fn git_short_revision(project_dir: &Path) -> Option<String> {
    let output = match Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(project_dir)
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "failed to execute git rev-parse");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git rev-parse failed"
        );
        return None;
    }

    let revision = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!revision.is_empty()).then_some(revision)
}

/// Today's UTC date as `YYYYMMDD`.
pub fn build_date_today() -> String {
    date_stamp(Utc::now())
}

fn date_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Lowercase and replace characters Docker does not allow in repository names.
fn sanitize_repository(repository: &str) -> String {
    repository
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use labrig_core::LabrigConfig;

    fn ctx() -> Context {
        let mut config = LabrigConfig::default();
        config.project.team = Some("mylab".to_owned());
        config.project.name = Some("Penguin Study".to_owned());
        Context::new(Path::new("."), config).with_build_date("20261015")
    }

    #[test]
    fn revision_tag_wins() {
        let mut diags = Diagnostics::new();
        let tag = compute_image_tag(&ctx().with_revision(Some("a1b2c3d".to_owned())), &mut diags);
        assert_eq!(tag, "mylab/penguin-study:a1b2c3d");
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_revision_falls_back_to_date_with_warning() {
        let mut diags = Diagnostics::new();
        let tag = compute_image_tag(&ctx(), &mut diags);
        assert_eq!(tag, "mylab/penguin-study:20261015");
        assert!(diags.has(WarningKind::DegradedReproducibility));
    }

    #[test]
    fn empty_revision_counts_as_missing() {
        let mut diags = Diagnostics::new();
        let tag = compute_image_tag(&ctx().with_revision(Some(String::new())), &mut diags);
        assert!(tag.ends_with(":20261015"));
    }

    #[test]
    fn date_stamp_is_compact_utc_date() {
        let at = |secs| DateTime::from_timestamp(secs, 0).unwrap();
        assert_eq!(date_stamp(at(0)), "19700101");
        assert_eq!(date_stamp(at(951_782_400)), "20000229");
        assert_eq!(date_stamp(at(1_704_067_199)), "20231231");
    }

    #[test]
    fn today_has_eight_digits() {
        let today = build_date_today();
        assert_eq!(today.len(), 8);
        assert!(today.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn git_revision_outside_repository_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(git_short_revision(tmp.path()).is_none());
    }
}
