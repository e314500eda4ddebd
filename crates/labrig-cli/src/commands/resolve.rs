use super::ResolveArgs;
use labrig::pipeline::Resolution;
use labrig_build::{BuildArtifact, BuildStrategy};

pub async fn resolve(args: &ResolveArgs, json: bool) -> anyhow::Result<()> {
    let resolution = super::run_pipeline(args).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print_summary(&resolution);
    }
    Ok(())
}

fn print_summary(resolution: &Resolution) {
    let config = &resolution.config;

    if let Some(profile) = &config.profile {
        println!("Profile:     {profile}");
    }
    println!("Family:      {}", config.family);
    for decision in &config.decisions {
        println!(
            "  {:<15} {:<28} ({}: {})",
            decision.field.to_string(),
            decision.value,
            decision.source,
            decision.rationale
        );
    }

    if let Some(version) = &config.version {
        let status = if version.confirmed {
            "confirmed"
        } else {
            "unverified"
        };
        println!("R version:   {} (from {}, {status})", version.version, version.source);
    }
    if let Some(platform) = &config.platform {
        println!("Platform:    {platform} (emulated)");
    }

    match (&resolution.strategy, &resolution.artifact) {
        (BuildStrategy::Static { template_id }, BuildArtifact::Static { build_args, .. }) => {
            println!("Strategy:    pre-built template {template_id}");
            for (key, value) in build_args {
                println!("  --build-arg {key}={value}");
            }
        }
        _ => println!("Strategy:    synthesized Dockerfile"),
    }
    println!("Image tag:   {}", resolution.image_tag);

    if !resolution.diagnostics.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &resolution.diagnostics.warnings {
            println!("  [{}] {}", warning_label(warning.kind), warning.message);
        }
    }
}

fn warning_label(kind: labrig_core::WarningKind) -> &'static str {
    use labrig_core::WarningKind;
    match kind {
        WarningKind::Compatibility => "compatibility",
        WarningKind::EmulatedPlatform => "emulated-platform",
        WarningKind::RegistryUnreachable => "registry-unreachable",
        WarningKind::RegistryCheckSkipped => "offline",
        WarningKind::DegradedReproducibility => "reproducibility",
    }
}
