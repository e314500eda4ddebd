use super::ResolveArgs;
use labrig_build::BuildArtifact;
use std::path::Path;

pub async fn generate(args: &ResolveArgs, output: &Path) -> anyhow::Result<()> {
    let resolution = super::run_pipeline(args).await?;

    for warning in &resolution.diagnostics.warnings {
        eprintln!("warning: {}", warning.message);
    }

    let Some(dockerfile) = resolution.artifact.dockerfile() else {
        anyhow::bail!("no Dockerfile was produced for this configuration");
    };
    std::fs::write(output, dockerfile)?;

    let build_args = match &resolution.artifact {
        BuildArtifact::Static {
            template_id,
            build_args,
            ..
        } => {
            println!("Wrote {} from template {template_id}", output.display());
            build_args
                .iter()
                .map(|(k, v)| format!(" --build-arg {k}={v}"))
                .collect::<String>()
        }
        BuildArtifact::Synthesized { .. } => {
            println!("Wrote {}", output.display());
            String::new()
        }
    };
    println!();
    println!("Build with:");
    println!(
        "  docker build -f {}{build_args} -t {} .",
        output.display(),
        resolution.image_tag
    );
    Ok(())
}
