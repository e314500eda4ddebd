use std::path::Path;

const LABRIG_TOML: &str = r#"[project]
# name = "my-analysis"
# team = "my-lab"
# role = "lead"            # "member" builds on the team image without changing it

[build]
# profile = "analysis"
# r_version = "4.4.0"      # otherwise taken from renv.lock
# lockfile = "renv.lock"
# catalog = "bundles.yaml"
# binary_mirror = "https://packagemanager.posit.co/cran/__linux__/noble/latest"

[registry]
# version_repository = "rocker/r-ver"
# timeout_secs = 5
"#;

/// Write a commented labrig.toml into the current directory.
pub fn init_project() -> anyhow::Result<()> {
    let path = Path::new("labrig.toml");
    if path.exists() {
        eprintln!("labrig.toml already exists, skipping");
        return Ok(());
    }

    std::fs::write(path, LABRIG_TOML)?;
    println!("Created labrig.toml");
    println!();
    println!("Next steps:");
    println!();
    println!("  1. Pick a profile:");
    println!("     labrig profiles");
    println!();
    println!("  2. Check the resolved configuration:");
    println!("     labrig resolve --profile analysis");
    println!();
    println!("  3. Write the Dockerfile:");
    println!("     labrig generate");

    Ok(())
}
