use std::path::Path;

pub fn profiles(catalog: Option<&Path>) -> anyhow::Result<()> {
    let catalog = super::load_catalog(catalog, None)?;

    let width = catalog
        .profiles()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);

    for profile in catalog.profiles() {
        println!(
            "{:width$}  {}  [{}]",
            profile.name,
            profile.base_image,
            profile.arch.join(", ")
        );
        println!(
            "{:width$}  libs: {}, pkgs: {}",
            "",
            profile.libs.as_deref().unwrap_or("(family default)"),
            profile.pkgs.as_deref().unwrap_or("(family default)")
        );
        println!("{:width$}  {}", "", profile.description);
    }
    Ok(())
}
