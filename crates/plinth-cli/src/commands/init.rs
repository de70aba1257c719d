use std::path::Path;

use plinth_core::PlinthConfig;

pub fn init(name: &str, project: &str, path: &str) -> anyhow::Result<()> {
    let config = PlinthConfig::scaffold(name, project);
    let output = Path::new(path).join("plinth.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    std::fs::write(&output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
