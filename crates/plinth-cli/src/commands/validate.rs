use std::path::Path;

use plinth_core::PlinthConfig;
use plinth_stack::CredentialGraph;

pub fn validate(config_path: &str) -> anyhow::Result<()> {
    let config = PlinthConfig::from_file(Path::new(config_path))?;

    // Surface role problems (format, duplicates, empty list) without
    // touching the handler source or building a full plan.
    CredentialGraph::new(
        &config.stack.project,
        &format!("{}-identity", config.stack.name),
        config.iam.display_name.as_deref().unwrap_or("Plinth stack identity"),
        &config.iam.roles,
    )?;

    println!("✓ {} roles valid", config.iam.roles.len());
    if config.network_policy().is_public() {
        println!("⚠ database network policy is public-open (0.0.0.0/0) — demo environments only");
    } else {
        println!("✓ database network policy: private-default");
    }
    println!("✓ {config_path} is valid");
    Ok(())
}
