//! Init command - write an example user config

use anyhow::Result;
use console::style;

use crate::config::FnhistConfig;

/// Run the init command
pub fn run() -> Result<()> {
    let existed = FnhistConfig::user_config_path().is_some_and(|p| p.exists());
    let path = FnhistConfig::init_user_config()?;

    if existed {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    } else {
        println!(
            "{} Created {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }
    println!("\nA project can override it with a .fnhist.toml at the repository root.");
    println!("Blame on GitHub repositories needs a token, in the config or via:");
    println!("  export GITHUB_TOKEN=\"ghp_...\"");
    Ok(())
}
