//! Campfire bridge binary.
//!
//! ```bash
//! campfire --config campfire.toml --profile production
//! ```
//!
//! On first start the config file does not exist yet: a commented default is
//! written and the process exits so it can be filled in.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use campfire::runtime::{CampfireRuntime, ConfigLoader};

#[derive(Debug, Parser)]
#[command(name = "campfire", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = campfire::runtime::config::CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Configuration profile, e.g. `development` or `production`.
    #[arg(short, long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let created = ConfigLoader::ensure_default_file(&cli.config)
        .with_context(|| format!("failed to prepare {}", cli.config.display()))?;
    if created {
        println!(
            "Wrote a default configuration to {}. Fill it in and start campfire again.",
            cli.config.display()
        );
        return Ok(());
    }

    let mut builder = CampfireRuntime::builder().config_file(&cli.config);
    if let Some(profile) = cli.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;
    runtime.run().await?;
    Ok(())
}
