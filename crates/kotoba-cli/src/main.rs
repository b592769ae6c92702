//! Main entry point for kotoba.

use anyhow::{anyhow, Context};
use clap::Parser;
use kotoba_cli::{App, Cli};
use kotoba_common::init_logging;
use kotoba_config::{ConfigCache, ConfigLoader};
use kotoba_i18n::SetLocaleOutcome;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .context("failed to load configuration")?;

    let cache = ConfigCache::new(config);
    cache
        .modify(|config| cli.apply(config))
        .context("invalid command-line override")?;
    let config = cache.get();

    init_logging(&config.logging).map_err(|e| anyhow!(e))?;
    info!("Starting kotoba");

    let app = App::new(config.as_ref().clone())?;
    app.start().await?;
    print!("{}", app.render());

    let params = cli.key_params();
    for key in &cli.keys {
        println!("{key} = {}", app.localizer().get_text(key, &params));
    }

    if let Some(code) = &cli.switch_to {
        match app.switch(code).await {
            SetLocaleOutcome::Applied => {
                println!("-- switched to {}", app.localizer().current_locale());
                print!("{}", app.render());
            }
            outcome => warn!("Locale change to '{}' not applied: {:?}", code, outcome),
        }
    }

    if cli.details {
        let details = app.localizer().detection_details();
        println!("{}", serde_json::to_string_pretty(&details)?);
    }

    app.shutdown();
    Ok(())
}
