use anyhow::Context;
use dotenv::dotenv;
use mimalloc::MiMalloc;

use contacts_bootstrap::{logging, Bootstrapper, Settings};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::from_env().context("failed to load settings")?;
    logging::init_logging(&settings.logging)?;

    let bootstrapper = Bootstrapper::from_settings(&settings);
    let config = bootstrapper.config();
    tracing::info!(
        backend = %config.backend,
        database = %config.database,
        seed_policy = %settings.seed_policy,
        "bootstrapping contacts database"
    );

    let report = bootstrapper
        .run()
        .await
        .with_context(|| format!("failed to bootstrap database {}", config.database))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
