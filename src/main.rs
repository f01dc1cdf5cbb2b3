// Entrypoint for the CLI application.
// - Installs the tracing subscriber (filter from `RUST_LOG`, default `warn`).
// - Builds the API client from the environment and hands it to the menu.

use anyhow::Context;
use delorme_cli::{api::ApiClient, api::ClientConfig, ui};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    let credentials = ui::credentials()?;
    let api = ApiClient::new(&config, credentials).context("Failed to build HTTP client")?;

    // Blocks until the user exits or authentication fails.
    ui::main_menu(&api)?;
    Ok(())
}
