// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, build the client, hand it to the
//   UI loop.
// - Configuration errors abort here; failures of individual menu actions
//   are reported by the UI and the loop carries on.

use anyhow::Context;
use mailcow_admin::{ui::main_menu, MailcowClient};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "mailcow_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // MAILCOW_API_HOST / MAILCOW_API_KEY, or the config file. See
    // `Config::load`.
    let api = MailcowClient::from_env().context("Failed to build API client")?;
    tracing::info!("using mailcow API at {}", api.api_host());

    main_menu(&api)?;
    Ok(())
}
