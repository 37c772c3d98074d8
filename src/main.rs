//! pim-activate - Entra ID PIM role self-activation
//!
//! Signs the operator in, lists the directory roles they are eligible for,
//! asks for a role, duration and justification, and submits a
//! self-activation request through Microsoft Graph.

#![deny(clippy::all)]

mod activation;
mod auth;
mod cli;
mod config;
mod error;
mod pim;
mod prompt;
mod terminal;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use activation::{Flow, Outcome, WindDown};
use auth::{AuthMode, Authenticator};
use cli::Cli;
use config::Config;
use pim::PimClient;
use terminal::{style, Console, TerminalConsole};

fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only warn if it exists but could not be read
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            eprintln!("\nSet AZURE_CLIENT_ID and AZURE_TENANT_ID or pass --client-id/--tenant.");
            return Outcome::ConfigInvalid.into();
        }
    };

    init_logging(&config.logging.level);
    info!("Starting pim-activate v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{:#}", e);
            return Outcome::ConfigInvalid.into();
        }
    };

    let outcome = runtime.block_on(run(&cli, &config));
    info!("Exiting with code {}", outcome.exit_code());
    outcome.into()
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging. Logs go to stderr so they stay out of the prompts.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

async fn run(cli: &Cli, config: &Config) -> Outcome {
    let mut console = TerminalConsole::new();

    let authenticator = match Authenticator::new(config) {
        Ok(a) => a,
        Err(e) => {
            error!("Failed to create authenticator: {:#}", e);
            console.error(&format!("{:#}", e));
            return Outcome::ConfigInvalid;
        }
    };

    let session = match authenticator.connect(&mut console).await {
        Ok(session) => session,
        Err(e) => {
            error!("Authentication failed: {}", e);
            console.error(&e.to_string());
            console.plain(&style::dim(e.user_message()));
            return Outcome::AuthFailed;
        }
    };

    let via = match session.mode {
        AuthMode::Interactive => "interactive sign-in",
        AuthMode::TokenPassthrough => "existing token",
    };
    console.success(&format!(
        "Connected as {} ({})",
        style::value(session.user.describe()),
        via
    ));

    let (user, token) = session.into_parts();
    let api = match PimClient::new(&config.api, token) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to create PIM client: {}", e);
            console.error(&e.to_string());
            return Outcome::ConfigInvalid;
        }
    };

    let outcome = Flow::new(api, &mut console, WindDown::from(&config.session))
        .run(&user, &cli.answers())
        .await;

    if let Outcome::Activated { role, expires_at } = &outcome {
        info!("Activated {} until {}", role, expires_at.to_rfc3339());
    }

    outcome
}
