//! Command-line arguments.
//!
//! Flags are the last configuration layer: they override config files and
//! environment variables.

use std::path::PathBuf;

use clap::Parser;

use crate::auth::AuthMode;
use crate::config::Config;
use crate::prompt::Answers;

/// Self-activate an Entra ID PIM directory role.
#[derive(Parser, Debug)]
#[command(name = "pim-activate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// How to obtain the Graph token (also: PIM_AUTH_MODE)
    #[arg(long, value_enum)]
    pub auth: Option<AuthMode>,

    /// Tenant ID or domain (also: AZURE_TENANT_ID)
    #[arg(long)]
    pub tenant: Option<String>,

    /// Application (client) ID used for interactive sign-in (also: AZURE_CLIENT_ID)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Authentication context to satisfy at sign-in, e.g. c1 (also: PIM_ACRS_CONTEXT)
    #[arg(long, value_name = "ID")]
    pub acrs_context: Option<String>,

    /// Role to activate: list number or display name
    #[arg(long)]
    pub role: Option<String>,

    /// Activation duration, e.g. 1H, 30M or 2H30M
    #[arg(long)]
    pub duration: Option<String>,

    /// Reason for the activation
    #[arg(long)]
    pub justification: Option<String>,

    /// Seconds to count down before disconnecting
    #[arg(long, value_name = "SECONDS")]
    pub countdown: Option<u64>,

    /// Exit without waiting for a key press
    #[arg(long)]
    pub no_pause: bool,

    /// Config file to use instead of the platform default
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(mode) = self.auth {
            config.auth.mode = mode;
        }
        if let Some(tenant) = &self.tenant {
            config.oauth.tenant = tenant.clone();
        }
        if let Some(client_id) = &self.client_id {
            config.oauth.client_id = client_id.clone();
        }
        if let Some(context) = &self.acrs_context {
            config.auth.acrs_context = Some(context.clone()).filter(|c| !c.trim().is_empty());
        }
        if let Some(seconds) = self.countdown {
            config.session.countdown_seconds = seconds;
        }
        if self.no_pause {
            config.session.pause_before_exit = false;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }

    /// Answers supplied on the command line.
    pub fn answers(&self) -> Answers {
        Answers {
            role: self.role.clone(),
            duration: self.duration.clone(),
            justification: self.justification.clone(),
        }
    }
}
