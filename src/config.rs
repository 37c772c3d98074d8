//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml, then layers an optional
//! user config file and environment variable overrides on top.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthMode;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// User config file name.
const CONFIG_FILE: &str = "config.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub tenant: String,
    pub redirect_uri: String,
    pub scopes: ScopesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopesConfig {
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Environment variable holding a pre-acquired Graph token.
    pub token_env: String,
    /// Ask the Azure CLI for a token when `token_env` is unset.
    pub azure_cli_fallback: bool,
    /// Authentication context class reference demanded at sign-in.
    #[serde(default)]
    pub acrs_context: Option<String>,
    pub callback_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub graph_base_url: String,
    pub login_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub countdown_seconds: u64,
    pub pause_before_exit: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml, the user config file
    /// and environment variable overrides.
    ///
    /// `path` names an explicit config file, which must exist. Without it the
    /// platform config directory is checked and used when a file is present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut table: toml::Table =
            toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")?;

        if let Some(user_path) = user_config_path(path)? {
            let content = fs::read_to_string(&user_path)
                .with_context(|| format!("Failed to read {}", user_path.display()))?;
            let overlay: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", user_path.display()))?;
            merge_tables(&mut table, overlay);
            debug!("Applied user configuration from {:?}", user_path);
        }

        let mut config: Config = toml::Value::Table(table)
            .try_into()
            .context("Invalid configuration")?;

        config.apply_env();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(client_id) = env::var("AZURE_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }

        if let Ok(tenant) = env::var("AZURE_TENANT_ID") {
            self.oauth.tenant = tenant;
        }

        if let Ok(redirect_uri) = env::var("AZURE_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }

        if let Ok(mode) = env::var("PIM_AUTH_MODE") {
            match mode.parse() {
                Ok(mode) => self.auth.mode = mode,
                Err(e) => warn!("Ignoring PIM_AUTH_MODE: {}", e),
            }
        }

        if let Ok(context) = env::var("PIM_ACRS_CONTEXT") {
            self.auth.acrs_context = Some(context).filter(|c| !c.trim().is_empty());
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            anyhow::bail!(
                "Entra ID client_id not configured. Set AZURE_CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.oauth.tenant.trim().is_empty() {
            anyhow::bail!(
                "Entra ID tenant not configured. Set AZURE_TENANT_ID environment variable \
                 or update config.toml"
            );
        }

        self.callback_port()?;

        Url::parse(&self.api.graph_base_url)
            .with_context(|| format!("Invalid graph_base_url: {}", self.api.graph_base_url))?;
        Url::parse(&self.api.login_base_url)
            .with_context(|| format!("Invalid login_base_url: {}", self.api.login_base_url))?;

        Ok(())
    }

    /// Get the authorization URL for Entra ID.
    pub fn auth_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.api.login_base_url.trim_end_matches('/'),
            self.oauth.tenant
        )
    }

    /// Get the token URL for Entra ID.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.api.login_base_url.trim_end_matches('/'),
            self.oauth.tenant
        )
    }

    /// Local port the OAuth redirect lands on.
    ///
    /// The redirect URI must be a plain-http loopback address with an explicit port.
    pub fn callback_port(&self) -> Result<u16> {
        let url = self.redirect_url()?;
        url.port()
            .with_context(|| format!("redirect_uri has no port: {}", self.oauth.redirect_uri))
    }

    /// Path component of the OAuth redirect URI.
    pub fn callback_path(&self) -> Result<String> {
        Ok(self.redirect_url()?.path().to_string())
    }

    fn redirect_url(&self) -> Result<Url> {
        let url = Url::parse(&self.oauth.redirect_uri)
            .with_context(|| format!("Invalid redirect_uri: {}", self.oauth.redirect_uri))?;

        let loopback = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
        if url.scheme() != "http" || !loopback {
            anyhow::bail!(
                "redirect_uri must be an http://localhost address, got {}",
                self.oauth.redirect_uri
            );
        }

        Ok(url)
    }
}

/// Default location of the user config file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pim-activate").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn user_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => anyhow::bail!("Config file not found: {}", path.display()),
        None => Ok(default_config_path().filter(|p| p.exists())),
    }
}

/// Recursively overlay `overlay` onto `base`; nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => match base.get_mut(&key) {
                Some(toml::Value::Table(base_table)) => merge_tables(base_table, overlay_table),
                _ => {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn embedded() -> Config {
        let table: toml::Table = toml::from_str(CONFIG_TOML).unwrap();
        toml::Value::Table(table).try_into().unwrap()
    }

    #[test]
    fn test_config_parsing() {
        let config = embedded();
        assert_eq!(config.auth.mode, AuthMode::Interactive);
        assert_eq!(config.session.countdown_seconds, 5);
        assert!(config.auth.acrs_context.is_none());
        assert!(config
            .oauth
            .scopes
            .scopes
            .iter()
            .any(|s| s == "RoleAssignmentSchedule.ReadWrite.Directory"));
    }

    #[test]
    fn test_embedded_defaults_validate() {
        assert!(embedded().validate().is_ok());
    }

    #[test]
    fn test_urls() {
        let mut config = embedded();
        config.oauth.tenant = "test-tenant".into();

        assert_eq!(
            config.auth_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/authorize"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/token"
        );
        assert_eq!(config.callback_port().unwrap(), 28491);
        assert_eq!(config.callback_path().unwrap(), "/callback");
    }

    #[test]
    fn test_validate_rejects_empty_client_id() {
        let mut config = embedded();
        config.oauth.client_id = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_remote_redirect() {
        let mut config = embedded();
        config.oauth.redirect_uri = "https://example.com:8443/callback".into();
        assert!(config.validate().is_err());

        config.oauth.redirect_uri = "http://localhost/callback".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_user_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\ncountdown_seconds = 0\n\n[auth]\nacrs_context = \"c1\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.session.countdown_seconds, 0);
        assert!(config.session.pause_before_exit);
        assert_eq!(config.auth.acrs_context.as_deref(), Some("c1"));
        assert_eq!(config.auth.token_env, "PIM_ACCESS_TOKEN");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/pim-activate.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_tables_replaces_scalars_and_merges_tables() {
        let mut base: toml::Table = toml::from_str("a = 1\n[t]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Table = toml::from_str("a = 5\n[t]\ny = 3").unwrap();
        merge_tables(&mut base, overlay);

        assert_eq!(base["a"].as_integer(), Some(5));
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
