//! Access token handling and ambient token sources.
//!
//! Tokens are wrapped so they are zeroized on drop and never printed.

use std::env;

use tokio::process::Command;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AuthError;

/// A Graph access token that is cleared from memory on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Read a token from the environment variable `name`.
///
/// An optional `Bearer ` prefix is stripped; blank values count as unset.
pub fn from_env(name: &str) -> Option<AccessToken> {
    let value = env::var(name).ok()?;
    let token = normalize(&value)?;
    debug!("Using access token from {}", name);
    Some(token)
}

/// Ask the Azure CLI for a Graph token from its signed-in session.
pub async fn from_azure_cli() -> Result<AccessToken, AuthError> {
    info!("Requesting Graph token from the Azure CLI");

    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource-type",
            "ms-graph",
            "--query",
            "accessToken",
            "--output",
            "tsv",
        ])
        .output()
        .await
        .map_err(|e| AuthError::AzureCliFailed(format!("could not run az: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AuthError::AzureCliFailed(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| AuthError::AzureCliFailed(e.to_string()))?;

    normalize(&stdout)
        .ok_or_else(|| AuthError::AzureCliFailed("az returned an empty token".to_string()))
}

fn normalize(raw: &str) -> Option<AccessToken> {
    let trimmed = raw.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(AccessToken::new(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super_secret_token".to_string());
        let debug_output = format!("{:?}", token);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn test_normalize_strips_bearer_prefix() {
        let token = normalize("  Bearer eyJ0eXAi \n").unwrap();
        assert_eq!(token.as_str(), "eyJ0eXAi");
        assert!(normalize("   ").is_none());
    }

    #[test]
    fn test_from_env() {
        let name = "PIM_ACTIVATE_TEST_TOKEN_FROM_ENV";
        env::set_var(name, "abc123");
        assert_eq!(from_env(name).unwrap().as_str(), "abc123");

        env::set_var(name, "");
        assert!(from_env(name).is_none());

        env::remove_var(name);
        assert!(from_env(name).is_none());
    }
}
