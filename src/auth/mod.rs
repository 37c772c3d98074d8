//! Entra ID authentication.
//!
//! One authenticator with two capabilities: interactive browser sign-in with
//! OAuth2 + PKCE (optionally demanding an authentication context), and
//! passthrough of an ambient token. Either way the result is a [`Session`]
//! bound to the signed-in principal.

pub mod callback_server;
pub mod graph;
pub mod oauth;
pub mod token;

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AuthError;
use crate::terminal::Console;
use callback_server::{CallbackResult, CallbackServer};
use graph::{GraphClient, UserInfo};
use oauth::{parse_callback_url, OAuth2Client, PkceChallenge};
use token::AccessToken;

/// How the operator's token is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Browser sign-in with MFA through the authorization-code flow.
    Interactive,
    /// Reuse a token from the environment or the Azure CLI session.
    #[serde(alias = "token")]
    #[value(alias = "token")]
    TokenPassthrough,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "token" | "token-passthrough" => Ok(Self::TokenPassthrough),
            other => Err(format!("unknown auth mode '{}'", other)),
        }
    }
}

/// An authenticated connection to Microsoft Graph.
#[derive(Debug)]
pub struct Session {
    pub user: UserInfo,
    pub mode: AuthMode,
    token: AccessToken,
}

impl Session {
    /// Split the session into the principal and its token.
    pub fn into_parts(self) -> (UserInfo, AccessToken) {
        (self.user, self.token)
    }
}

/// Obtains a token with the configured capability and opens a session.
pub struct Authenticator<'a> {
    config: &'a Config,
    graph: GraphClient,
}

impl<'a> Authenticator<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(Self {
            config,
            graph: GraphClient::new(&config.api.graph_base_url)?,
        })
    }

    /// Authenticate and resolve the signed-in principal.
    pub async fn connect<C: Console>(&self, console: &mut C) -> Result<Session, AuthError> {
        let mode = self.config.auth.mode;
        info!("Authenticating ({:?})", mode);

        let token = match mode {
            AuthMode::Interactive => self.sign_in_interactive(console).await?,
            AuthMode::TokenPassthrough => self.passthrough_token().await?,
        };

        let profile = self.graph.get_user_profile(token.as_str()).await?;

        let organization = match self.graph.get_organization(token.as_str()).await {
            Ok(org) => Some(org),
            Err(e) => {
                debug!("Organization lookup failed: {}", e);
                None
            }
        };

        let user = UserInfo::from_profile_and_org(profile, organization);
        info!("Session opened for principal {}", user.principal_id);

        Ok(Session { user, mode, token })
    }

    async fn sign_in_interactive<C: Console>(&self, console: &mut C) -> Result<AccessToken, AuthError> {
        let oauth = OAuth2Client::new(self.config).map_err(|e| AuthError::OAuthFailed(e.to_string()))?;
        let port = self
            .config
            .callback_port()
            .map_err(|e| AuthError::CallbackServer(e.to_string()))?;
        let callback_path = self
            .config
            .callback_path()
            .map_err(|e| AuthError::CallbackServer(e.to_string()))?;

        let server = CallbackServer::bind(port)?;
        debug!("Waiting for the sign-in redirect on port {}", server.port());

        let pkce = PkceChallenge::new();
        let (auth_url, expected_state) = oauth.generate_auth_url(&pkce);

        if let Some(context) = &self.config.auth.acrs_context {
            console.info(&format!("Sign-in will require authentication context '{}'.", context));
        }
        console.info("Opening your browser to sign in...");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("Failed to open browser: {}", e);
            console.warn("Could not open a browser. Open this URL to sign in:");
            console.plain(auth_url.as_str());
        }

        let timeout = Duration::from_secs(self.config.auth.callback_timeout_seconds);
        let result = tokio::task::spawn_blocking(move || server.wait(&callback_path, timeout))
            .await
            .map_err(|e| AuthError::CallbackServer(e.to_string()))?;

        let callback_url = match result {
            CallbackResult::Success(url) => url,
            CallbackResult::TimedOut => return Err(AuthError::CallbackTimeout),
            CallbackResult::Error(e) => return Err(AuthError::CallbackServer(e)),
        };

        let (code, state) = parse_callback_url(&callback_url)?;
        if state != expected_state {
            return Err(AuthError::StateValidationFailed);
        }

        let token_response = oauth.exchange_code(&code, &pkce.verifier).await?;
        debug!(
            "Token acquired, expires in {}s, scopes: {}",
            token_response.expires_in, token_response.scope
        );

        Ok(token_response.into_access_token())
    }

    async fn passthrough_token(&self) -> Result<AccessToken, AuthError> {
        let env_name = &self.config.auth.token_env;

        if let Some(token) = token::from_env(env_name) {
            return Ok(token);
        }

        if !self.config.auth.azure_cli_fallback {
            return Err(AuthError::TokenUnavailable(format!("{} is not set", env_name)));
        }

        debug!("{} not set, falling back to the Azure CLI", env_name);
        token::from_azure_cli().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::terminal::scripted::ScriptedConsole;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn passthrough_config(graph_base_url: &str, token_env: &str) -> Config {
        let mut config = Config::load(None).unwrap();
        config.auth.mode = AuthMode::TokenPassthrough;
        config.auth.token_env = token_env.into();
        config.auth.azure_cli_fallback = false;
        config.api.graph_base_url = graph_base_url.into();
        config
    }

    #[test]
    fn test_auth_mode_from_str() {
        assert_eq!("interactive".parse::<AuthMode>().unwrap(), AuthMode::Interactive);
        assert_eq!("TOKEN".parse::<AuthMode>().unwrap(), AuthMode::TokenPassthrough);
        assert_eq!(
            "token-passthrough".parse::<AuthMode>().unwrap(),
            AuthMode::TokenPassthrough
        );
        assert!("password".parse::<AuthMode>().is_err());
    }

    #[tokio::test]
    async fn test_passthrough_opens_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer ambient-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "principal-1",
                "displayName": "Jane Doe",
                "mail": "jane@contoso.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/organization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "id": "tenant-1", "displayName": "Contoso" }]
            })))
            .mount(&server)
            .await;

        let env_name = "PIM_ACTIVATE_TEST_PASSTHROUGH_TOKEN";
        std::env::set_var(env_name, "ambient-token");
        let config = passthrough_config(&server.uri(), env_name);

        let authenticator = Authenticator::new(&config).unwrap();
        let mut console = ScriptedConsole::new(Vec::<&str>::new());
        let session = authenticator.connect(&mut console).await.unwrap();
        std::env::remove_var(env_name);

        assert_eq!(session.mode, AuthMode::TokenPassthrough);
        let (user, token) = session.into_parts();
        assert_eq!(user.principal_id, "principal-1");
        assert_eq!(user.tenant_name.as_deref(), Some("Contoso"));
        assert_eq!(token.as_str(), "ambient-token");
    }

    #[tokio::test]
    async fn test_passthrough_without_token_fails() {
        let config = passthrough_config("http://127.0.0.1:9", "PIM_ACTIVATE_TEST_UNSET_TOKEN");
        let authenticator = Authenticator::new(&config).unwrap();
        let mut console = ScriptedConsole::new(Vec::<&str>::new());

        let result = authenticator.connect(&mut console).await;
        assert!(matches!(result, Err(AuthError::TokenUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rejected_token_fails_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let env_name = "PIM_ACTIVATE_TEST_REJECTED_TOKEN";
        std::env::set_var(env_name, "stale-token");
        let config = passthrough_config(&server.uri(), env_name);

        let authenticator = Authenticator::new(&config).unwrap();
        let mut console = ScriptedConsole::new(Vec::<&str>::new());
        let result = authenticator.connect(&mut console).await;
        std::env::remove_var(env_name);

        assert!(matches!(result, Err(AuthError::Session(ApiError::Unauthorized))));
    }
}
