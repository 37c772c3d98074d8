//! OAuth2 client with PKCE support for Entra ID authentication.

use crate::auth::token::AccessToken;
use crate::config::Config;
use crate::error::AuthError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;
use zeroize::Zeroize;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PKCE code verifier and challenge pair.
#[derive(Debug)]
pub struct PkceChallenge {
    /// The code verifier (stored locally, sent in token exchange).
    pub verifier: String,
    /// The code challenge (SHA256 hash of verifier, sent in auth request).
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn new() -> Self {
        // Generate 32 random bytes for the verifier
        let mut rng = rand::thread_rng();
        let verifier_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
        let verifier = URL_SAFE_NO_PAD.encode(&verifier_bytes);

        // Create challenge = BASE64URL(SHA256(verifier))
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let hash = hasher.finalize();
        let challenge = URL_SAFE_NO_PAD.encode(hash);

        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth2 client for Entra ID authentication.
pub struct OAuth2Client {
    client_id: String,
    authorize_endpoint: Url,
    token_endpoint: String,
    redirect_uri: String,
    scopes: Vec<String>,
    acrs_context: Option<String>,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        let authorize_endpoint = Url::parse(&config.auth_url())
            .with_context(|| format!("Invalid authorize endpoint: {}", config.auth_url()))?;

        Ok(Self {
            client_id: config.oauth.client_id.clone(),
            authorize_endpoint,
            token_endpoint: config.token_url(),
            redirect_uri: config.oauth.redirect_uri.clone(),
            scopes: config.oauth.scopes.scopes.clone(),
            acrs_context: config.auth.acrs_context.clone(),
            http_client,
        })
    }

    /// Generate the authorization URL for browser-based sign-in.
    ///
    /// Returns the URL and a CSRF state token that must be verified in the callback.
    /// With an authentication context configured, the request demands it through
    /// the `claims` parameter and forces a fresh sign-in.
    pub fn generate_auth_url(&self, pkce: &PkceChallenge) -> (Url, String) {
        // Generate random state for CSRF protection
        let mut rng = rand::thread_rng();
        let state_bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
        let state = URL_SAFE_NO_PAD.encode(&state_bytes);

        let mut url = self.authorize_endpoint.clone();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_mode", "query")
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256");

            if let Some(context) = &self.acrs_context {
                query
                    .append_pair("claims", &acrs_claims(context))
                    .append_pair("prompt", "login");
            }
        }

        (url, state)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let scope = self.scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", pkce_verifier),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::TokenExchangeFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        Ok(token_response)
    }
}

/// Claims request asking Entra ID to satisfy an authentication context.
fn acrs_claims(context: &str) -> String {
    serde_json::json!({
        "access_token": {
            "acrs": {
                "essential": true,
                "value": context,
            }
        }
    })
    .to_string()
}

/// Token response from Entra ID.
#[derive(Debug, serde::Deserialize)]
pub struct TokenResponse {
    access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
}

impl TokenResponse {
    /// Move the access token out into its zeroizing wrapper.
    pub fn into_access_token(mut self) -> AccessToken {
        AccessToken::new(std::mem::take(&mut self.access_token))
    }
}

impl Drop for TokenResponse {
    fn drop(&mut self) {
        self.access_token.zeroize();
    }
}

/// Parse OAuth callback URL to extract code and state.
pub fn parse_callback_url(url_string: &str) -> Result<(String, String), AuthError> {
    let url = Url::parse(url_string).map_err(|_| AuthError::InvalidAuthCode)?;

    let params: HashMap<_, _> = url.query_pairs().collect();

    // Check for error response
    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(|s| s.to_string())
            .unwrap_or_else(|| error.to_string());
        return Err(AuthError::OAuthFailed(description));
    }

    let code = params
        .get("code")
        .ok_or(AuthError::InvalidAuthCode)?
        .to_string();

    let state = params
        .get("state")
        .ok_or(AuthError::StateValidationFailed)?
        .to_string();

    Ok((code, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(login_base_url: &str) -> Config {
        let mut config = Config::load(None).unwrap();
        config.oauth.client_id = "test-client".into();
        config.oauth.tenant = "test-tenant".into();
        config.oauth.redirect_uri = "http://localhost:28491/callback".into();
        config.api.login_base_url = login_base_url.into();
        config.auth.acrs_context = None;
        config
    }

    #[test]
    fn test_pkce_generation() {
        let pkce = PkceChallenge::new();

        // Verifier should be base64url encoded (43 chars for 32 bytes)
        assert_eq!(pkce.verifier.len(), 43);
        assert!(!pkce.challenge.is_empty());

        // Challenge should be different from verifier
        assert_ne!(pkce.verifier, pkce.challenge);
    }

    #[test]
    fn test_auth_url_contains_pkce_and_state() {
        let client = OAuth2Client::new(&test_config("https://login.microsoftonline.com")).unwrap();
        let pkce = PkceChallenge::new();
        let (url, state) = client.generate_auth_url(&pkce);

        assert!(url
            .as_str()
            .starts_with("https://login.microsoftonline.com/test-tenant/oauth2/v2.0/authorize"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "test-client");
        assert_eq!(params["state"], state);
        assert_eq!(params["code_challenge"], pkce.challenge);
        assert!(!params.contains_key("claims"));
    }

    #[test]
    fn test_auth_url_requests_acrs_context() {
        let mut config = test_config("https://login.microsoftonline.com");
        config.auth.acrs_context = Some("c1".into());
        let client = OAuth2Client::new(&config).unwrap();
        let (url, _) = client.generate_auth_url(&PkceChallenge::new());

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["prompt"], "login");
        let claims: serde_json::Value = serde_json::from_str(&params["claims"]).unwrap();
        assert_eq!(claims["access_token"]["acrs"]["value"], "c1");
        assert_eq!(claims["access_token"]["acrs"]["essential"], true);
    }

    #[test]
    fn test_parse_callback_success() {
        let url = "http://localhost:28491/callback?code=abc123&state=xyz789";
        let (code, state) = parse_callback_url(url).unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(state, "xyz789");
    }

    #[test]
    fn test_parse_callback_error() {
        let url = "http://localhost:28491/callback?error=access_denied&error_description=User%20cancelled";
        let result = parse_callback_url(url);
        assert!(matches!(result, Err(AuthError::OAuthFailed(d)) if d == "User cancelled"));
    }

    #[test]
    fn test_parse_callback_missing_code() {
        let url = "http://localhost:28491/callback?state=xyz789";
        let result = parse_callback_url(url);
        assert!(matches!(result, Err(AuthError::InvalidAuthCode)));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/test-tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier=verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "graph-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "User.Read"
            })))
            .mount(&server)
            .await;

        let client = OAuth2Client::new(&test_config(&server.uri())).unwrap();
        let response = client.exchange_code("code", "verifier").await.unwrap();
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.into_access_token().as_str(), "graph-token");
    }

    #[tokio::test]
    async fn test_exchange_code_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/test-tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_grant\"}"))
            .mount(&server)
            .await;

        let client = OAuth2Client::new(&test_config(&server.uri())).unwrap();
        let result = client.exchange_code("code", "verifier").await;
        assert!(matches!(result, Err(AuthError::TokenExchangeFailed(m)) if m == "HTTP 400"));
    }
}
