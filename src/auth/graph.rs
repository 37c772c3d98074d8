//! Microsoft Graph API client for fetching the signed-in principal and organization.

use crate::error::ApiError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Microsoft Graph API client.
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Create a new Graph client.
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the current user's profile.
    pub async fn get_user_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let url = format!("{}/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))
    }

    /// Fetch the user's organization info.
    pub async fn get_organization(&self, access_token: &str) -> Result<Organization, ApiError> {
        let url = format!("{}/organization", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let org_response: OrganizationResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        org_response
            .value
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ParseFailed("No organization found".to_string()))
    }
}

/// User profile from Microsoft Graph /me endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Directory object ID; the principal ID for PIM requests.
    pub id: String,

    /// User's display name.
    pub display_name: Option<String>,

    /// User's email address.
    pub mail: Option<String>,

    /// User Principal Name (typically email-like format).
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "No email".to_string())
    }
}

/// Organization response wrapper.
#[derive(Debug, Deserialize)]
struct OrganizationResponse {
    value: Vec<Organization>,
}

/// Organization info from Microsoft Graph /organization endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Tenant ID.
    pub id: String,

    /// Organization display name.
    pub display_name: Option<String>,
}

impl Organization {
    /// Get the organization name or tenant ID.
    pub fn name_or_id(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// The signed-in principal as shown on the console.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub principal_id: String,
    pub display_name: String,
    pub email: String,
    pub tenant_name: Option<String>,
}

impl UserInfo {
    /// Create UserInfo from profile and (optional) organization.
    pub fn from_profile_and_org(profile: UserProfile, org: Option<Organization>) -> Self {
        Self {
            display_name: profile.display_name_or_upn(),
            email: profile.email(),
            principal_id: profile.id,
            tenant_name: org.map(|o| o.name_or_id()),
        }
    }

    /// One-line description, e.g. "Jane Doe <jane@contoso.com> (Contoso)".
    pub fn describe(&self) -> String {
        match &self.tenant_name {
            Some(tenant) => format!("{} <{}> ({})", self.display_name, self.email, tenant),
            None => format!("{} <{}>", self.display_name, self.email),
        }
    }
}
