//! Microsoft Graph client for Entra ID PIM directory role management.
//!
//! Uses the `roleManagement/directory` endpoints of Graph v1.0.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::models::{
    ActivationRequest, ActivationResponse, ActiveAssignment, EligibleRole,
    DEFAULT_DIRECTORY_SCOPE,
};
use crate::auth::token::AccessToken;
use crate::config::ApiConfig;
use crate::error::{ActivationError, ApiError};

const ELIGIBILITY_SCHEDULES_PATH: &str = "/roleManagement/directory/roleEligibilitySchedules";
const ASSIGNMENT_INSTANCES_PATH: &str =
    "/roleManagement/directory/roleAssignmentScheduleInstances";
const SCHEDULE_REQUESTS_PATH: &str = "/roleManagement/directory/roleAssignmentScheduleRequests";

/// HTTP request timeout.
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// The PIM operations the activation flow needs.
#[async_trait]
pub trait PimApi: Send + Sync {
    /// Directory roles `principal_id` is eligible for, in Graph order.
    async fn list_eligible_roles(&self, principal_id: &str) -> Result<Vec<EligibleRole>, ApiError>;

    /// Active assignment instances of one role for one principal.
    async fn list_active_assignments(
        &self,
        principal_id: &str,
        role_definition_id: &str,
    ) -> Result<Vec<ActiveAssignment>, ApiError>;

    /// Submit a self-activation request. Sent once, never retried.
    async fn create_activation_request(
        &self,
        request: &ActivationRequest,
    ) -> Result<ActivationResponse, ActivationError>;

    /// Drop the session credentials. Later calls fail.
    fn disconnect(&mut self);
}

/// Graph PIM client bound to one access token.
pub struct PimClient {
    http_client: Client,
    base_url: String,
    token: AccessToken,
}

impl PimClient {
    /// Create a new PIM client.
    pub fn new(config: &ApiConfig, token: AccessToken) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::GraphRequestFailed("session is disconnected".to_string()));
        }
        Ok(request.bearer_auth(self.token.as_str()))
    }

    /// GET a Graph collection, following `@odata.nextLink` until exhausted.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.get(&url).query(query);
        let mut items = Vec::new();

        loop {
            let response = self
                .authorized(request)?
                .send()
                .await
                .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ApiError::from_response(response).await);
            }

            let page: ODataPage<T> = response
                .json()
                .await
                .map_err(|e| ApiError::ParseFailed(e.to_string()))?;
            items.extend(page.value);

            match page.next_link {
                Some(next) => {
                    debug!("Following nextLink for {}", path);
                    request = self.http_client.get(next);
                }
                None => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl PimApi for PimClient {
    async fn list_eligible_roles(&self, principal_id: &str) -> Result<Vec<EligibleRole>, ApiError> {
        let filter = format!("principalId eq {}", odata_quote(principal_id));
        debug!("Fetching eligible roles: $filter={}", filter);

        let schedules: Vec<EligibilitySchedule> = self
            .get_all(
                ELIGIBILITY_SCHEDULES_PATH,
                &[("$filter", filter.as_str()), ("$expand", "roleDefinition")],
            )
            .await?;

        let total = schedules.len();
        let roles: Vec<EligibleRole> = schedules
            .into_iter()
            .filter_map(EligibilitySchedule::into_role)
            .collect();

        if roles.len() < total {
            debug!("Skipped {} eligibilities without a role name", total - roles.len());
        }
        info!("Found {} eligible roles", roles.len());
        Ok(roles)
    }

    async fn list_active_assignments(
        &self,
        principal_id: &str,
        role_definition_id: &str,
    ) -> Result<Vec<ActiveAssignment>, ApiError> {
        let filter = format!(
            "principalId eq {} and roleDefinitionId eq {}",
            odata_quote(principal_id),
            odata_quote(role_definition_id)
        );
        debug!("Fetching active assignments: $filter={}", filter);

        let instances: Vec<AssignmentInstance> = self
            .get_all(ASSIGNMENT_INSTANCES_PATH, &[("$filter", filter.as_str())])
            .await?;

        Ok(instances.into_iter().map(ActiveAssignment::from).collect())
    }

    async fn create_activation_request(
        &self,
        request: &ActivationRequest,
    ) -> Result<ActivationResponse, ActivationError> {
        let url = format!("{}{}", self.base_url, SCHEDULE_REQUESTS_PATH);
        let body = ScheduleRequestBody::from(request);

        info!(
            "Activating role {} at scope {} for {}",
            request.role_definition_id,
            request.directory_scope_id,
            body.schedule_info.expiration.duration
        );

        let response = self
            .authorized(self.http_client.post(&url))?
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let err = ActivationError::from(ApiError::from_response(response).await);
            error!("Role activation rejected: {:?}", err);
            return Err(err);
        }

        let accepted: ScheduleRequestResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        info!(
            "Activation request {} accepted (status {:?})",
            accepted.id, accepted.status
        );

        Ok(ActivationResponse {
            id: accepted.id,
            status: accepted.status,
        })
    }

    fn disconnect(&mut self) {
        self.token = AccessToken::default();
        debug!("PIM session disconnected");
    }
}

/// Quote a value as an OData string literal.
fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// --- API Response Types ---

#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EligibilitySchedule {
    principal_id: String,
    role_definition_id: String,
    directory_scope_id: Option<String>,
    role_definition: Option<RoleDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleDefinition {
    display_name: Option<String>,
}

impl EligibilitySchedule {
    /// Roles without a display name cannot be offered for selection.
    fn into_role(self) -> Option<EligibleRole> {
        let display_name = self
            .role_definition
            .and_then(|d| d.display_name)
            .filter(|name| !name.trim().is_empty())?;

        Some(EligibleRole {
            principal_id: self.principal_id,
            role_definition_id: self.role_definition_id,
            display_name,
            directory_scope_id: self
                .directory_scope_id
                .unwrap_or_else(|| DEFAULT_DIRECTORY_SCOPE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentInstance {
    id: String,
    principal_id: String,
    role_definition_id: String,
    directory_scope_id: Option<String>,
    start_date_time: Option<DateTime<Utc>>,
    end_date_time: Option<DateTime<Utc>>,
}

impl From<AssignmentInstance> for ActiveAssignment {
    fn from(item: AssignmentInstance) -> Self {
        Self {
            id: item.id,
            principal_id: item.principal_id,
            role_definition_id: item.role_definition_id,
            directory_scope_id: item
                .directory_scope_id
                .unwrap_or_else(|| DEFAULT_DIRECTORY_SCOPE.to_string()),
            start_date_time: item.start_date_time,
            end_date_time: item.end_date_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleRequestResponse {
    id: String,
    status: Option<String>,
}

// --- Request Body Types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequestBody<'a> {
    action: &'static str,
    principal_id: &'a str,
    role_definition_id: &'a str,
    directory_scope_id: &'a str,
    justification: &'a str,
    schedule_info: ScheduleInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleInfo {
    start_date_time: String,
    expiration: Expiration,
}

#[derive(Debug, Serialize)]
struct Expiration {
    #[serde(rename = "type")]
    expiration_type: &'static str,
    duration: String,
}

impl<'a> From<&'a ActivationRequest> for ScheduleRequestBody<'a> {
    fn from(request: &'a ActivationRequest) -> Self {
        Self {
            action: "selfActivate",
            principal_id: &request.principal_id,
            role_definition_id: &request.role_definition_id,
            directory_scope_id: &request.directory_scope_id,
            justification: &request.justification,
            schedule_info: ScheduleInfo {
                start_date_time: request
                    .start_date_time
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                expiration: Expiration {
                    expiration_type: "afterDuration",
                    duration: request.duration.to_iso8601(),
                },
            },
        }
    }
}
