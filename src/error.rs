//! Error types for the pim-activate application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Console error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth2 authorization failed: {0}")]
    OAuthFailed(String),

    #[error("Invalid authorization code")]
    InvalidAuthCode,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("State validation failed (possible CSRF attack)")]
    StateValidationFailed,

    #[error("OAuth callback timeout")]
    CallbackTimeout,

    #[error("OAuth callback server failed: {0}")]
    CallbackServer(String),

    #[error("No access token available: {0}")]
    TokenUnavailable(String),

    #[error("Azure CLI token request failed: {0}")]
    AzureCliFailed(String),

    #[error("Failed to open session: {0}")]
    Session(#[from] ApiError),
}

/// Microsoft Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    /// Carries the Graph `code: message` when the body has one.
    #[error("Forbidden (403): {0}")]
    Forbidden(String),

    #[error("Rate limited (429): Too many requests")]
    RateLimited,

    #[error("Graph API error (HTTP {status}) {code}: {message}")]
    Graph {
        status: u16,
        code: String,
        message: String,
    },
}

/// Outcome of a rejected activation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("Role is already active")]
    AlreadyActive,

    #[error("An activation request for this role is already pending")]
    Pending,

    #[error("Authentication context requirement not satisfied")]
    AcrsValidationFailed,

    #[error("Role activation failed: {0}")]
    Failed(String),
}

/// Operator input rejected by a prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("A value is required")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("Choose a number between 1 and {max}")]
    OutOfRange { max: usize },

    #[error("'{0}' is not a valid duration (use e.g. 1H, 30M or 2H30M)")]
    InvalidDuration(String),

    #[error("Duration must be greater than zero")]
    ZeroDuration,

    #[error("No eligible role named '{0}'")]
    UnknownRole(String),
}

/// Graph error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ApiError {
    /// Translate a non-success Graph response into an error, keeping the
    /// Graph error code and message when the body carries them.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("Graph request failed: HTTP {} - {}", status, body);

        let parsed = serde_json::from_str::<GraphErrorResponse>(&body).ok();

        match status.as_u16() {
            401 => Self::Unauthorized,
            403 => Self::Forbidden(match parsed {
                Some(parsed) => format!("{}: {}", parsed.error.code, parsed.error.message),
                None => "Insufficient permissions".to_string(),
            }),
            429 => Self::RateLimited,
            code => match parsed {
                Some(parsed) => Self::Graph {
                    status: code,
                    code: parsed.error.code,
                    message: parsed.error.message,
                },
                None => Self::GraphRequestFailed(format!("HTTP {}", status)),
            },
        }
    }
}

impl ActivationError {
    /// Classify an activation failure from its error text.
    ///
    /// This is the only place the Graph error substrings are interpreted.
    pub fn from_message(message: &str) -> Self {
        if message.contains("RoleAssignmentExists") {
            Self::AlreadyActive
        } else if message.contains("PendingRoleAssignmentRequest") {
            Self::Pending
        } else if message.contains("RoleAssignmentRequestAcrsValidationFailed") {
            Self::AcrsValidationFailed
        } else {
            Self::Failed(message.to_string())
        }
    }

    /// Returns a user-friendly message for display on the console.
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyActive => "This role is already active.".to_string(),
            Self::Pending => {
                "An activation request for this role is already pending. \
                 Wait for it to complete or cancel it first."
                    .to_string()
            }
            Self::AcrsValidationFailed => {
                "The role requires step-up authentication. Sign in again with the \
                 required authentication context (--acrs-context)."
                    .to_string()
            }
            Self::Failed(message) => format!("Activation failed: {}", message),
        }
    }
}

impl From<ApiError> for ActivationError {
    fn from(error: ApiError) -> Self {
        Self::from_message(&error.to_string())
    }
}

impl AuthError {
    /// Returns a user-friendly hint for display on the console.
    pub fn user_message(&self) -> &str {
        match self {
            Self::OAuthFailed(_) => "Sign-in failed. Please try again.",
            Self::StateValidationFailed => "Security error. Please try signing in again.",
            Self::CallbackTimeout => "Sign-in timed out. Please try again.",
            Self::CallbackServer(_) => "Could not receive the sign-in redirect. Is the port in use?",
            Self::TokenUnavailable(_) => "Provide a token or sign in with the Azure CLI (az login).",
            Self::AzureCliFailed(_) => "Run 'az login' or use interactive sign-in.",
            Self::Session(ApiError::Unauthorized) => "The access token was rejected.",
            Self::Session(_) => "Could not read the signed-in user from Microsoft Graph.",
            _ => "Authentication failed. Please try again.",
        }
    }
}

impl AppError {
    /// Returns a user-friendly message for display on the console.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Api(ApiError::Unauthorized) => "Session expired. Please sign in again.",
            Self::Api(ApiError::Forbidden(_)) => "Insufficient permissions to read PIM roles.",
            Self::Api(ApiError::RateLimited) => "Too many requests. Please wait a moment.",
            Self::Api(_) => "Could not read eligible roles from Microsoft Graph.",
            Self::Io(_) => "Console input was closed.",
        }
    }
}
