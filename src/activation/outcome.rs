//! How a run ended, and the exit code reported for it.

use std::process::ExitCode;

use chrono::{DateTime, Utc};

use crate::error::ActivationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The role was activated until `expires_at`.
    Activated {
        role: String,
        expires_at: DateTime<Utc>,
    },
    NoEligibleRoles,
    AuthFailed,
    /// An active assignment already exists; nothing was submitted.
    ConflictDetected,
    ActivationFailed(ActivationError),
    CatalogUnavailable,
    ConsoleFailed,
    ConfigInvalid,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Activated { .. } => 0,
            Self::ConfigInvalid => 1,
            Self::AuthFailed => 2,
            Self::NoEligibleRoles => 3,
            Self::ConflictDetected => 4,
            Self::ActivationFailed(ActivationError::AlreadyActive) => 5,
            Self::ActivationFailed(ActivationError::Pending) => 6,
            Self::ActivationFailed(ActivationError::AcrsValidationFailed) => 7,
            Self::ActivationFailed(ActivationError::Failed(_)) => 8,
            Self::CatalogUnavailable => 9,
            Self::ConsoleFailed => 10,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}
