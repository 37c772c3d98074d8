//! PIM data models for Entra ID directory role activation.

use chrono::{DateTime, Utc};

use super::duration::ActivationDuration;

/// Directory scope used when Graph omits one.
pub const DEFAULT_DIRECTORY_SCOPE: &str = "/";

/// A directory role the principal is eligible to self-activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRole {
    /// Principal ID (user's Entra ID object ID).
    pub principal_id: String,

    /// Role definition ID (GUID or template ID).
    pub role_definition_id: String,

    /// Human-readable role name (e.g., "Global Reader").
    pub display_name: String,

    /// Directory scope of the eligibility, "/" for the whole tenant.
    pub directory_scope_id: String,
}

impl EligibleRole {
    /// Generates display text for the selection list.
    pub fn display_text(&self) -> String {
        if self.directory_scope_id == DEFAULT_DIRECTORY_SCOPE {
            self.display_name.clone()
        } else {
            format!("{} ({})", self.display_name, self.directory_scope_id)
        }
    }
}

/// A currently active role assignment instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAssignment {
    /// Assignment schedule instance ID.
    pub id: String,

    pub principal_id: String,

    pub role_definition_id: String,

    pub directory_scope_id: String,

    /// When the activation started. Permanent assignments carry none.
    pub start_date_time: Option<DateTime<Utc>>,

    /// When the activation expires. Permanent assignments carry none.
    pub end_date_time: Option<DateTime<Utc>>,
}

impl ActiveAssignment {
    /// "until <local time>" for time-bound assignments, "permanent" otherwise.
    pub fn describe_expiry(&self) -> String {
        match self.end_date_time {
            Some(end) => format!("until {}", format_local(end)),
            None => "permanent".to_string(),
        }
    }
}

/// A self-activation request, built once from the operator's answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub principal_id: String,
    pub role_definition_id: String,
    pub directory_scope_id: String,
    pub justification: String,
    pub start_date_time: DateTime<Utc>,
    pub duration: ActivationDuration,
}

impl ActivationRequest {
    /// Request to activate `role` starting at `now`.
    pub fn for_role(
        role: &EligibleRole,
        duration: ActivationDuration,
        justification: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            principal_id: role.principal_id.clone(),
            role_definition_id: role.role_definition_id.clone(),
            directory_scope_id: role.directory_scope_id.clone(),
            justification: justification.to_string(),
            start_date_time: now,
            duration,
        }
    }

    /// Start time plus the requested duration.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.start_date_time + self.duration.as_chrono()
    }
}

/// Accepted schedule request as returned by Graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationResponse {
    pub id: String,

    /// Request status, e.g. "Provisioned" or "PendingApproval".
    pub status: Option<String>,
}

/// Render a UTC timestamp in the operator's local time zone.
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn global_reader() -> EligibleRole {
        EligibleRole {
            principal_id: "user-1".into(),
            role_definition_id: "f2ef992c-3afb-46b9-b7cf-a126ee74c451".into(),
            display_name: "Global Reader".into(),
            directory_scope_id: "/".into(),
        }
    }

    #[test]
    fn test_display_text() {
        let mut role = global_reader();
        assert_eq!(role.display_text(), "Global Reader");

        role.directory_scope_id = "/administrativeUnits/au-1".into();
        assert_eq!(role.display_text(), "Global Reader (/administrativeUnits/au-1)");
    }

    #[test]
    fn test_request_for_role() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let duration = ActivationDuration::parse("1H30M").unwrap();
        let request = ActivationRequest::for_role(&global_reader(), duration, "incident response", now);

        assert_eq!(request.principal_id, "user-1");
        assert_eq!(request.directory_scope_id, "/");
        assert_eq!(request.justification, "incident response");
        assert_eq!(
            request.expires_at(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_describe_expiry() {
        let assignment = ActiveAssignment {
            id: "a-1".into(),
            principal_id: "user-1".into(),
            role_definition_id: "role-1".into(),
            directory_scope_id: "/".into(),
            start_date_time: None,
            end_date_time: None,
        };
        assert_eq!(assignment.describe_expiry(), "permanent");

        let end = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        let assignment = ActiveAssignment {
            end_date_time: Some(end),
            ..assignment
        };
        assert!(assignment.describe_expiry().starts_with("until 2024-"));
    }
}
