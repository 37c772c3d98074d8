//! Pre-flight check for an existing activation of the selected role.

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::pim::{ActiveAssignment, EligibleRole, PimApi};

#[derive(Debug)]
pub enum ConflictStatus {
    /// No active assignment of the role.
    Clear,
    /// The role is already active for the principal.
    Active(ActiveAssignment),
    /// The lookup failed. Activation proceeds; Graph rejects duplicates itself.
    Inconclusive(ApiError),
}

/// Look for an active assignment of `role` held by its principal.
pub async fn check_conflict<A: PimApi + ?Sized>(api: &A, role: &EligibleRole) -> ConflictStatus {
    match api
        .list_active_assignments(&role.principal_id, &role.role_definition_id)
        .await
    {
        Ok(assignments) => match assignments.into_iter().next() {
            Some(active) => {
                debug!(
                    "Found active assignment {} of {} at {} for {} (started {:?})",
                    active.id,
                    active.role_definition_id,
                    active.directory_scope_id,
                    active.principal_id,
                    active.start_date_time
                );
                ConflictStatus::Active(active)
            }
            None => ConflictStatus::Clear,
        },
        Err(e) => {
            warn!("Active assignment lookup failed for {}: {}", role.display_name, e);
            ConflictStatus::Inconclusive(e)
        }
    }
}
