//! Submits the activation request and reports the result.

use super::Outcome;
use crate::pim::models::format_local;
use crate::pim::{ActivationRequest, EligibleRole, PimApi};
use crate::terminal::{style, Console};

const PENDING_APPROVAL: &str = "PendingApproval";

pub async fn submit<A: PimApi + ?Sized, C: Console>(
    api: &A,
    console: &mut C,
    role: &EligibleRole,
    request: &ActivationRequest,
) -> Outcome {
    console.info(&format!(
        "Requesting activation of {} for {}...",
        role.display_name, request.duration
    ));

    match api.create_activation_request(request).await {
        Ok(response) => {
            let expires_at = request.expires_at();
            if response.status.as_deref() == Some(PENDING_APPROVAL) {
                console.warn(&format!(
                    "Requested {} for {} (pending approval)",
                    style::value(&role.display_name),
                    request.duration
                ));
                console.info("The role becomes active once an approver accepts the request.");
            } else {
                console.success(&format!(
                    "Activated {} until {}",
                    style::value(&role.display_name),
                    format_local(expires_at)
                ));
            }
            console.plain(&style::dim(format!("Request ID: {}", response.id)));
            Outcome::Activated {
                role: role.display_name.clone(),
                expires_at,
            }
        }
        Err(e) => {
            console.error(&e.user_message());
            Outcome::ActivationFailed(e)
        }
    }
}
