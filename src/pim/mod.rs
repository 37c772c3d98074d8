//! Entra ID Privileged Identity Management (PIM) integration.
//!
//! This module provides functionality for:
//! - Listing the directory roles a principal is eligible for
//! - Looking up active assignments of a role
//! - Submitting self-activation requests

pub mod catalog;
pub mod client;
pub mod duration;
pub mod models;

pub use catalog::RoleCatalog;
pub use client::{PimApi, PimClient};
pub use duration::ActivationDuration;
pub use models::{ActivationRequest, ActivationResponse, ActiveAssignment, EligibleRole};
