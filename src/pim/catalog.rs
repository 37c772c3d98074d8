//! The numbered list of roles offered to the operator.

use tracing::debug;

use super::client::PimApi;
use super::models::EligibleRole;
use crate::error::{ApiError, InputError};

/// Eligible roles in Graph order, addressed by 1-based index.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: Vec<EligibleRole>,
}

impl RoleCatalog {
    pub fn new(roles: Vec<EligibleRole>) -> Self {
        Self { roles }
    }

    /// Fetch the roles `principal_id` may activate.
    pub async fn load<A: PimApi + ?Sized>(api: &A, principal_id: &str) -> Result<Self, ApiError> {
        let roles = api.list_eligible_roles(principal_id).await?;
        debug!("Role catalog holds {} entries", roles.len());
        Ok(Self::new(roles))
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Role at 1-based `index`.
    pub fn get(&self, index: usize) -> Option<&EligibleRole> {
        index.checked_sub(1).and_then(|i| self.roles.get(i))
    }

    /// `(index, role)` pairs for display, numbered from 1.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &EligibleRole)> {
        self.roles.iter().enumerate().map(|(i, role)| (i + 1, role))
    }

    /// Resolve a typed selection. Only digits within `[1, len]` are accepted.
    pub fn select(&self, input: &str) -> Result<&EligibleRole, InputError> {
        let index = parse_selection(input, self.len())?;
        self.get(index).ok_or(InputError::OutOfRange { max: self.len() })
    }

    /// Resolve a pre-filled answer: a 1-based index or a role display name
    /// (case-insensitive exact match).
    pub fn resolve(&self, answer: &str) -> Result<&EligibleRole, InputError> {
        let answer = answer.trim();
        if answer.bytes().all(|b| b.is_ascii_digit()) {
            return self.select(answer);
        }

        self.roles
            .iter()
            .find(|role| role.display_name.eq_ignore_ascii_case(answer))
            .ok_or_else(|| InputError::UnknownRole(answer.to_string()))
    }
}

/// Validate a 1-based selection against `count` entries. Never clamps.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InputError::Empty);
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber(input.to_string()));
    }

    match input.parse::<usize>() {
        Ok(index) if (1..=count).contains(&index) => Ok(index),
        _ => Err(InputError::OutOfRange { max: count }),
    }
}
