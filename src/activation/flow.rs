//! The activation run: catalog, prompts, conflict check, submission, wind-down.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::conflict::{check_conflict, ConflictStatus};
use super::submit::submit;
use super::Outcome;
use crate::auth::graph::UserInfo;
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::pim::{ActivationRequest, PimApi, RoleCatalog};
use crate::prompt::{Answers, Prompter};
use crate::terminal::{style, Console};

/// How the session ends once the outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindDown {
    pub countdown_seconds: u64,
    pub pause_before_exit: bool,
}

impl From<&SessionConfig> for WindDown {
    fn from(config: &SessionConfig) -> Self {
        Self {
            countdown_seconds: config.countdown_seconds,
            pause_before_exit: config.pause_before_exit,
        }
    }
}

/// One activation attempt over an open PIM session.
pub struct Flow<'c, A: PimApi, C: Console> {
    api: A,
    console: &'c mut C,
    wind_down: WindDown,
}

impl<'c, A: PimApi, C: Console> Flow<'c, A, C> {
    pub fn new(api: A, console: &'c mut C, wind_down: WindDown) -> Self {
        Self {
            api,
            console,
            wind_down,
        }
    }

    /// Run to completion. The session is disconnected on every path.
    pub async fn run(mut self, user: &UserInfo, answers: &Answers) -> Outcome {
        let outcome = match self.activate(user, answers).await {
            Ok(outcome) => outcome,
            Err(AppError::Io(e)) => {
                error!("Console input failed: {}", e);
                self.console.error("Console input was closed before the activation was submitted.");
                Outcome::ConsoleFailed
            }
            Err(e) => {
                error!("Failed to list eligible roles: {}", e);
                self.console.error(&format!("{} ({})", e.user_message(), e));
                Outcome::CatalogUnavailable
            }
        };

        match outcome {
            Outcome::NoEligibleRoles | Outcome::ConsoleFailed => self.api.disconnect(),
            _ => self.wind_down().await,
        }

        info!("Run finished: {:?}", outcome);
        outcome
    }

    async fn activate(&mut self, user: &UserInfo, answers: &Answers) -> Result<Outcome, AppError> {
        let catalog = RoleCatalog::load(&self.api, &user.principal_id).await?;
        if catalog.is_empty() {
            self.console
                .warn(&format!("No eligible roles found for {}.", user.display_name));
            return Ok(Outcome::NoEligibleRoles);
        }

        let mut prompter = Prompter::new(&mut *self.console);
        let role = prompter.select_role(&catalog, answers.role.as_deref())?;
        let duration = prompter.duration(answers.duration.as_deref())?;
        let justification = prompter.justification(answers.justification.as_deref())?;

        match check_conflict(&self.api, role).await {
            ConflictStatus::Clear => debug!("No active assignment of {}", role.display_name),
            ConflictStatus::Active(active) => {
                self.console.error(&format!(
                    "{} is already active ({}). Nothing to activate.",
                    role.display_name,
                    active.describe_expiry()
                ));
                return Ok(Outcome::ConflictDetected);
            }
            ConflictStatus::Inconclusive(e) => {
                warn!("Proceeding without a conflict check: {}", e);
                self.console.warn(&format!(
                    "Could not check for an existing activation ({}). Continuing.",
                    e
                ));
            }
        }

        let request = ActivationRequest::for_role(role, duration, &justification, Utc::now());
        Ok(submit(&self.api, &mut *self.console, role, &request).await)
    }

    /// Count down, disconnect, then optionally wait for a key.
    async fn wind_down(&mut self) {
        for remaining in (1..=self.wind_down.countdown_seconds).rev() {
            self.console
                .plain(&style::dim(format!("Disconnecting in {}...", remaining)));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        self.api.disconnect();
        self.console.info("Disconnected.");

        if self.wind_down.pause_before_exit {
            if let Err(e) = self.console.wait_for_key("Press any key to exit...") {
                debug!("Skipping exit pause: {}", e);
            }
        }
    }
}
