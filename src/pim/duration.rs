//! Activation duration entered by the operator.
//!
//! Accepted input forms are `1H`, `30M`, `2H30M` (any case) and a bare
//! number of hours such as `2`. The Graph request carries the ISO-8601
//! form, e.g. `PT2H30M`.

use std::fmt;

use chrono::Duration;

use crate::error::InputError;

/// A positive activation duration with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationDuration {
    total_minutes: u32,
}

impl ActivationDuration {
    /// Build a duration from hours and minutes; minutes past 60 carry into hours.
    pub fn new(hours: u32, minutes: u32) -> Result<Self, InputError> {
        let total_minutes = hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .ok_or_else(|| InputError::InvalidDuration(format!("{}H{}M", hours, minutes)))?;

        if total_minutes == 0 {
            return Err(InputError::ZeroDuration);
        }

        Ok(Self { total_minutes })
    }

    /// Parse operator input.
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(InputError::Empty);
        }

        let invalid = || InputError::InvalidDuration(input.trim().to_string());

        // Bare number: hours
        if normalized.bytes().all(|b| b.is_ascii_digit()) {
            let hours = parse_number(&normalized).ok_or_else(invalid)?;
            return Self::new(hours, 0);
        }

        let mut rest = normalized.as_str();
        let mut hours = None;
        let mut minutes = None;

        if let Some((h, tail)) = rest.split_once('H') {
            hours = Some(parse_number(h).ok_or_else(invalid)?);
            rest = tail;
        }

        if !rest.is_empty() {
            let m = rest.strip_suffix('M').ok_or_else(invalid)?;
            minutes = Some(parse_number(m).ok_or_else(invalid)?);
        }

        if hours.is_none() && minutes.is_none() {
            return Err(invalid());
        }

        Self::new(hours.unwrap_or(0), minutes.unwrap_or(0))
    }

    pub fn hours(&self) -> u32 {
        self.total_minutes / 60
    }

    pub fn minutes(&self) -> u32 {
        self.total_minutes % 60
    }

    /// ISO-8601 duration token for the Graph schedule, e.g. `PT1H30M`.
    pub fn to_iso8601(&self) -> String {
        match (self.hours(), self.minutes()) {
            (0, m) => format!("PT{}M", m),
            (h, 0) => format!("PT{}H", h),
            (h, m) => format!("PT{}H{}M", h, m),
        }
    }

    pub fn as_chrono(&self) -> Duration {
        Duration::minutes(i64::from(self.total_minutes))
    }
}

impl fmt::Display for ActivationDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.as_chrono()))
    }
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Format duration as human-readable string (e.g., "45 min", "1 hour").
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();

    if total_minutes < 1 {
        "< 1 min".to_string()
    } else if total_minutes < 60 {
        format!("{} min", total_minutes)
    } else {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}
