//! Error types for week-engine operations.

use thiserror::Error;

use crate::customization::CustomizationId;
use crate::day::Day;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid range: {start} is after {end}")]
    InvalidRange { start: Day, end: Day },

    #[error("Flexible check-in {date} lies outside {start}..{end}")]
    InvalidFlexibleDate { date: Day, start: Day, end: Day },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Customization not found: {0}")]
    CustomizationNotFound(CustomizationId),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error(
        "Overlap resolution failed after {applied} operation(s) (rolled back: {rolled_back}): {source}"
    )]
    OverlapResolutionPartialFailure {
        applied: usize,
        rolled_back: bool,
        #[source]
        source: Box<CalendarError>,
    },
}

pub type Result<T> = std::result::Result<T, CalendarError>;
