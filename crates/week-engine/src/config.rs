//! Calendar cadence and selection policy.
//!
//! Both are plain values handed to the components that need them; nothing
//! here is global. [`EngineSettings`] bundles them for loading from JSON.

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::day::{parse_timezone, Day, DaySpan};
use crate::error::CalendarError;

// ── CalendarConfig ──────────────────────────────────────────────────────────

/// The recurring weekly cadence. Weekdays are 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub check_in_weekday: u8,
    pub check_out_weekday: u8,
}

impl Default for CalendarConfig {
    /// Sunday to Saturday.
    fn default() -> Self {
        CalendarConfig {
            check_in_weekday: 0,
            check_out_weekday: 6,
        }
    }
}

impl CalendarConfig {
    pub fn new(check_in_weekday: u8, check_out_weekday: u8) -> Self {
        CalendarConfig {
            check_in_weekday,
            check_out_weekday,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.check_in_weekday <= 6 && self.check_out_weekday <= 6
    }

    /// This config if both weekdays are in range, otherwise the default cadence.
    pub fn sanitized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            warn!(
                check_in = self.check_in_weekday,
                check_out = self.check_out_weekday,
                "malformed calendar config, using default cadence"
            );
            CalendarConfig::default()
        }
    }

    /// Resolve an optional stored config, falling back to the default cadence.
    pub fn or_default(stored: Option<CalendarConfig>) -> Self {
        match stored {
            Some(config) => config.sanitized(),
            None => {
                warn!("no calendar config stored, using default cadence");
                CalendarConfig::default()
            }
        }
    }
}

// ── SelectionPolicy ─────────────────────────────────────────────────────────

/// Month/day at which the booking season closes for non-admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonClose {
    pub month: u32,
    pub day: u32,
}

impl SeasonClose {
    /// The closing day in `year`, or `None` if month/day do not form a date.
    pub fn in_year(&self, year: i32) -> Option<Day> {
        Day::from_ymd(year, self.month, self.day).ok()
    }
}

/// A date range during which non-admins may not book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub start: Day,
    pub end: Day,
    #[serde(default)]
    pub name: Option<String>,
}

impl Blackout {
    pub fn span(&self) -> DaySpan {
        DaySpan {
            start: self.start.min(self.end),
            end: self.end.max(self.start),
        }
    }
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_cutoff_hour() -> u32 {
    8
}

fn default_season_close() -> Option<SeasonClose> {
    Some(SeasonClose { month: 11, day: 1 })
}

fn default_always_eligible_months() -> Vec<u32> {
    vec![5, 6]
}

fn default_max_selection_weeks() -> usize {
    12
}

/// Business rules consulted by the selectability evaluator and reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Timezone in which "today" and the cutoff hour are observed.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Before this local hour, weeks starting today may still be booked.
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,

    /// Weeks starting on or after this day of the current year are closed.
    #[serde(default = "default_season_close")]
    pub season_close: Option<SeasonClose>,

    /// Arrival weeks starting in these months ignore their visibility status.
    #[serde(default = "default_always_eligible_months")]
    pub always_eligible_months: Vec<u32>,

    #[serde(default = "default_max_selection_weeks")]
    pub max_selection_weeks: usize,

    #[serde(default)]
    pub blackouts: Vec<Blackout>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy {
            timezone: default_timezone(),
            cutoff_hour: default_cutoff_hour(),
            season_close: default_season_close(),
            always_eligible_months: default_always_eligible_months(),
            max_selection_weeks: default_max_selection_weeks(),
            blackouts: Vec::new(),
        }
    }
}

impl SelectionPolicy {
    /// This policy observed in the named IANA timezone.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidTimezone`] for an unknown name.
    pub fn in_timezone(self, name: &str) -> Result<Self, CalendarError> {
        Ok(SelectionPolicy {
            timezone: parse_timezone(name)?,
            ..self
        })
    }

    /// True if any blackout range shares a day with `span`.
    pub fn blackout_overlaps(&self, span: &DaySpan) -> bool {
        self.blackouts.iter().any(|b| b.span().overlaps(span))
    }
}

// ── EngineSettings ──────────────────────────────────────────────────────────

/// Everything configurable about an engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Cadence used when the repository has none stored.
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,

    #[serde(default)]
    pub policy: SelectionPolicy,
}

impl EngineSettings {
    /// Parse settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidConfig`] if the JSON is malformed or
    /// names an unknown timezone.
    pub fn from_json_str(json: &str) -> Result<Self, CalendarError> {
        serde_json::from_str(json).map_err(|e| CalendarError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a JSON settings file.
    pub fn from_path(path: &Path) -> Result<Self, CalendarError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::InvalidConfig(format!("'{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
