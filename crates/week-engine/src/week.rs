//! Generated week intervals.
//!
//! A [`Week`] is transient: the timeline compositor builds a fresh set on
//! every read and nothing ever persists one directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::customization::{CustomizationId, WeekCustomization};
use crate::day::{Day, DaySpan};

/// Visibility of a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStatus {
    /// A standard week nobody has customized.
    #[default]
    Default,
    Visible,
    Hidden,
    Deleted,
}

impl WeekStatus {
    /// Whether members may pick this week as an arrival on status alone.
    pub fn is_bookable(self) -> bool {
        matches!(self, WeekStatus::Default | WeekStatus::Visible)
    }
}

/// Identity of a week.
///
/// Standard weeks are identified by their interval; `occurrence` only
/// becomes non-zero when two weeks share a start day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WeekId {
    Standard {
        start: Day,
        end: Day,
        occurrence: u32,
    },
    Custom {
        id: CustomizationId,
    },
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekId::Standard {
                start,
                end,
                occurrence: 0,
            } => write!(f, "week-{start}-{end}"),
            WeekId::Standard {
                start,
                end,
                occurrence,
            } => write!(f, "week-{start}-{end}-{occurrence}"),
            WeekId::Custom { id } => write!(f, "custom-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub id: WeekId,
    pub start_date: Day,
    pub end_date: Day,
    pub status: WeekStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub is_custom: bool,
    pub is_partial_week: bool,
    pub is_edge_week: bool,
    #[serde(default)]
    pub flexible_checkin_dates: Vec<Day>,
}

impl Week {
    /// A standard week over `span`.
    pub fn standard(span: DaySpan, is_partial_week: bool) -> Self {
        Week {
            id: WeekId::Standard {
                start: span.start,
                end: span.end,
                occurrence: 0,
            },
            start_date: span.start,
            end_date: span.end,
            status: WeekStatus::Default,
            name: None,
            link: None,
            is_custom: false,
            is_partial_week,
            is_edge_week: false,
            flexible_checkin_dates: Vec::new(),
        }
    }

    pub fn span(&self) -> DaySpan {
        DaySpan {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Number of days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        self.span().len_days()
    }

    /// Whether two weeks denote the same interval in a selection.
    pub fn same_slot(&self, other: &Week) -> bool {
        self.start_date == other.start_date && self.end_date == other.end_date
    }
}

impl From<&WeekCustomization> for Week {
    fn from(custom: &WeekCustomization) -> Self {
        Week {
            id: WeekId::Custom { id: custom.id },
            start_date: custom.start_date,
            end_date: custom.end_date,
            status: custom.status,
            name: custom.name.clone(),
            link: custom.link.clone(),
            is_custom: true,
            is_partial_week: false,
            is_edge_week: false,
            flexible_checkin_dates: custom.flexible_checkin_dates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: &str, end: &str) -> DaySpan {
        DaySpan::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_standard_week_id_derives_from_interval() {
        let a = Week::standard(span("2025-01-05", "2025-01-11"), false);
        let b = Week::standard(span("2025-01-05", "2025-01-11"), false);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.to_string(), "week-2025-01-05-2025-01-11");
        assert_eq!(a.len_days(), 7);
    }

    #[test]
    fn test_duplicate_occurrence_changes_id_text() {
        let id = WeekId::Standard {
            start: "2025-01-05".parse().unwrap(),
            end: "2025-01-11".parse().unwrap(),
            occurrence: 1,
        };
        assert_eq!(id.to_string(), "week-2025-01-05-2025-01-11-1");
    }

    #[test]
    fn test_bookable_statuses() {
        assert!(WeekStatus::Default.is_bookable());
        assert!(WeekStatus::Visible.is_bookable());
        assert!(!WeekStatus::Hidden.is_bookable());
        assert!(!WeekStatus::Deleted.is_bookable());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&WeekStatus::Hidden).unwrap(), "\"hidden\"");
    }
}
