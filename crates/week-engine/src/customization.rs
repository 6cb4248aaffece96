//! Persisted week overrides.
//!
//! A [`WeekCustomization`] replaces the standard week for its span. Records
//! are only ever written through the overlap resolver, which keeps every
//! stored span pairwise disjoint.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::day::{Day, DaySpan};
use crate::error::CalendarError;
use crate::week::WeekStatus;

/// Repository-assigned identifier of a customization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomizationId(pub u64);

impl fmt::Display for CustomizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCustomization {
    pub id: CustomizationId,
    pub start_date: Day,
    pub end_date: Day,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub status: WeekStatus,
    /// Always inside `[start_date, end_date]`, sorted, no duplicates.
    #[serde(default)]
    pub flexible_checkin_dates: Vec<Day>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl WeekCustomization {
    pub fn span(&self) -> DaySpan {
        DaySpan {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// A patch that, applied to this record after any edit, restores it.
    pub fn restoring_patch(&self) -> CustomizationPatch {
        CustomizationPatch {
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
            status: Some(self.status),
            name: Some(self.name.clone()),
            link: Some(self.link.clone()),
            flexible_checkin_dates: Some(self.flexible_checkin_dates.clone()),
        }
    }
}

// ── NewCustomization ────────────────────────────────────────────────────────

/// Fields of a customization that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomization {
    pub start_date: Day,
    pub end_date: Day,
    pub status: WeekStatus,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flexible_checkin_dates: Vec<Day>,
    pub created_by: String,
}

impl NewCustomization {
    pub fn new(span: DaySpan, status: WeekStatus, created_by: impl Into<String>) -> Self {
        NewCustomization {
            start_date: span.start,
            end_date: span.end,
            status,
            name: None,
            link: None,
            flexible_checkin_dates: Vec::new(),
            created_by: created_by.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_flexible_dates(mut self, dates: Vec<Day>) -> Self {
        self.flexible_checkin_dates = dates;
        self
    }

    pub fn span(&self) -> DaySpan {
        DaySpan {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Check the interval and flexible dates, returning the draft with its
    /// flexible dates sorted and deduplicated.
    ///
    /// # Errors
    ///
    /// [`CalendarError::InvalidRange`] if the end precedes the start,
    /// [`CalendarError::InvalidFlexibleDate`] if a flexible date falls outside
    /// the interval.
    pub fn validated(mut self) -> Result<Self, CalendarError> {
        let span = DaySpan::new(self.start_date, self.end_date)?;
        self.flexible_checkin_dates = checked_flexible_dates(&span, self.flexible_checkin_dates)?;
        Ok(self)
    }

    /// Materialize the draft as a stored record.
    pub fn into_record(self, id: CustomizationId, created_at: DateTime<Utc>) -> WeekCustomization {
        WeekCustomization {
            id,
            start_date: self.start_date,
            end_date: self.end_date,
            name: self.name,
            link: self.link,
            status: self.status,
            flexible_checkin_dates: self.flexible_checkin_dates,
            created_by: self.created_by,
            created_at,
        }
    }
}

fn checked_flexible_dates(span: &DaySpan, mut dates: Vec<Day>) -> Result<Vec<Day>, CalendarError> {
    if let Some(date) = dates.iter().find(|d| !span.contains(**d)) {
        return Err(CalendarError::InvalidFlexibleDate {
            date: *date,
            start: span.start,
            end: span.end,
        });
    }
    dates.sort_unstable();
    dates.dedup();
    Ok(dates)
}

// ── CustomizationPatch ──────────────────────────────────────────────────────

/// Partial update of a stored customization. `None` leaves a field alone;
/// for `name` and `link`, `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Day>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Day>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WeekStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub name: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub link: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flexible_checkin_dates: Option<Vec<Day>>,
}

/// A field that is present deserializes to `Some`, even when it is `null`.
/// Absent fields fall back to `None` through `#[serde(default)]`.
fn present_or_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl CustomizationPatch {
    /// A patch replacing every editable field with the draft's values.
    pub fn from_draft(draft: &NewCustomization) -> Self {
        CustomizationPatch {
            start_date: Some(draft.start_date),
            end_date: Some(draft.end_date),
            status: Some(draft.status),
            name: Some(draft.name.clone()),
            link: Some(draft.link.clone()),
            flexible_checkin_dates: Some(draft.flexible_checkin_dates.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CustomizationPatch::default()
    }

    /// Apply the patch to a copy of `record`, validating the result.
    ///
    /// # Errors
    ///
    /// Same as [`NewCustomization::validated`], evaluated on the patched record.
    pub fn applied_to(&self, record: &WeekCustomization) -> Result<WeekCustomization, CalendarError> {
        let mut next = record.clone();
        if let Some(start) = self.start_date {
            next.start_date = start;
        }
        if let Some(end) = self.end_date {
            next.end_date = end;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(link) = &self.link {
            next.link = link.clone();
        }
        if let Some(dates) = &self.flexible_checkin_dates {
            next.flexible_checkin_dates = dates.clone();
        }
        let span = DaySpan::new(next.start_date, next.end_date)?;
        next.flexible_checkin_dates =
            checked_flexible_dates(&span, std::mem::take(&mut next.flexible_checkin_dates))?;
        Ok(next)
    }
}
