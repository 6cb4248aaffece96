//! Storage boundary for customizations.
//!
//! The engine never talks to a database directly; it goes through
//! [`CustomizationRepository`]. [`InMemoryRepository`] is the reference
//! implementation used by tests and by the command line front end.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;
use crate::customization::{CustomizationId, CustomizationPatch, NewCustomization, WeekCustomization};
use crate::day::{Day, DaySpan};
use crate::error::{CalendarError, Result};

/// Persistence operations the engine needs.
///
/// Implementations report transport failures as
/// [`CalendarError::RepositoryUnavailable`]; the engine never retries.
pub trait CustomizationRepository {
    /// Every stored customization whose span shares a day with `[from, to]`,
    /// regardless of status.
    fn list_customizations(&self, from: Day, to: Day) -> Result<Vec<WeekCustomization>>;

    fn get_customization(&self, id: CustomizationId) -> Result<Option<WeekCustomization>>;

    fn create_customization(&mut self, draft: NewCustomization) -> Result<WeekCustomization>;

    fn update_customization(
        &mut self,
        id: CustomizationId,
        patch: &CustomizationPatch,
    ) -> Result<WeekCustomization>;

    /// Hard delete. Returns `false` if no such record existed.
    fn delete_customization(&mut self, id: CustomizationId) -> Result<bool>;

    /// Reinsert a previously deleted record under its original id.
    fn restore_customization(&mut self, record: WeekCustomization) -> Result<()>;

    /// The stored cadence, if one has been saved.
    fn get_config(&self) -> Result<Option<CalendarConfig>>;
}

// ── InMemoryRepository ──────────────────────────────────────────────────────

/// Serializable contents of an [`InMemoryRepository`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    #[serde(default)]
    pub config: Option<CalendarConfig>,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub customizations: Vec<WeekCustomization>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: BTreeMap<CustomizationId, WeekCustomization>,
    next_id: u64,
    config: Option<CalendarConfig>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalendarConfig) -> Self {
        InMemoryRepository {
            config: Some(config),
            ..Self::default()
        }
    }

    pub fn set_config(&mut self, config: Option<CalendarConfig>) {
        self.config = config;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &WeekCustomization> {
        self.records.values()
    }

    pub fn snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot {
            config: self.config,
            next_id: self.next_id,
            customizations: self.records.values().cloned().collect(),
        }
    }

    /// Rebuild a repository from a snapshot. `next_id` is raised past every
    /// stored id so new records never collide.
    pub fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        let max_id = snapshot
            .customizations
            .iter()
            .map(|c| c.id.0 + 1)
            .max()
            .unwrap_or(0);
        InMemoryRepository {
            next_id: snapshot.next_id.max(max_id),
            config: snapshot.config,
            records: snapshot
                .customizations
                .into_iter()
                .map(|c| (c.id, c))
                .collect(),
        }
    }
}

impl CustomizationRepository for InMemoryRepository {
    fn list_customizations(&self, from: Day, to: Day) -> Result<Vec<WeekCustomization>> {
        if from > to {
            return Ok(Vec::new());
        }
        let window = DaySpan {
            start: from,
            end: to,
        };
        let mut found: Vec<WeekCustomization> = self
            .records
            .values()
            .filter(|c| c.span().overlaps(&window))
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.start_date, c.id));
        Ok(found)
    }

    fn get_customization(&self, id: CustomizationId) -> Result<Option<WeekCustomization>> {
        Ok(self.records.get(&id).cloned())
    }

    fn create_customization(&mut self, draft: NewCustomization) -> Result<WeekCustomization> {
        let draft = draft.validated()?;
        let id = CustomizationId(self.next_id);
        self.next_id += 1;
        let record = draft.into_record(id, Utc::now());
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn update_customization(
        &mut self,
        id: CustomizationId,
        patch: &CustomizationPatch,
    ) -> Result<WeekCustomization> {
        let current = self
            .records
            .get(&id)
            .ok_or(CalendarError::CustomizationNotFound(id))?;
        let next = patch.applied_to(current)?;
        self.records.insert(id, next.clone());
        Ok(next)
    }

    fn delete_customization(&mut self, id: CustomizationId) -> Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }

    fn restore_customization(&mut self, record: WeekCustomization) -> Result<()> {
        self.next_id = self.next_id.max(record.id.0 + 1);
        self.records.insert(record.id, record);
        Ok(())
    }

    fn get_config(&self) -> Result<Option<CalendarConfig>> {
        Ok(self.config)
    }
}
