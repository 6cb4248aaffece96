//! [`WeekEngine`]: the read, write and selection paths over one repository.

use std::cell::OnceCell;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{CalendarConfig, EngineSettings};
use crate::customization::CustomizationId;
use crate::day::{Day, DaySpan};
use crate::error::{CalendarError, Result};
use crate::generator::cycle_origin;
use crate::overlap::{apply_operations, plan_resolution, Operation, ResolutionReport, ResolutionTarget};
use crate::repository::CustomizationRepository;
use crate::selectable::{self, Actor};
use crate::selection::{reduce, SelectionContext, SelectionOutcome};
use crate::timeline::compose;
use crate::week::Week;

/// Days of timeline loaded on each side of a selection so the reducer can
/// see the weeks around it.
const SELECTION_MARGIN_DAYS: i64 = 14;

/// Entry point for callers (pricing, UI, the CLI).
///
/// The calendar cadence is read from the repository on first use and cached.
/// Call [`WeekEngine::refresh_config`] after the stored cadence changes.
///
/// # Examples
///
/// ```
/// use week_engine::{Day, EngineSettings, InMemoryRepository, WeekEngine};
///
/// let engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
/// let from: Day = "2025-01-01".parse().unwrap();
/// let to: Day = "2025-01-21".parse().unwrap();
/// let weeks = engine.get_weeks(from, to, false).unwrap();
/// assert_eq!(weeks.len(), 3);
/// ```
#[derive(Debug)]
pub struct WeekEngine<R> {
    repo: R,
    settings: EngineSettings,
    config: OnceCell<CalendarConfig>,
}

impl<R: CustomizationRepository> WeekEngine<R> {
    pub fn new(repo: R, settings: EngineSettings) -> Self {
        WeekEngine {
            repo,
            settings,
            config: OnceCell::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Direct access to the store. Call [`WeekEngine::refresh_config`]
    /// after changing the stored cadence through it.
    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The cadence in effect.
    ///
    /// The stored config wins, then `settings.calendar`, then the default
    /// Sunday to Saturday cadence (with a warning).
    ///
    /// # Errors
    ///
    /// Propagates repository failures untouched.
    pub fn calendar_config(&self) -> Result<CalendarConfig> {
        if let Some(config) = self.config.get() {
            return Ok(*config);
        }
        let stored = self.repo.get_config()?.or(self.settings.calendar);
        let config = CalendarConfig::or_default(stored).sanitized();
        Ok(*self.config.get_or_init(|| config))
    }

    /// Drop the cached cadence so the next call re-reads it.
    pub fn refresh_config(&mut self) {
        self.config = OnceCell::new();
    }

    /// The week timeline for `[from, to]`.
    ///
    /// An inverted range yields an empty list.
    ///
    /// # Errors
    ///
    /// Propagates repository failures untouched.
    pub fn get_weeks(&self, from: Day, to: Day, include_deleted: bool) -> Result<Vec<Week>> {
        if from > to {
            return Ok(Vec::new());
        }
        let config = self.calendar_config()?;
        let customizations = self
            .repo
            .list_customizations(cycle_origin(from, &config), to)?;
        Ok(compose(from, to, &config, &customizations, include_deleted))
    }

    /// See [`selectable::is_selectable`]; the policy comes from the settings.
    pub fn is_selectable(
        &self,
        week: &Week,
        actor: Actor,
        selection: &[Week],
        now: &DateTime<Utc>,
    ) -> bool {
        selectable::is_selectable(week, actor, selection, now, &self.settings.policy)
    }

    /// Apply a click on `week` to `selection`.
    ///
    /// Loads the timeline around the selection and the clicked week, then
    /// runs [`reduce`]. Never fails: if the timeline cannot be read the click
    /// is refused.
    pub fn apply_selection(
        &self,
        week: &Week,
        selection: &[Week],
        actor: Actor,
        now: &DateTime<Utc>,
    ) -> SelectionOutcome {
        let start = selection
            .iter()
            .map(|w| w.start_date)
            .fold(week.start_date, Day::min);
        let end = selection
            .iter()
            .map(|w| w.end_date)
            .fold(week.end_date, Day::max);

        let timeline = match self.get_weeks(
            start.add_days(-SELECTION_MARGIN_DAYS),
            end.add_days(SELECTION_MARGIN_DAYS),
            false,
        ) {
            Ok(weeks) => weeks,
            Err(err) => {
                warn!(error = %err, "timeline unavailable, refusing selection");
                return SelectionOutcome::Refused;
            }
        };

        let ctx = SelectionContext {
            timeline: &timeline,
            policy: &self.settings.policy,
            now: *now,
        };
        reduce(week, selection, actor, &ctx)
    }

    /// Plan the writes for `target` without applying them.
    ///
    /// # Errors
    ///
    /// - [`CalendarError::InvalidRange`] / [`CalendarError::InvalidFlexibleDate`]
    ///   for an invalid draft.
    /// - [`CalendarError::CustomizationNotFound`] when editing a missing record.
    /// - Repository failures, untouched.
    pub fn plan_overlap(&self, target: &ResolutionTarget) -> Result<Vec<Operation>> {
        let draft = target.draft();
        let span = DaySpan::new(draft.start_date, draft.end_date)?;
        if let Some(id) = target.edited_id() {
            if self.repo.get_customization(id)?.is_none() {
                return Err(CalendarError::CustomizationNotFound(id));
            }
        }
        let existing = self.repo.list_customizations(span.start, span.end)?;
        let ops = plan_resolution(target, &existing)?;
        debug!(target = %span, operations = ops.len(), "planned overlap resolution");
        Ok(ops)
    }

    /// Plan and apply `target` as one unit of work.
    ///
    /// # Errors
    ///
    /// Everything [`WeekEngine::plan_overlap`] returns, plus
    /// [`CalendarError::OverlapResolutionPartialFailure`] when a write fails
    /// after earlier ones succeeded.
    pub fn resolve_overlap(&mut self, target: &ResolutionTarget) -> Result<ResolutionReport> {
        let ops = self.plan_overlap(target)?;
        let report = apply_operations(&mut self.repo, ops)?;
        info!(
            operations = report.operations.len(),
            target = ?report.target.as_ref().map(|t| t.id),
            "overlap resolved"
        );
        Ok(report)
    }

    /// Hard-delete a customization. Returns `false` if it did not exist.
    pub fn delete_customization(&mut self, id: CustomizationId) -> Result<bool> {
        let removed = self.repo.delete_customization(id)?;
        if removed {
            info!(%id, "customization deleted");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customization::{NewCustomization, WeekCustomization};
    use crate::repository::InMemoryRepository;
    use crate::week::WeekStatus;
    use chrono::TimeZone;

    fn day(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn span(start: &str, end: &str) -> DaySpan {
        DaySpan::new(day(start), day(end)).unwrap()
    }

    fn new_target(start: &str, end: &str) -> ResolutionTarget {
        ResolutionTarget::New {
            draft: NewCustomization::new(span(start, end), WeekStatus::Visible, "admin"),
        }
    }

    /// Repository whose reads fail, for error propagation tests.
    struct Offline;

    impl CustomizationRepository for Offline {
        fn list_customizations(&self, _: Day, _: Day) -> Result<Vec<WeekCustomization>> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn get_customization(&self, _: CustomizationId) -> Result<Option<WeekCustomization>> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn create_customization(&mut self, _: NewCustomization) -> Result<WeekCustomization> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn update_customization(
            &mut self,
            _: CustomizationId,
            _: &crate::customization::CustomizationPatch,
        ) -> Result<WeekCustomization> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn delete_customization(&mut self, _: CustomizationId) -> Result<bool> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn restore_customization(&mut self, _: WeekCustomization) -> Result<()> {
            Err(CalendarError::RepositoryUnavailable("offline".into()))
        }
        fn get_config(&self) -> Result<Option<CalendarConfig>> {
            Ok(None)
        }
    }

    #[test]
    fn test_config_precedence() {
        let settings = EngineSettings {
            calendar: Some(CalendarConfig::new(6, 5)),
            ..EngineSettings::default()
        };
        let engine = WeekEngine::new(InMemoryRepository::new(), settings.clone());
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::new(6, 5));

        let stored = InMemoryRepository::with_config(CalendarConfig::new(1, 0));
        let engine = WeekEngine::new(stored, settings);
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::new(1, 0));

        let engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::default());
    }

    #[test]
    fn test_refresh_config_rereads_repository() {
        let mut engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::default());

        engine
            .repository_mut()
            .set_config(Some(CalendarConfig::new(6, 5)));
        // Still cached.
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::default());

        engine.refresh_config();
        assert_eq!(engine.calendar_config().unwrap(), CalendarConfig::new(6, 5));
    }

    #[test]
    fn test_get_weeks_inverted_range_is_empty() {
        let engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        assert!(engine
            .get_weeks(day("2025-02-01"), day("2025-01-01"), false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resolve_overlap_then_read() {
        let mut engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        engine
            .resolve_overlap(&new_target("2025-03-10", "2025-03-16"))
            .unwrap();
        let report = engine
            .resolve_overlap(&new_target("2025-03-08", "2025-03-20"))
            .unwrap();
        assert_eq!(report.operations.len(), 2);
        assert_eq!(engine.repository().len(), 1);

        let weeks = engine
            .get_weeks(day("2025-03-01"), day("2025-03-31"), false)
            .unwrap();
        let custom: Vec<_> = weeks.iter().filter(|w| w.is_custom).collect();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].span(), span("2025-03-08", "2025-03-20"));
    }

    #[test]
    fn test_get_weeks_sees_customization_ending_before_range() {
        let mut engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        engine
            .resolve_overlap(&new_target("2025-03-08", "2025-03-20"))
            .unwrap();
        let weeks = engine
            .get_weeks(day("2025-03-21"), day("2025-04-03"), false)
            .unwrap();
        let spans: Vec<DaySpan> = weeks.iter().map(|w| w.span()).collect();
        assert_eq!(
            spans,
            vec![
                span("2025-03-21", "2025-03-22"),
                span("2025-03-23", "2025-03-29"),
                span("2025-03-30", "2025-04-03"),
            ]
        );
    }

    #[test]
    fn test_edit_of_missing_record_rejected() {
        let engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        let target = ResolutionTarget::Edit {
            id: CustomizationId(9),
            draft: NewCustomization::new(
                span("2025-03-10", "2025-03-16"),
                WeekStatus::Hidden,
                "admin",
            ),
        };
        let err = engine.plan_overlap(&target).unwrap_err();
        assert!(matches!(err, CalendarError::CustomizationNotFound(CustomizationId(9))));
    }

    #[test]
    fn test_delete_customization() {
        let mut engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        let report = engine
            .resolve_overlap(&new_target("2025-03-10", "2025-03-16"))
            .unwrap();
        let id = report.target.unwrap().id;
        assert!(engine.delete_customization(id).unwrap());
        assert!(!engine.delete_customization(id).unwrap());
    }

    #[test]
    fn test_repository_failure_propagates_on_reads() {
        let engine = WeekEngine::new(Offline, EngineSettings::default());
        let err = engine
            .get_weeks(day("2025-01-01"), day("2025-01-31"), false)
            .unwrap_err();
        assert!(matches!(err, CalendarError::RepositoryUnavailable(_)));
    }

    #[test]
    fn test_selection_cannot_bridge_a_withdrawn_week() {
        let mut engine = WeekEngine::new(InMemoryRepository::new(), EngineSettings::default());
        engine
            .resolve_overlap(&ResolutionTarget::New {
                draft: NewCustomization::new(
                    span("2025-06-08", "2025-06-14"),
                    WeekStatus::Deleted,
                    "admin",
                ),
            })
            .unwrap();
        let weeks = engine
            .get_weeks(day("2025-06-01"), day("2025-06-21"), false)
            .unwrap();
        assert_eq!(weeks.len(), 2);

        let now = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();
        let out = engine.apply_selection(&weeks[1], &weeks[..1], Actor::Member, &now);
        assert_eq!(out, SelectionOutcome::Refused);
    }

    #[test]
    fn test_selection_refused_when_timeline_unavailable() {
        let engine = WeekEngine::new(Offline, EngineSettings::default());
        let week = Week::standard(span("2025-06-01", "2025-06-07"), false);
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();
        assert_eq!(
            engine.apply_selection(&week, &[], Actor::Member, &now),
            SelectionOutcome::Refused
        );
    }
}
