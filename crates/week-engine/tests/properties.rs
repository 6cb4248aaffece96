//! Property tests for the timeline and overlap invariants.

use proptest::prelude::*;
use week_engine::{
    check_coverage, compose, cycle_week, standard_week, CalendarConfig, Day, DaySpan,
    EngineSettings, InMemoryRepository, NewCustomization, ResolutionTarget, Week, WeekEngine,
    WeekStatus,
};

// ── Strategies ──────────────────────────────────────────────────────────────

prop_compose! {
    fn cadence()(check_in in 0u8..7, check_out in 0u8..7) -> CalendarConfig {
        CalendarConfig::new(check_in, check_out)
    }
}

prop_compose! {
    fn day_in_2025()(offset in 0i64..365) -> Day {
        Day::from_ymd(2025, 1, 1).unwrap().add_days(offset)
    }
}

prop_compose! {
    fn window()(from in day_in_2025(), len in 0i64..120) -> (Day, Day) {
        (from, from.add_days(len))
    }
}

fn status() -> impl Strategy<Value = WeekStatus> {
    prop_oneof![
        Just(WeekStatus::Default),
        Just(WeekStatus::Visible),
        Just(WeekStatus::Hidden),
        Just(WeekStatus::Deleted),
    ]
}

prop_compose! {
    fn draft()(start in day_in_2025(), len in 0i64..21, status in status()) -> NewCustomization {
        let span = DaySpan { start, end: start.add_days(len) };
        NewCustomization::new(span, status, "prop")
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn engine_with(
    config: CalendarConfig,
    drafts: Vec<NewCustomization>,
) -> WeekEngine<InMemoryRepository> {
    let mut engine = WeekEngine::new(
        InMemoryRepository::with_config(config),
        EngineSettings::default(),
    );
    for draft in drafts {
        engine
            .resolve_overlap(&ResolutionTarget::New { draft })
            .unwrap();
    }
    engine
}

proptest! {
    /// Standard weeks start on the check-in day and are never shorter than
    /// three days.
    #[test]
    fn standard_weeks_have_minimum_length(config in cadence(), day in day_in_2025()) {
        let week = standard_week(day, &config);
        prop_assert!(week.start >= day);
        prop_assert!(day.days_until(week.start) < 7);
        prop_assert_eq!(week.start.weekday_index(), config.check_in_weekday);
        prop_assert_eq!(week.end.weekday_index(), config.check_out_weekday);
        prop_assert!(week.len_days() >= 3);
        prop_assert!(week.len_days() <= 9);
    }

    /// Without customizations the timeline tiles the window from the first
    /// week starting inside it.
    #[test]
    fn plain_timeline_is_gapless((from, to) in window(), config in cadence()) {
        let weeks = compose(from, to, &config, &[], false);
        if let Some(first) = weeks.first() {
            let report = check_coverage(&weeks, DaySpan { start: first.start_date, end: to });
            prop_assert!(report.is_clean(), "{:?}", report);
            prop_assert!(weeks.iter().all(|w| w.end_date <= to));
        } else {
            prop_assert!(cycle_week(from, &config).start > to);
        }
    }

    /// Any sequence of writes leaves stored customizations pairwise disjoint.
    #[test]
    fn resolved_customizations_never_overlap(drafts in prop::collection::vec(draft(), 1..12)) {
        let engine = engine_with(CalendarConfig::default(), drafts);
        let stored: Vec<DaySpan> = engine.repository().all().map(|c| c.span()).collect();
        for (i, a) in stored.iter().enumerate() {
            for b in &stored[i + 1..] {
                prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
    }

    /// The admin timeline over resolved customizations is gapless, with no
    /// overlaps and unique ids.
    #[test]
    fn admin_timeline_is_gapless(
        config in cadence(),
        drafts in prop::collection::vec(draft(), 0..8),
        (from, to) in window(),
    ) {
        let engine = engine_with(config, drafts);
        let weeks = engine.get_weeks(from, to, true).unwrap();
        if let Some(first) = weeks.first() {
            let report = check_coverage(&weeks, DaySpan { start: first.start_date, end: to });
            prop_assert!(report.is_clean(), "{:?}", report);
        }
    }

    /// A week starting inside a range is the same whether the range is read
    /// whole or from any later day.
    #[test]
    fn weeks_do_not_depend_on_range_start(
        config in cadence(),
        drafts in prop::collection::vec(draft(), 0..8),
        (from, to) in window(),
        skip in 0i64..120,
        include_deleted in any::<bool>(),
    ) {
        let engine = engine_with(config, drafts);
        let start = from.add_days(skip).min(to);
        let key = |w: &Week| (w.id, w.start_date, w.end_date, w.status, w.is_partial_week, w.is_custom);

        let wide: Vec<_> = engine
            .get_weeks(from, to, include_deleted)
            .unwrap()
            .iter()
            .filter(|w| w.start_date >= start)
            .map(key)
            .collect();
        let narrow: Vec<_> = engine
            .get_weeks(start, to, include_deleted)
            .unwrap()
            .iter()
            .filter(|w| w.start_date >= start)
            .map(key)
            .collect();
        prop_assert_eq!(wide, narrow);
    }

    /// Reading the same range twice yields the same weeks.
    #[test]
    fn reads_are_idempotent(
        drafts in prop::collection::vec(draft(), 0..6),
        (from, to) in window(),
        include_deleted in any::<bool>(),
    ) {
        let engine = engine_with(CalendarConfig::default(), drafts);
        let first = engine.get_weeks(from, to, include_deleted).unwrap();
        let second = engine.get_weeks(from, to, include_deleted).unwrap();
        prop_assert_eq!(first, second);
    }
}
