//! Compose the bookable week timeline for a date range.
//!
//! Walks a cursor from the last cycle start at or before the range, laying
//! down standard weeks and stepping over every customization, then merges
//! the customizations in as weeks of their own. Starting from a fixed cycle
//! boundary makes every week independent of where the range begins. The
//! result is sorted, non-overlapping and, from the first emitted week
//! through `to`, gapless.

use std::collections::HashSet;

use tracing::debug;

use crate::config::CalendarConfig;
use crate::customization::WeekCustomization;
use crate::day::{Day, DaySpan};
use crate::generator::{cycle_origin, cycle_week};
use crate::week::{Week, WeekId, WeekStatus};

/// Build the ordered week sequence covering `[from, to]`.
///
/// Customizations that overlap the range are included whole, even where they
/// extend past either end. Standard weeks are clipped at `to` and marked
/// partial. Days between the end of one week and the next check-in day (after
/// a customization that ends mid-cycle, or with a cadence whose check-out is
/// not the eve of check-in) become partial weeks of their own.
///
/// Weeks that start before `from` are not emitted unless they are
/// customizations, so the days before the first week starting on or after
/// `from` may be left out. `customizations` should include every record
/// overlapping `[cycle_origin(from), to]`, since one that ends just before
/// `from` decides where the first week starts.
///
/// Customizations with [`WeekStatus::Deleted`] still displace standard weeks
/// but are only emitted when `include_deleted` is set.
///
/// Returns an empty sequence when `from > to`.
pub fn compose(
    from: Day,
    to: Day,
    config: &CalendarConfig,
    customizations: &[WeekCustomization],
    include_deleted: bool,
) -> Vec<Week> {
    if from > to {
        debug!(%from, %to, "empty timeline for inverted range");
        return Vec::new();
    }

    let config = config.sanitized();
    let walk = DaySpan {
        start: cycle_origin(from, &config),
        end: to,
    };
    let window = DaySpan {
        start: from,
        end: to,
    };

    let mut relevant: Vec<&WeekCustomization> = customizations
        .iter()
        .filter(|c| c.span().overlaps(&walk))
        .collect();
    relevant.sort_by_key(|c| (c.start_date, c.end_date, c.id));

    let mut weeks = lay_standard_weeks(walk, &config, &relevant);
    weeks.retain(|w| w.start_date >= from);
    let standard_count = weeks.len();

    weeks.extend(
        relevant
            .iter()
            .filter(|c| c.span().overlaps(&window))
            .filter(|c| include_deleted || c.status != WeekStatus::Deleted)
            .map(|c| Week::from(*c)),
    );

    weeks.sort_by_key(|w| (w.start_date, w.end_date));
    disambiguate_starts(&mut weeks);

    if let Some(first) = weeks.first_mut() {
        first.is_edge_week = true;
    }
    if let Some(last) = weeks.last_mut() {
        last.is_edge_week = true;
    }

    debug!(
        %from,
        %to,
        origin = %walk.start,
        standard = standard_count,
        custom = relevant.len(),
        total = weeks.len(),
        "composed timeline"
    );

    weeks
}

/// Walk from a cycle start through `walk.end`, emitting standard (and
/// leftover partial) weeks around the sorted customizations.
fn lay_standard_weeks(
    walk: DaySpan,
    config: &CalendarConfig,
    relevant: &[&WeekCustomization],
) -> Vec<Week> {
    let to = walk.end;
    let mut weeks = Vec::new();
    let mut cursor = walk.start;
    let mut next = 0usize;

    while cursor <= to {
        while next < relevant.len() && relevant[next].end_date < cursor {
            next += 1;
        }
        let upcoming = relevant.get(next).copied();

        // Inside a customization: it supplies the coverage.
        if let Some(c) = upcoming.filter(|c| c.start_date <= cursor) {
            if c.end_date >= to {
                break;
            }
            cursor = c.end_date.succ();
            continue;
        }

        let std = cycle_week(cursor, config);

        // Leftover days, broken at every check-in day.
        if std.start > cursor {
            let mut end = cursor
                .succ()
                .next_weekday(config.check_in_weekday)
                .pred()
                .min(to);
            if let Some(c) = upcoming {
                end = end.min(c.start_date.pred());
            }
            weeks.push(Week::standard(DaySpan { start: cursor, end }, true));
            if end >= to {
                break;
            }
            cursor = end.succ();
            continue;
        }

        if let Some(c) = upcoming.filter(|c| c.start_date <= std.end) {
            // Discard the standard week; keep the days before the override.
            weeks.push(Week::standard(
                DaySpan {
                    start: std.start,
                    end: c.start_date.pred().min(to),
                },
                true,
            ));
            cursor = c.start_date;
            continue;
        }

        let end = std.end.min(to);
        weeks.push(Week::standard(
            DaySpan {
                start: std.start,
                end,
            },
            std.end > to,
        ));
        if end >= to {
            break;
        }
        cursor = end.succ();
    }

    weeks
}

/// Give every standard week sharing a start day with an earlier week a
/// distinct occurrence number. `weeks` must be sorted by start.
fn disambiguate_starts(weeks: &mut [Week]) {
    let mut prev_start: Option<i64> = None;
    let mut occurrence = 0u32;
    for week in weeks.iter_mut() {
        let start = week.start_date.ordinal();
        if prev_start == Some(start) {
            occurrence += 1;
        } else {
            occurrence = 0;
        }
        prev_start = Some(start);

        if let WeekId::Standard {
            occurrence: ref mut slot,
            ..
        } = week.id
        {
            *slot = occurrence;
        }
    }
}

// ── Coverage checking ───────────────────────────────────────────────────────

/// Gaps and overlaps found in a week sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Uncovered day ranges inside the checked span.
    pub gaps: Vec<DaySpan>,
    /// Pairs of weeks sharing at least one day.
    pub overlaps: Vec<(WeekId, WeekId)>,
    /// Weeks whose id repeats an earlier week's id.
    pub duplicate_ids: Vec<WeekId>,
}

impl CoverageReport {
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty() && self.overlaps.is_empty() && self.duplicate_ids.is_empty()
    }
}

/// Check that `weeks` cover `span` with no gaps, no overlaps and unique ids.
///
/// `weeks` need not be sorted.
pub fn check_coverage(weeks: &[Week], span: DaySpan) -> CoverageReport {
    let mut report = CoverageReport::default();

    let mut sorted: Vec<&Week> = weeks.iter().collect();
    sorted.sort_by_key(|w| (w.start_date, w.end_date));

    let mut seen = HashSet::new();
    for week in &sorted {
        if !seen.insert(week.id) {
            report.duplicate_ids.push(week.id);
        }
    }

    for pair in sorted.windows(2) {
        if pair[0].span().overlaps(&pair[1].span()) {
            report.overlaps.push((pair[0].id, pair[1].id));
        }
    }

    let mut cursor = span.start;
    for week in &sorted {
        if week.end_date < cursor {
            continue;
        }
        if week.start_date > span.end {
            break;
        }
        if week.start_date > cursor {
            report.gaps.push(DaySpan {
                start: cursor,
                end: week.start_date.pred().min(span.end),
            });
        }
        cursor = cursor.max(week.end_date.succ());
        if week.end_date >= span.end {
            cursor = span.end.succ();
            break;
        }
    }
    if cursor <= span.end {
        report.gaps.push(DaySpan {
            start: cursor,
            end: span.end,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customization::{CustomizationId, NewCustomization};
    use chrono::{TimeZone, Utc};

    fn day(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn span(start: &str, end: &str) -> DaySpan {
        DaySpan::new(day(start), day(end)).unwrap()
    }

    fn custom(id: u64, start: &str, end: &str, status: WeekStatus) -> WeekCustomization {
        NewCustomization::new(span(start, end), status, "admin")
            .into_record(
                CustomizationId(id),
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            )
    }

    fn spans(weeks: &[Week]) -> Vec<(String, String)> {
        weeks
            .iter()
            .map(|w| (w.start_date.to_string(), w.end_date.to_string()))
            .collect()
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let weeks = compose(
            day("2025-02-01"),
            day("2025-01-01"),
            &CalendarConfig::default(),
            &[],
            false,
        );
        assert!(weeks.is_empty());
    }

    #[test]
    fn test_plain_sunday_weeks() {
        let weeks = compose(
            day("2025-01-05"),
            day("2025-01-25"),
            &CalendarConfig::default(),
            &[],
            false,
        );
        assert_eq!(
            spans(&weeks),
            vec![
                ("2025-01-05".into(), "2025-01-11".into()),
                ("2025-01-12".into(), "2025-01-18".into()),
                ("2025-01-19".into(), "2025-01-25".into()),
            ]
        );
        assert!(weeks.iter().all(|w| !w.is_partial_week && !w.is_custom));
        assert!(weeks[0].is_edge_week && weeks[2].is_edge_week);
        assert!(!weeks[1].is_edge_week);
    }

    #[test]
    fn test_last_week_clipped_and_partial() {
        let weeks = compose(
            day("2025-01-05"),
            day("2025-01-14"),
            &CalendarConfig::default(),
            &[],
            false,
        );
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].end_date, day("2025-01-14"));
        assert!(weeks[1].is_partial_week);
    }

    #[test]
    fn test_customization_ending_mid_cycle_leaves_partial_week() {
        let customs = [custom(1, "2025-03-08", "2025-03-20", WeekStatus::Visible)];
        let weeks = compose(
            day("2025-03-02"),
            day("2025-03-29"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        assert_eq!(
            spans(&weeks),
            vec![
                ("2025-03-02".into(), "2025-03-07".into()),
                ("2025-03-08".into(), "2025-03-20".into()),
                ("2025-03-21".into(), "2025-03-22".into()),
                ("2025-03-23".into(), "2025-03-29".into()),
            ]
        );
        assert!(weeks[0].is_partial_week);
        assert!(weeks[1].is_custom);
        assert_eq!(weeks[1].id, WeekId::Custom { id: CustomizationId(1) });
        assert!(weeks[2].is_partial_week);
        assert!(!weeks[3].is_partial_week);
        assert!(check_coverage(&weeks, span("2025-03-02", "2025-03-29")).is_clean());
    }

    #[test]
    fn test_customization_before_first_check_in_day() {
        // Window opens on a Wednesday; an override starts on the Thursday.
        let customs = [custom(4, "2025-01-02", "2025-01-08", WeekStatus::Visible)];
        let weeks = compose(
            day("2025-01-01"),
            day("2025-01-18"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        assert_eq!(
            spans(&weeks),
            vec![
                ("2025-01-02".into(), "2025-01-08".into()),
                ("2025-01-09".into(), "2025-01-11".into()),
                ("2025-01-12".into(), "2025-01-18".into()),
            ]
        );
    }

    #[test]
    fn test_customization_spanning_window_start_is_kept_whole() {
        let customs = [custom(2, "2024-12-28", "2025-01-04", WeekStatus::Hidden)];
        let weeks = compose(
            day("2025-01-01"),
            day("2025-01-11"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        assert_eq!(weeks[0].start_date, day("2024-12-28"));
        assert_eq!(weeks[0].status, WeekStatus::Hidden);
        assert_eq!(weeks[1].start_date, day("2025-01-05"));
        assert_eq!(weeks.len(), 2);
    }

    #[test]
    fn test_deleted_customization_only_in_admin_view() {
        let customs = [custom(3, "2025-01-12", "2025-01-18", WeekStatus::Deleted)];
        let public = compose(
            day("2025-01-05"),
            day("2025-01-25"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        let admin = compose(
            day("2025-01-05"),
            day("2025-01-25"),
            &CalendarConfig::default(),
            &customs,
            true,
        );
        assert_eq!(public.len(), 2);
        assert!(public.iter().all(|w| w.start_date != day("2025-01-12")));
        assert_eq!(admin.len(), 3);
        assert_eq!(admin[1].status, WeekStatus::Deleted);
    }

    #[test]
    fn test_window_opening_after_customization_keeps_leftover_week() {
        let customs = [custom(1, "2025-03-08", "2025-03-20", WeekStatus::Visible)];
        let config = CalendarConfig::default();
        let weeks = compose(day("2025-03-21"), day("2025-03-29"), &config, &customs, false);
        assert_eq!(
            spans(&weeks),
            vec![
                ("2025-03-21".into(), "2025-03-22".into()),
                ("2025-03-23".into(), "2025-03-29".into()),
            ]
        );
        assert!(weeks[0].is_partial_week);
        assert!(check_coverage(&weeks, span("2025-03-21", "2025-03-29")).is_clean());

        let wide = compose(day("2025-03-02"), day("2025-03-29"), &config, &customs, false);
        assert_eq!(spans(&wide[2..]), spans(&weeks));
    }

    #[test]
    fn test_window_opening_mid_leftover_drops_only_that_week() {
        let customs = [custom(1, "2025-03-08", "2025-03-20", WeekStatus::Visible)];
        let weeks = compose(
            day("2025-03-22"),
            day("2025-03-29"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        assert_eq!(spans(&weeks), vec![("2025-03-23".into(), "2025-03-29".into())]);
    }

    #[test]
    fn test_saturday_to_saturday_cadence_is_gapless() {
        let config = CalendarConfig::new(6, 6);
        let weeks = compose(day("2025-01-11"), day("2025-03-08"), &config, &[], false);
        assert!(check_coverage(&weeks, span("2025-01-11", "2025-03-08")).is_clean());
        assert_eq!(weeks[0].len_days(), 8);
        assert!(weeks[1].is_partial_week);
        assert_eq!(weeks[1].span(), span("2025-01-19", "2025-01-24"));
        assert_eq!(weeks[2].start_date, day("2025-01-25"));
    }

    #[test]
    fn test_fortnight_cadence_ignores_window_start() {
        let config = CalendarConfig::new(6, 6);
        let wide = compose(day("2025-01-11"), day("2025-03-08"), &config, &[], false);
        let narrow = compose(day("2025-01-19"), day("2025-03-08"), &config, &[], false);
        assert_eq!(spans(&wide[1..]), spans(&narrow));
    }

    #[test]
    fn test_fortnight_leftover_after_customization_breaks_at_check_in() {
        // Ends on the Friday before an off-phase Saturday.
        let config = CalendarConfig::new(6, 6);
        let customs = [custom(5, "2025-01-11", "2025-01-17", WeekStatus::Visible)];
        let weeks = compose(day("2025-01-11"), day("2025-02-01"), &config, &customs, false);
        assert_eq!(
            spans(&weeks),
            vec![
                ("2025-01-11".into(), "2025-01-17".into()),
                ("2025-01-18".into(), "2025-01-24".into()),
                ("2025-01-25".into(), "2025-02-01".into()),
            ]
        );
        assert!(weeks[1].is_partial_week);
        assert!(!weeks[2].is_partial_week);
    }

    #[test]
    fn test_overlapping_input_gets_distinct_ids() {
        // Storage should never hold these, but the ids must still be unique.
        let customs = [
            custom(1, "2025-01-05", "2025-01-11", WeekStatus::Visible),
            custom(2, "2025-01-05", "2025-01-15", WeekStatus::Visible),
        ];
        let weeks = compose(
            day("2025-01-05"),
            day("2025-01-25"),
            &CalendarConfig::default(),
            &customs,
            false,
        );
        let ids: HashSet<_> = weeks.iter().map(|w| w.id).collect();
        assert_eq!(ids.len(), weeks.len());
    }

    #[test]
    fn test_disambiguate_standard_duplicates() {
        let mut weeks = vec![
            Week::standard(span("2025-01-05", "2025-01-11"), false),
            Week::standard(span("2025-01-05", "2025-01-11"), false),
        ];
        disambiguate_starts(&mut weeks);
        assert_ne!(weeks[0].id, weeks[1].id);
        assert_eq!(weeks[0].start_date, weeks[1].start_date);
    }

    #[test]
    fn test_check_coverage_reports_gap_and_overlap() {
        let weeks = vec![
            Week::standard(span("2025-01-05", "2025-01-11"), false),
            Week::standard(span("2025-01-14", "2025-01-20"), false),
            Week::standard(span("2025-01-20", "2025-01-25"), false),
        ];
        let report = check_coverage(&weeks, span("2025-01-05", "2025-01-27"));
        assert_eq!(
            report.gaps,
            vec![span("2025-01-12", "2025-01-13"), span("2025-01-26", "2025-01-27")]
        );
        assert_eq!(report.overlaps.len(), 1);
        assert!(!report.is_clean());
    }
}
