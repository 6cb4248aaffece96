//! Standard week generation from the recurring cadence.

use crate::config::CalendarConfig;
use crate::day::{Day, DaySpan};

/// Weeks shorter than this are stretched by a full cycle.
pub const MIN_WEEK_DAYS: i64 = 3;

/// Compute the standard week that begins at the first check-in day on or
/// after `day`.
///
/// The week ends on the first check-out weekday on or after its start. When
/// check-in and check-out fall on the same or adjacent weekdays that would
/// give a one or two day week, so the end is pushed out by seven days and
/// every standard week spans at least [`MIN_WEEK_DAYS`] days.
///
/// A malformed `config` is treated as the default Sunday to Saturday cadence.
///
/// # Examples
///
/// ```
/// use week_engine::config::CalendarConfig;
/// use week_engine::generator::standard_week;
///
/// // Wednesday 2025-01-01 rolls forward to Sunday the 5th.
/// let week = standard_week("2025-01-01".parse().unwrap(), &CalendarConfig::default());
/// assert_eq!(week.start.to_string(), "2025-01-05");
/// assert_eq!(week.end.to_string(), "2025-01-11");
/// ```
pub fn standard_week(day: Day, config: &CalendarConfig) -> DaySpan {
    let config = if config.is_valid() {
        *config
    } else {
        CalendarConfig::default()
    };

    let start = day.next_weekday(config.check_in_weekday);
    let mut end = start.next_weekday(config.check_out_weekday);
    if start.days_until(end) + 1 < MIN_WEEK_DAYS {
        end = end.add_days(7);
    }
    DaySpan { start, end }
}

/// Check-in days an even number of weeks after this Sunday (1970-01-04, as
/// days since 0001-01-01) open a fourteen-day cycle.
const FORTNIGHT_EPOCH: i64 = 719_166;

/// Length of the repeating pattern of standard weeks and leftover days.
///
/// Seven days, unless the standard week overruns the next check-in day
/// (check-out on or the day after the check-in weekday). Then one standard
/// week and one leftover partial week alternate over fourteen days.
pub fn cycle_days(config: &CalendarConfig) -> i64 {
    let config = if config.is_valid() {
        *config
    } else {
        CalendarConfig::default()
    };
    let span = (i64::from(config.check_out_weekday) - i64::from(config.check_in_weekday))
        .rem_euclid(7)
        + 1;
    if span < MIN_WEEK_DAYS {
        14
    } else {
        7
    }
}

/// The standard week opening the first cycle on or after `day`.
///
/// For a seven-day cycle this is [`standard_week`]. For a fourteen-day cycle
/// only every other check-in day opens one, counted from a fixed epoch so
/// the result does not depend on where a caller starts looking.
pub fn cycle_week(day: Day, config: &CalendarConfig) -> DaySpan {
    let week = standard_week(day, config);
    let weeks_since = (week.start.ordinal() - FORTNIGHT_EPOCH).div_euclid(7);
    if cycle_days(config) == 7 || weeks_since.rem_euclid(2) == 0 {
        week
    } else {
        standard_week(week.start.add_days(7), config)
    }
}

/// The latest cycle start on or before `day`.
pub fn cycle_origin(day: Day, config: &CalendarConfig) -> Day {
    cycle_week(day.add_days(1 - cycle_days(config)), config).start
}
