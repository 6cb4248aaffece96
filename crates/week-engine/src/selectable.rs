//! Decide whether a week may be picked as an arrival or departure boundary.
//!
//! [`is_selectable`] is a pure predicate. The clock and the timezone in
//! which "today" is observed are explicit inputs, so the same call always
//! gives the same answer.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SelectionPolicy;
use crate::day::{Day, DaySpan};
use crate::week::{Week, WeekStatus};

/// Privilege level of whoever is selecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    #[default]
    Member,
    Admin,
}

impl Actor {
    pub fn is_admin(self) -> bool {
        self == Actor::Admin
    }
}

/// The first day a member may still arrive on.
///
/// Before `policy.cutoff_hour` (local time in `policy.timezone`) that is
/// today; from the cutoff hour on it is tomorrow.
pub fn cutoff_day(now: &DateTime<Utc>, policy: &SelectionPolicy) -> Day {
    let today = Day::from_instant(now, &policy.timezone);
    let local_hour = now.with_timezone(&policy.timezone).hour();
    if local_hour < policy.cutoff_hour {
        today
    } else {
        today.succ()
    }
}

/// Whether `week` may be chosen given the current `selection`.
///
/// Admins may always select. For members, in order:
///
/// 1. Weeks starting before [`cutoff_day`] are refused.
/// 2. Weeks starting on or after the season close of the current year are
///    refused.
/// 3. With an empty selection the week is a prospective arrival and must
///    pass [`is_arrival_eligible`].
/// 4. The current arrival week itself stays selectable so it can be
///    deselected.
/// 5. A later week is a departure candidate: its status does not matter,
///    but no blackout may fall between the arrival and the candidate's end.
/// 6. An earlier week would become the new arrival: it must pass
///    [`is_arrival_eligible`] and no blackout may fall between it and the
///    current departure.
///
/// `selection` is expected in start order.
pub fn is_selectable(
    week: &Week,
    actor: Actor,
    selection: &[Week],
    now: &DateTime<Utc>,
    policy: &SelectionPolicy,
) -> bool {
    if actor.is_admin() {
        return true;
    }

    if week.start_date < cutoff_day(now, policy) {
        return false;
    }

    let today = Day::from_instant(now, &policy.timezone);
    if let Some(close) = policy.season_close.and_then(|c| c.in_year(today.year())) {
        if week.start_date >= close {
            return false;
        }
    }

    let (Some(arrival), Some(departure)) = (selection.first(), selection.last()) else {
        return is_arrival_eligible(week, policy);
    };

    if week.same_slot(arrival) {
        return true;
    }

    if week.start_date > arrival.start_date {
        let stay = DaySpan {
            start: arrival.start_date,
            end: week.end_date.max(arrival.start_date),
        };
        return !policy.blackout_overlaps(&stay);
    }

    let stay = DaySpan {
        start: week.start_date,
        end: departure.end_date.max(week.start_date),
    };
    is_arrival_eligible(week, policy) && !policy.blackout_overlaps(&stay)
}

/// Whether `week` could open a stay on its own merits.
///
/// Deleted and blackout weeks never can. Default and visible weeks can.
/// Hidden weeks can only when they start in one of
/// `policy.always_eligible_months`.
pub fn is_arrival_eligible(week: &Week, policy: &SelectionPolicy) -> bool {
    if week.status == WeekStatus::Deleted {
        return false;
    }
    if policy.blackout_overlaps(&week.span()) {
        return false;
    }
    week.status.is_bookable() || policy.always_eligible_months.contains(&week.start_date.month())
}
