//! Turn a click on a week into the next selection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::SelectionPolicy;
use crate::selectable::{is_selectable, Actor};
use crate::week::Week;

/// Inputs the reducer needs besides the click itself.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Generated weeks spanning at least the current selection and the
    /// clicked week, in start order.
    pub timeline: &'a [Week],
    pub policy: &'a SelectionPolicy,
    pub now: DateTime<Utc>,
}

/// Result of a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "weeks", rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// The new selection (possibly empty after a full deselect).
    Selected(Vec<Week>),
    /// The click does nothing.
    Unchanged,
    /// The click is not allowed; the selection stays as it was.
    Refused,
    /// The resulting stay would be longer than the policy allows.
    TooManyWeeks { requested: usize, max: usize },
    /// Admin clicks open the edit flow for the week instead.
    AdminEdit(Week),
}

impl SelectionOutcome {
    /// The selection to show after this outcome.
    pub fn into_selection(self, current: &[Week]) -> Vec<Week> {
        match self {
            SelectionOutcome::Selected(weeks) => weeks,
            _ => current.to_vec(),
        }
    }
}

/// Apply a click on `week` to `selection`.
///
/// - Empty selection: a selectable week becomes the whole selection.
/// - Clicking the first or last selected week deselects it. The new arrival
///   is the first remaining week, scanning forward, that is still selectable
///   as an arrival on its own; everything before it is dropped. If none
///   qualifies the click is refused.
/// - Clicking a week before the arrival or after the departure selects the
///   contiguous run of timeline weeks between it and the opposite boundary,
///   unless that run is longer than `policy.max_selection_weeks`. A run
///   that skips days the timeline leaves uncovered is refused.
/// - Clicking a week strictly inside the selection does nothing.
pub fn reduce(
    week: &Week,
    selection: &[Week],
    actor: Actor,
    ctx: &SelectionContext<'_>,
) -> SelectionOutcome {
    if actor.is_admin() {
        return SelectionOutcome::AdminEdit(week.clone());
    }

    let mut current = selection.to_vec();
    current.sort_by_key(|w| (w.start_date, w.end_date));

    if current.is_empty() {
        return if is_selectable(week, actor, &[], &ctx.now, ctx.policy) {
            SelectionOutcome::Selected(vec![week.clone()])
        } else {
            SelectionOutcome::Refused
        };
    }

    if let Some(pos) = current.iter().position(|w| w.same_slot(week)) {
        if pos != 0 && pos != current.len() - 1 {
            return SelectionOutcome::Unchanged;
        }
        return deselect(pos, current, actor, ctx);
    }

    let (first, last) = (&current[0], &current[current.len() - 1]);
    if week.start_date > first.start_date && week.start_date < last.start_date {
        return SelectionOutcome::Unchanged;
    }

    if !is_selectable(week, actor, &current, &ctx.now, ctx.policy) {
        return SelectionOutcome::Refused;
    }

    let (lo, hi) = if week.start_date < first.start_date {
        (week.start_date, last.start_date)
    } else {
        (first.start_date, week.start_date)
    };
    let run: Vec<Week> = ctx
        .timeline
        .iter()
        .filter(|w| w.start_date >= lo && w.start_date <= hi)
        .cloned()
        .collect();

    if !run.iter().any(|w| w.same_slot(week)) {
        debug!(start = %week.start_date, "clicked week missing from timeline");
        return SelectionOutcome::Refused;
    }

    // Days missing from the member timeline (withdrawn customizations) break
    // the run.
    if let Some(pair) = run
        .windows(2)
        .find(|pair| pair[0].end_date.succ() != pair[1].start_date)
    {
        debug!(after = %pair[0].end_date, before = %pair[1].start_date, "run has a hole");
        return SelectionOutcome::Refused;
    }

    let max = ctx.policy.max_selection_weeks;
    if run.len() > max {
        return SelectionOutcome::TooManyWeeks {
            requested: run.len(),
            max,
        };
    }

    SelectionOutcome::Selected(run)
}

fn deselect(
    pos: usize,
    mut current: Vec<Week>,
    actor: Actor,
    ctx: &SelectionContext<'_>,
) -> SelectionOutcome {
    current.remove(pos);
    if current.is_empty() {
        return SelectionOutcome::Selected(current);
    }

    match current
        .iter()
        .position(|w| is_selectable(w, actor, &[], &ctx.now, ctx.policy))
    {
        Some(arrival) => SelectionOutcome::Selected(current.split_off(arrival)),
        None => SelectionOutcome::Refused,
    }
}
