//! Resolve overlaps when a customization is created or re-dated.
//!
//! Resolution happens in two steps. [`plan_resolution`] is pure: it looks at
//! the target interval and the stored customizations it touches, classifies
//! each overlap, and emits the operations that restore pairwise
//! disjointness. [`apply_operations`] then runs a plan against a repository
//! as one unit of work, undoing the already-applied steps if a later one
//! fails.
//!
//! # Overlap cases
//!
//! With the target `[S, E]` and an existing record `[s, e]`:
//!
//! | Case                 | Condition              | Action                                   |
//! |----------------------|------------------------|------------------------------------------|
//! | [`Contained`]        | `S <= s`, `e <= E`     | delete existing                          |
//! | [`ExtendsBefore`]    | `s < S <= e <= E`      | end existing at `S-1`                    |
//! | [`ExtendsAfter`]     | `S <= s <= E < e`      | start existing at `E+1`                  |
//! | [`Encloses`]         | `s < S`, `E < e`       | keep `[s, S-1]`, create `[E+1, e]`       |
//!
//! Flexible check-in dates follow the days they sit on; those that land
//! inside the target are dropped.
//!
//! [`Contained`]: OverlapCase::Contained
//! [`ExtendsBefore`]: OverlapCase::ExtendsBefore
//! [`ExtendsAfter`]: OverlapCase::ExtendsAfter
//! [`Encloses`]: OverlapCase::Encloses

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::customization::{CustomizationId, CustomizationPatch, NewCustomization, WeekCustomization};
use crate::day::{Day, DaySpan};
use crate::error::{CalendarError, Result};
use crate::repository::CustomizationRepository;

// ── Types ───────────────────────────────────────────────────────────────────

/// How an existing customization overlaps the target interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapCase {
    /// The existing span lies entirely inside the target.
    Contained,
    /// The existing span starts before the target and ends inside it.
    ExtendsBefore,
    /// The existing span starts inside the target and ends after it.
    ExtendsAfter,
    /// The target lies strictly inside the existing span.
    Encloses,
}

/// What the caller is writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolutionTarget {
    /// A brand new customization.
    New { draft: NewCustomization },
    /// New dates (and fields) for an existing customization.
    Edit {
        id: CustomizationId,
        draft: NewCustomization,
    },
}

impl ResolutionTarget {
    pub fn draft(&self) -> &NewCustomization {
        match self {
            ResolutionTarget::New { draft } | ResolutionTarget::Edit { draft, .. } => draft,
        }
    }

    pub fn edited_id(&self) -> Option<CustomizationId> {
        match self {
            ResolutionTarget::New { .. } => None,
            ResolutionTarget::Edit { id, .. } => Some(*id),
        }
    }
}

/// One repository write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Create {
        customization: NewCustomization,
    },
    Update {
        id: CustomizationId,
        patch: CustomizationPatch,
    },
    Delete {
        id: CustomizationId,
    },
}

impl Operation {
    /// Execution class: deletes, then updates, then creates.
    fn apply_rank(&self) -> u8 {
        match self {
            Operation::Delete { .. } => 0,
            Operation::Update { .. } => 1,
            Operation::Create { .. } => 2,
        }
    }
}

/// The outcome of one applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Applied {
    Created { record: WeekCustomization },
    Updated { record: WeekCustomization },
    Deleted { id: CustomizationId },
}

/// Everything a successful resolution did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// The plan, in emitted order (target first).
    pub operations: Vec<Operation>,
    /// Results, in execution order.
    pub applied: Vec<Applied>,
    /// The stored target record after resolution.
    pub target: Option<WeekCustomization>,
}

// ── Planning ────────────────────────────────────────────────────────────────

/// Classify how `existing` overlaps `target`, or `None` if they are disjoint.
pub fn classify(target: &DaySpan, existing: &DaySpan) -> Option<OverlapCase> {
    if !target.overlaps(existing) {
        return None;
    }
    let case = match (existing.start < target.start, existing.end > target.end) {
        (false, false) => OverlapCase::Contained,
        (true, false) => OverlapCase::ExtendsBefore,
        (false, true) => OverlapCase::ExtendsAfter,
        (true, true) => OverlapCase::Encloses,
    };
    Some(case)
}

/// Plan the writes that store `target` while keeping every stored span
/// disjoint.
///
/// `existing` may contain records that do not overlap the target; they are
/// ignored, as is the record being edited. The target's own operation comes
/// first, followed by the adjustments for each overlapped record in start
/// order.
///
/// # Errors
///
/// Returns [`CalendarError::InvalidRange`] or
/// [`CalendarError::InvalidFlexibleDate`] if the target draft is invalid.
pub fn plan_resolution(
    target: &ResolutionTarget,
    existing: &[WeekCustomization],
) -> Result<Vec<Operation>> {
    let draft = target.draft().clone().validated()?;
    let span = draft.span();
    let edited = target.edited_id();

    let mut overlapped: Vec<&WeekCustomization> = existing
        .iter()
        .filter(|c| Some(c.id) != edited && c.span().overlaps(&span))
        .collect();
    overlapped.sort_by_key(|c| (c.start_date, c.id));

    let mut ops = Vec::with_capacity(1 + overlapped.len() * 2);
    ops.push(match edited {
        None => Operation::Create {
            customization: draft,
        },
        Some(id) => Operation::Update {
            id,
            patch: CustomizationPatch::from_draft(&draft),
        },
    });

    for record in overlapped {
        let Some(case) = classify(&span, &record.span()) else {
            continue;
        };
        debug!(id = %record.id, existing = %record.span(), target = %span, ?case, "overlap");
        ops.extend(adjustments(case, &span, record));
    }

    Ok(ops)
}

fn adjustments(case: OverlapCase, target: &DaySpan, record: &WeekCustomization) -> Vec<Operation> {
    let before = |d: &Day| *d < target.start;
    let after = |d: &Day| *d > target.end;

    match case {
        OverlapCase::Contained => vec![Operation::Delete { id: record.id }],
        OverlapCase::ExtendsBefore => vec![Operation::Update {
            id: record.id,
            patch: CustomizationPatch {
                end_date: Some(target.start.pred()),
                flexible_checkin_dates: Some(keep_dates(record, before)),
                ..CustomizationPatch::default()
            },
        }],
        OverlapCase::ExtendsAfter => vec![Operation::Update {
            id: record.id,
            patch: CustomizationPatch {
                start_date: Some(target.end.succ()),
                flexible_checkin_dates: Some(keep_dates(record, after)),
                ..CustomizationPatch::default()
            },
        }],
        OverlapCase::Encloses => vec![
            Operation::Update {
                id: record.id,
                patch: CustomizationPatch {
                    end_date: Some(target.start.pred()),
                    flexible_checkin_dates: Some(keep_dates(record, before)),
                    ..CustomizationPatch::default()
                },
            },
            Operation::Create {
                customization: NewCustomization {
                    start_date: target.end.succ(),
                    end_date: record.end_date,
                    status: record.status,
                    name: record.name.clone(),
                    link: record.link.clone(),
                    flexible_checkin_dates: keep_dates(record, after),
                    created_by: record.created_by.clone(),
                },
            },
        ],
    }
}

fn keep_dates(record: &WeekCustomization, keep: impl Fn(&Day) -> bool) -> Vec<Day> {
    record
        .flexible_checkin_dates
        .iter()
        .copied()
        .filter(|d| keep(d))
        .collect()
}

// ── Application ─────────────────────────────────────────────────────────────

/// How to undo one applied step.
#[derive(Debug)]
enum Compensation {
    Remove(CustomizationId),
    Revert(CustomizationId, CustomizationPatch),
    Restore(WeekCustomization),
}

/// Run a plan against `repo` as a single unit of work.
///
/// Deletes run first, then updates, then creates, each class in plan order,
/// so no create ever lands on a span still held by another record. Every
/// applied step records how to undo it; if a later step fails, the undo log
/// is replayed newest first.
///
/// # Errors
///
/// If the very first write fails its error is returned untouched. A failure
/// after at least one write becomes
/// [`CalendarError::OverlapResolutionPartialFailure`], whose `rolled_back`
/// flag says whether the store was returned to its prior state. When it is
/// `false` the caller must re-read before retrying.
pub fn apply_operations<R: CustomizationRepository + ?Sized>(
    repo: &mut R,
    operations: Vec<Operation>,
) -> Result<ResolutionReport> {
    let mut order: Vec<usize> = (0..operations.len()).collect();
    order.sort_by_key(|&i| operations[i].apply_rank());

    let mut journal: Vec<Compensation> = Vec::with_capacity(operations.len());
    let mut applied = Vec::with_capacity(operations.len());
    let mut target = None;

    for i in order {
        match apply_one(repo, &operations[i], &mut journal) {
            Ok(result) => {
                if i == 0 {
                    target = match &result {
                        Applied::Created { record } | Applied::Updated { record } => {
                            Some(record.clone())
                        }
                        Applied::Deleted { .. } => None,
                    };
                }
                applied.push(result);
            }
            Err(err) if journal.is_empty() => return Err(err),
            Err(err) => {
                let done = journal.len();
                warn!(applied = done, error = %err, "resolution failed, rolling back");
                let rolled_back = roll_back(repo, journal);
                return Err(CalendarError::OverlapResolutionPartialFailure {
                    applied: done,
                    rolled_back,
                    source: Box::new(err),
                });
            }
        }
    }

    info!(operations = operations.len(), "applied overlap resolution");
    Ok(ResolutionReport {
        operations,
        applied,
        target,
    })
}

fn apply_one<R: CustomizationRepository + ?Sized>(
    repo: &mut R,
    op: &Operation,
    journal: &mut Vec<Compensation>,
) -> Result<Applied> {
    match op {
        Operation::Create { customization } => {
            let record = repo.create_customization(customization.clone())?;
            journal.push(Compensation::Remove(record.id));
            Ok(Applied::Created { record })
        }
        Operation::Update { id, patch } => {
            let before = repo
                .get_customization(*id)?
                .ok_or(CalendarError::CustomizationNotFound(*id))?;
            let record = repo.update_customization(*id, patch)?;
            journal.push(Compensation::Revert(*id, before.restoring_patch()));
            Ok(Applied::Updated { record })
        }
        Operation::Delete { id } => {
            let Some(before) = repo.get_customization(*id)? else {
                // Already gone; nothing to undo.
                return Ok(Applied::Deleted { id: *id });
            };
            repo.delete_customization(*id)?;
            journal.push(Compensation::Restore(before));
            Ok(Applied::Deleted { id: *id })
        }
    }
}

/// Replay the undo log newest first. Returns `true` if every step succeeded.
fn roll_back<R: CustomizationRepository + ?Sized>(repo: &mut R, journal: Vec<Compensation>) -> bool {
    let mut clean = true;
    for step in journal.into_iter().rev() {
        let result = match &step {
            Compensation::Remove(id) => repo.delete_customization(*id).map(|_| ()),
            Compensation::Revert(id, patch) => repo.update_customization(*id, patch).map(|_| ()),
            Compensation::Restore(record) => repo.restore_customization(record.clone()),
        };
        if let Err(err) = result {
            warn!(?step, error = %err, "rollback step failed");
            clean = false;
        }
    }
    clean
}
