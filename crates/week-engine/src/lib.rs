//! # week-engine
//!
//! Deterministic bookable-week timelines for shared properties.
//!
//! A property runs on a recurring check-in/check-out cadence. Admins override
//! individual spans with customizations; members pick contiguous runs of
//! weeks subject to cutoff, season and blackout rules. Everything here is a
//! pure function of its inputs except the overlap resolver's write path,
//! which goes through a [`CustomizationRepository`].
//!
//! ## Modules
//!
//! - [`day`]: Calendar-day values, inclusive spans, date normalization
//! - [`config`]: Cadence, selection policy, engine settings
//! - [`generator`]: Standard week for a day under a cadence
//! - [`timeline`]: Merge standard weeks and customizations into a gapless timeline
//! - [`overlap`]: Classify overlaps and apply create/update/delete plans with rollback
//! - [`selectable`]: Whether a week may be picked as arrival or departure
//! - [`selection`]: Reduce a click into the next selection
//! - [`repository`]: Storage trait and the in-memory implementation
//! - [`engine`]: [`WeekEngine`], the facade over all of the above
//! - [`error`]: Error types

pub mod config;
pub mod customization;
pub mod day;
pub mod engine;
pub mod error;
pub mod generator;
pub mod overlap;
pub mod repository;
pub mod selectable;
pub mod selection;
pub mod timeline;
pub mod week;

pub use config::{Blackout, CalendarConfig, EngineSettings, SeasonClose, SelectionPolicy};
pub use customization::{CustomizationId, CustomizationPatch, NewCustomization, WeekCustomization};
pub use day::{normalize, normalize_instant, Day, DaySpan};
pub use engine::WeekEngine;
pub use error::{CalendarError, Result};
pub use generator::{cycle_days, cycle_origin, cycle_week, standard_week};
pub use overlap::{
    apply_operations, classify, plan_resolution, Applied, Operation, OverlapCase,
    ResolutionReport, ResolutionTarget,
};
pub use repository::{CustomizationRepository, InMemoryRepository, RepositorySnapshot};
pub use selectable::{cutoff_day, is_arrival_eligible, is_selectable, Actor};
pub use selection::{reduce, SelectionContext, SelectionOutcome};
pub use timeline::{check_coverage, compose, CoverageReport};
pub use week::{Week, WeekId, WeekStatus};
