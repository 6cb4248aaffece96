mod store;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use week_engine::{
    is_selectable, Actor, CustomizationId, Day, DaySpan, NewCustomization, ResolutionTarget,
    WeekStatus,
};

use crate::store::Store;

#[derive(Parser, Debug)]
#[command(name = "weeks", version, about = "Inspect and edit bookable week timelines")]
struct Cli {
    /// JSON store holding settings and customizations.
    #[arg(long, global = true, default_value = "weeks.json")]
    store: PathBuf,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the timeline for a date range as JSON.
    List {
        #[arg(long)]
        from: Day,
        #[arg(long)]
        to: Day,
        /// Include customizations marked deleted (admin view).
        #[arg(long)]
        include_deleted: bool,
    },
    /// Create or re-date a customization, resolving overlaps.
    Customize {
        #[arg(long)]
        start: Day,
        #[arg(long)]
        end: Day,
        #[arg(long, value_enum, default_value_t = StatusArg::Visible)]
        status: StatusArg,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        link: Option<String>,
        /// Flexible check-in day inside the interval (repeatable).
        #[arg(long = "flex")]
        flex: Vec<Day>,
        /// Edit the customization with this id instead of creating one.
        #[arg(long)]
        edit: Option<u64>,
        #[arg(long, default_value = "cli")]
        created_by: String,
        /// Print the planned operations without writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Hard-delete a customization.
    Remove {
        #[arg(long)]
        id: u64,
    },
    /// Report whether the week starting on a day can open a stay.
    Check {
        #[arg(long)]
        week_start: Day,
        /// Current instant, RFC 3339.
        #[arg(long)]
        now: DateTime<Utc>,
        #[arg(long)]
        admin: bool,
        /// IANA timezone for the cutoff, overriding the stored policy.
        #[arg(long)]
        timezone: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Default,
    Visible,
    Hidden,
    Deleted,
}

impl From<StatusArg> for WeekStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Default => WeekStatus::Default,
            StatusArg::Visible => WeekStatus::Visible,
            StatusArg::Hidden => WeekStatus::Hidden,
            StatusArg::Deleted => WeekStatus::Deleted,
        }
    }
}

fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let store = Store::new(&cli.store);
    let mut engine = store.open()?;

    match cli.command {
        Command::List {
            from,
            to,
            include_deleted,
        } => {
            let weeks = engine.get_weeks(from, to, include_deleted)?;
            print_json(&weeks)?;
        }

        Command::Customize {
            start,
            end,
            status,
            name,
            link,
            flex,
            edit,
            created_by,
            dry_run,
        } => {
            let span = DaySpan::new(start, end)?;
            let mut draft = NewCustomization::new(span, status.into(), created_by)
                .with_flexible_dates(flex);
            draft.name = name;
            draft.link = link;

            let target = match edit {
                Some(id) => ResolutionTarget::Edit {
                    id: CustomizationId(id),
                    draft,
                },
                None => ResolutionTarget::New { draft },
            };

            if dry_run {
                let ops = engine.plan_overlap(&target)?;
                print_json(&ops)?;
            } else {
                let report = engine.resolve_overlap(&target)?;
                store.save(&engine)?;
                print_json(&report)?;
            }
        }

        Command::Remove { id } => {
            let id = CustomizationId(id);
            if !engine.delete_customization(id)? {
                bail!("no customization with id {id}");
            }
            store.save(&engine)?;
            print_json(&json!({ "removed": id }))?;
        }

        Command::Check {
            week_start,
            now,
            admin,
            timezone,
        } => {
            let actor = if admin { Actor::Admin } else { Actor::Member };
            let weeks = engine.get_weeks(week_start, week_start.add_days(13), admin)?;
            let week = weeks
                .into_iter()
                .find(|w| w.start_date == week_start)
                .ok_or_else(|| anyhow!("no week starts on {week_start}"))?;
            let selectable = match timezone {
                Some(name) => {
                    let policy = engine.settings().policy.clone().in_timezone(&name)?;
                    is_selectable(&week, actor, &[], &now, &policy)
                }
                None => engine.is_selectable(&week, actor, &[], &now),
            };
            print_json(&json!({ "week": week, "selectable": selectable }))?;
        }
    }

    Ok(())
}
