//! Command-line adapter for the capacity allocation engine.
//!
//! # Responsibility
//! - Resolve store, clock and logging configuration from flags/environment.
//! - Map subcommands onto engine operations and render their results.
//!
//! # Invariants
//! - Engine messages are printed verbatim.
//! - One invocation evaluates the activity window against one date.

mod render;

use capacity_core::{
    default_log_level, init_logging, open_store, ActionResponse, AllocateRequest,
    AllocationEngine, AllocationUpdate, EngineResult, EntityStore, ErrorKind, FixedClock,
    HistoryKey, JsonFileStore, Outcome, SqliteEntityStore, StoreBackend, StoreError,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "capacity", version, about = "Track engineer capacity allocations")]
struct Cli {
    /// Directory holding engineers.json, projects.json and allocations.json.
    #[arg(long, global = true, env = "CAPACITY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// SQLite database file; takes precedence over --data-dir.
    #[arg(long, global = true, env = "CAPACITY_DB")]
    db: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD) for the activity window. Defaults to today.
    #[arg(long, global = true, env = "CAPACITY_TODAY", value_parser = parse_day)]
    today: Option<NaiveDate>,

    /// Log level: trace|debug|info|warn|error.
    #[arg(long, global = true, env = "CAPACITY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true, env = "CAPACITY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Print the structured response envelope as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the data directory (or database) with empty collections.
    Init,
    /// Copy a JSON data directory into the SQLite database given by --db.
    Import {
        #[arg(long)]
        from: PathBuf,
    },
    /// List engineers.
    Engineers,
    /// List projects.
    Projects,
    /// Allocate an engineer to a project.
    Allocate(AllocateArgs),
    /// Change an allocation's percentage and/or dates.
    Update(UpdateArgs),
    /// List engineers with zero active capacity.
    Bench,
    /// Engineers under the ceiling, most available first.
    Available {
        /// Only engineers carrying this skill tag.
        #[arg(long)]
        skill: Option<String>,
    },
    /// End every active allocation of an engineer (move to bench).
    End { engineer_id: String },
    /// Active and available capacity of an engineer.
    Capacity { engineer_id: String },
    /// Allocation history for an engineer or a project.
    History(HistoryArgs),
    /// Engineer details with active assignments.
    Engineer { engineer_id: String },
    /// Project details with active assignments.
    Project { project_id: String },
    /// Every allocation with its CURRENT/PAST state.
    Overview,
}

#[derive(Debug, Args)]
struct AllocateArgs {
    engineer_id: String,
    project_id: String,
    #[arg(allow_negative_numbers = true)]
    percentage: i64,
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    allocation_id: String,
    #[arg(long, allow_negative_numbers = true)]
    percentage: Option<i64>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct HistoryArgs {
    #[arg(long)]
    engineer: Option<String>,
    #[arg(long)]
    project: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli);

    let backend = StoreBackend::resolve(cli.data_dir.clone(), cli.db.clone());
    match &cli.command {
        Command::Init => {
            let result = init_store(&backend);
            return finish(cli.json, result, |_| {
                format!("Initialized {} store.", backend.label())
            });
        }
        Command::Import { from } => {
            let result = import_json(&backend, from);
            return finish(cli.json, result, |count| {
                format!("Imported {count} allocation(s) from `{}`.", from.display())
            });
        }
        _ => {}
    }

    let store = match open_store(&backend) {
        Ok(store) => store,
        Err(err) => return finish::<()>(cli.json, Err(err.into()), |_| String::new()),
    };
    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut engine = AllocationEngine::with_clock(store, FixedClock(today));

    run(&mut engine, cli.command, cli.json)
}

fn run<S: EntityStore>(
    engine: &mut AllocationEngine<S, FixedClock>,
    command: Command,
    json: bool,
) -> ExitCode {
    match command {
        Command::Init | Command::Import { .. } => ExitCode::SUCCESS,
        Command::Engineers => finish(json, engine.list_engineers(), |e| render::engineers(e)),
        Command::Projects => finish(json, engine.list_projects(), |p| render::projects(p)),
        Command::Allocate(args) => {
            let request = AllocateRequest {
                engineer_id: args.engineer_id,
                project_id: args.project_id,
                percentage: args.percentage,
                start_date: args.start,
                end_date: args.end,
            };
            finish(json, engine.allocate(&request), Outcome::message)
        }
        Command::Update(args) => {
            let update = AllocationUpdate {
                percentage: args.percentage.into(),
                start_date: args.start.into(),
                end_date: args.end.into(),
            };
            finish(
                json,
                engine.update(&args.allocation_id, &update),
                Outcome::message,
            )
        }
        Command::Bench => finish(json, engine.bench(), |e| render::bench(e)),
        Command::Available { skill } => finish(
            json,
            engine.available_engineers(skill.as_deref()),
            |summaries| render::available(summaries, skill.as_deref()),
        ),
        Command::End { engineer_id } => {
            finish(json, engine.end_allocations(&engineer_id), Outcome::message)
        }
        Command::Capacity { engineer_id } => {
            let result = engine.active_capacity(&engineer_id).map(|active| {
                render::CapacityLine::new(engineer_id.clone(), active)
            });
            finish(json, result, render::CapacityLine::to_string)
        }
        Command::History(args) => {
            let key = match (args.engineer, args.project) {
                (Some(engineer_id), _) => HistoryKey::Engineer(engineer_id),
                (None, Some(project_id)) => HistoryKey::Project(project_id),
                (None, None) => {
                    eprintln!("history needs --engineer or --project");
                    return ExitCode::FAILURE;
                }
            };
            finish(json, engine.history(key), render::history)
        }
        Command::Engineer { engineer_id } => finish(
            json,
            engine.engineer_summary(&engineer_id),
            render::engineer_summary,
        ),
        Command::Project { project_id } => finish(
            json,
            engine.project_summary(&project_id),
            render::project_summary,
        ),
        Command::Overview => finish(json, engine.overview(), |rows| render::overview(rows)),
    }
}

fn setup_logging(cli: &Cli) {
    let Some(log_dir) = &cli.log_dir else {
        return;
    };
    let log_dir = absolute_path(log_dir);
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    match init_logging(level, &log_dir.to_string_lossy()) {
        Ok(()) => info!(
            "event=cli_start module=cli status=ok version={}",
            capacity_core::core_version()
        ),
        Err(err) => eprintln!("warning: logging disabled: {err}"),
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn init_store(backend: &StoreBackend) -> EngineResult<()> {
    match backend {
        StoreBackend::Json { data_dir } => JsonFileStore::init(data_dir.clone()).map(|_| ())?,
        StoreBackend::Sqlite { db_path } => SqliteEntityStore::open(db_path).map(|_| ())?,
    }
    Ok(())
}

fn import_json(backend: &StoreBackend, from: &Path) -> EngineResult<usize> {
    let StoreBackend::Sqlite { db_path } = backend else {
        return Err(StoreError::InvalidData(
            "import requires a SQLite target; pass --db".to_string(),
        )
        .into());
    };
    let source = JsonFileStore::new(from);
    let engineers = source.load_engineers()?;
    let projects = source.load_projects()?;
    let allocations = source.load_allocations()?;

    let mut target = SqliteEntityStore::open(db_path)?;
    target.replace_engineers(&engineers)?;
    target.replace_projects(&projects)?;
    target.save_allocations(&allocations)?;
    info!(
        "event=store_import module=cli status=ok engineers={} projects={} allocations={}",
        engineers.len(),
        projects.len(),
        allocations.len()
    );
    Ok(allocations.len())
}

/// Prints a result as text or as the JSON envelope and picks the exit code.
fn finish<T: Serialize>(
    json: bool,
    result: EngineResult<T>,
    describe: impl FnOnce(&T) -> String,
) -> ExitCode {
    let response = respond(result, describe);

    if json {
        match serde_json::to_string_pretty(&response) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("failed to encode response: {err}"),
        }
    } else if response.ok {
        println!("{}", response.message.trim_end());
    } else {
        eprintln!("{}", response.message.trim_end());
    }

    ExitCode::from(exit_status(response.error_kind))
}

fn respond<T>(
    result: EngineResult<T>,
    describe: impl FnOnce(&T) -> String,
) -> ActionResponse<T> {
    match result {
        Ok(value) => ActionResponse {
            ok: true,
            message: describe(&value),
            error_kind: None,
            payload: Some(value),
        },
        Err(err) => {
            if err.kind() == ErrorKind::Storage {
                error!("event=cli_command module=cli status=error error={err}");
            }
            ActionResponse {
                ok: false,
                message: err.to_string(),
                error_kind: Some(err.kind()),
                payload: None,
            }
        }
    }
}

/// 0 on success, 2 for storage failures, 1 for every other rejection.
fn exit_status(error_kind: Option<ErrorKind>) -> u8 {
    match error_kind {
        None => 0,
        Some(ErrorKind::Storage) => 2,
        Some(_) => 1,
    }
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    capacity_core::parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got `{value}`"))
}
