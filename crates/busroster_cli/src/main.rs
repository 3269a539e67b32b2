//! `busroster` command-line front end.
//!
//! # Responsibility
//! - Parse arguments and dispatch each subcommand to one `busroster_api`
//!   handler.
//! - Print the handler envelope as JSON (or raw CSV for exports).
//!
//! Exit status is non-zero whenever the envelope reports `ok: false`.

use busroster_api::{
    BusRosterApi, DriverInput, DriverUpdate, ReportRequest, StudentInput, StudentUpdate,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_LEVEL_ENV: &str = "BUSROSTER_LOG_LEVEL";
const LOG_DIR_ENV: &str = "BUSROSTER_LOG_DIR";

#[derive(Debug, Parser)]
#[command(name = "busroster", version, about = "School-bus roster and daily assignment ledger")]
struct Cli {
    /// Database file (defaults to BUSROSTER_DB_PATH, then the temp dir).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level; logging stays off unless a log directory is known.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert the demo roster into an empty database.
    Seed,
    #[command(subcommand)]
    Student(StudentCommand),
    #[command(subcommand)]
    Driver(DriverCommand),
    /// Replace the students riding with a driver on a date.
    Assign {
        date: String,
        driver_id: String,
        student_ids: Vec<String>,
        #[arg(long)]
        trip: Option<String>,
    },
    /// Show the students riding with a driver on a date.
    Show {
        date: String,
        driver_id: String,
        /// Omit to merge both legs.
        #[arg(long)]
        trip: Option<String>,
    },
    /// Clear a driver's assignments on a date.
    Clear {
        date: String,
        driver_id: String,
        /// Omit to clear both legs.
        #[arg(long)]
        trip: Option<String>,
    },
    /// Distinct days a student was assigned.
    Attendance {
        student_id: String,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Student report with fee and attendance columns.
    Report {
        #[command(flatten)]
        filter: ReportArgs,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Per-driver seat sheet for a date (today by default).
    Sheet {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        trip: Option<String>,
    },
    /// Overview counters for a date (today by default).
    Dashboard {
        #[arg(long)]
        date: Option<String>,
    },
    /// Students with a stored location.
    Map,
    /// Print core version and health check.
    Version,
}

#[derive(Debug, Subcommand)]
enum StudentCommand {
    Add(StudentFields),
    List,
    Update {
        student_id: String,
        #[command(flatten)]
        fields: StudentEdit,
    },
    Remove {
        student_id: String,
    },
    /// Mark fees as paid in full, or reset with `--unpaid`.
    Paid {
        student_id: String,
        #[arg(long)]
        unpaid: bool,
    },
    /// Add a payment in minor currency units.
    Payment {
        student_id: String,
        amount: i64,
    },
}

#[derive(Debug, Args)]
struct StudentFields {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long, default_value_t = 0)]
    fees_total: i64,
    #[arg(long, default_value_t = 0)]
    fees_paid: i64,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Debug, Args)]
struct StudentEdit {
    #[arg(long)]
    name: Option<String>,
    /// Empty string clears the area.
    #[arg(long)]
    area: Option<String>,
    /// Empty string clears the phone.
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    clear_location: bool,
    #[arg(long)]
    fees_total: Option<i64>,
    #[arg(long)]
    fees_paid: Option<i64>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Debug, Subcommand)]
enum DriverCommand {
    Add(DriverFields),
    List,
    Update {
        driver_id: String,
        #[command(flatten)]
        fields: DriverEdit,
    },
    Remove {
        driver_id: String,
    },
}

#[derive(Debug, Args)]
struct DriverFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    vehicle: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    capacity: Option<u32>,
    #[arg(long)]
    service_area: Option<String>,
}

#[derive(Debug, Args)]
struct DriverEdit {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    vehicle: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    capacity: Option<u32>,
    #[arg(long)]
    service_area: Option<String>,
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Case-insensitive match on name or student id.
    #[arg(long)]
    text: Option<String>,
    /// any | paid | unpaid
    #[arg(long)]
    payment: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(message) = start_logging(cli.log_level.as_deref(), cli.log_dir.as_deref()) {
        eprintln!("busroster: logging disabled: {message}");
    }

    let api = match cli.db {
        Some(path) => BusRosterApi::with_db_path(path),
        None => BusRosterApi::from_env(),
    };
    run(&api, cli.command)
}

/// Returns a message when logging was requested but could not start.
fn start_logging(level: Option<&str>, dir: Option<&str>) -> Option<String> {
    let dir = dir
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_DIR_ENV).ok())
        .filter(|value| !value.trim().is_empty())?;
    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
        .unwrap_or_else(|| busroster_core::default_log_level().to_string());

    let error = busroster_api::init_logging(&level, &dir);
    (!error.is_empty()).then_some(error)
}

fn run(api: &BusRosterApi, command: Command) -> ExitCode {
    match command {
        Command::Seed => emit(&api.on_seed(), |r| r.ok),
        Command::Student(command) => run_student(api, command),
        Command::Driver(command) => run_driver(api, command),
        Command::Assign {
            date,
            driver_id,
            student_ids,
            trip,
        } => emit(
            &api.on_set_assignment(&date, &driver_id, trip.as_deref(), &student_ids),
            |r| r.ok,
        ),
        Command::Show {
            date,
            driver_id,
            trip,
        } => emit(
            &api.on_get_assignment(&date, &driver_id, trip.as_deref()),
            |r| r.ok,
        ),
        Command::Clear {
            date,
            driver_id,
            trip,
        } => emit(
            &api.on_clear_assignment(&date, &driver_id, trip.as_deref()),
            |r| r.ok,
        ),
        Command::Attendance {
            student_id,
            from,
            to,
        } => emit(
            &api.on_attendance(&student_id, from.as_deref(), to.as_deref()),
            |r| r.ok,
        ),
        Command::Report { filter, format } => {
            let request = ReportRequest {
                text: filter.text,
                payment: filter.payment,
                status: filter.status,
            };
            match format {
                ReportFormat::Json => emit(&api.on_student_report(request), |r| r.ok),
                ReportFormat::Csv => {
                    let response = api.on_export_report_csv(request);
                    if let (true, Some(csv)) = (response.ok, response.data.as_deref()) {
                        print!("{csv}");
                        return ExitCode::SUCCESS;
                    }
                    emit(&response, |r| r.ok)
                }
            }
        }
        Command::Sheet { date, trip } => emit(
            &api.on_daily_sheet(date.as_deref(), trip.as_deref()),
            |r| r.ok,
        ),
        Command::Dashboard { date } => emit(&api.on_dashboard(date.as_deref()), |r| r.ok),
        Command::Map => emit(&api.on_map_points(), |r| r.ok),
        Command::Version => {
            println!("busroster ping={}", busroster_api::ping());
            println!("busroster version={}", busroster_api::core_version());
            println!("busroster db={}", api.db_path().display());
            ExitCode::SUCCESS
        }
    }
}

fn run_student(api: &BusRosterApi, command: StudentCommand) -> ExitCode {
    match command {
        StudentCommand::Add(fields) => {
            let input = StudentInput {
                student_id: fields.id,
                name: fields.name,
                area: fields.area,
                phone: fields.phone,
                lat: fields.lat,
                lon: fields.lon,
                fees_total: fields.fees_total,
                fees_paid: fields.fees_paid,
                status: fields.status,
            };
            emit(&api.on_add_student(input), |r| r.ok)
        }
        StudentCommand::List => emit(&api.on_list_students(), |r| r.ok),
        StudentCommand::Update { student_id, fields } => {
            let update = StudentUpdate {
                name: fields.name,
                area: fields.area,
                phone: fields.phone,
                lat: fields.lat,
                lon: fields.lon,
                clear_location: fields.clear_location,
                fees_total: fields.fees_total,
                fees_paid: fields.fees_paid,
                status: fields.status,
            };
            emit(&api.on_update_student(&student_id, update), |r| r.ok)
        }
        StudentCommand::Remove { student_id } => {
            emit(&api.on_remove_student(&student_id), |r| r.ok)
        }
        StudentCommand::Paid { student_id, unpaid } => {
            emit(&api.on_set_payment_status(&student_id, !unpaid), |r| r.ok)
        }
        StudentCommand::Payment { student_id, amount } => {
            emit(&api.on_record_payment(&student_id, amount), |r| r.ok)
        }
    }
}

fn run_driver(api: &BusRosterApi, command: DriverCommand) -> ExitCode {
    match command {
        DriverCommand::Add(fields) => {
            let input = DriverInput {
                driver_id: None,
                name: fields.name,
                vehicle: fields.vehicle,
                phone: fields.phone,
                capacity: fields.capacity,
                service_area: fields.service_area,
            };
            emit(&api.on_add_driver(input), |r| r.ok)
        }
        DriverCommand::List => emit(&api.on_list_drivers(), |r| r.ok),
        DriverCommand::Update { driver_id, fields } => {
            let update = DriverUpdate {
                name: fields.name,
                vehicle: fields.vehicle,
                phone: fields.phone,
                capacity: fields.capacity,
                service_area: fields.service_area,
            };
            emit(&api.on_update_driver(&driver_id, update), |r| r.ok)
        }
        DriverCommand::Remove { driver_id } => emit(&api.on_remove_driver(&driver_id), |r| r.ok),
    }
}

fn emit<T: Serialize>(response: &T, ok: impl Fn(&T) -> bool) -> ExitCode {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("busroster: failed to render response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if ok(response) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, ReportFormat, StudentCommand};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assign_collects_student_ids_and_trip() {
        let cli = Cli::parse_from([
            "busroster",
            "--db",
            "/tmp/roster.sqlite3",
            "assign",
            "2026-01-10",
            "6f1c2a51-0000-4000-8000-000000000001",
            "101",
            "102",
            "--trip",
            "return",
        ]);
        assert_eq!(
            cli.db.as_deref(),
            Some(std::path::Path::new("/tmp/roster.sqlite3"))
        );
        match cli.command {
            Command::Assign {
                student_ids, trip, ..
            } => {
                assert_eq!(student_ids, vec!["101", "102"]);
                assert_eq!(trip.as_deref(), Some("return"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_defaults_to_json() {
        let cli = Cli::parse_from(["busroster", "report", "--payment", "unpaid"]);
        match cli.command {
            Command::Report { filter, format } => {
                assert_eq!(format, ReportFormat::Json);
                assert_eq!(filter.payment.as_deref(), Some("unpaid"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn paid_flag_defaults_to_marking_paid() {
        let cli = Cli::parse_from(["busroster", "student", "paid", "101"]);
        assert!(matches!(
            cli.command,
            Command::Student(StudentCommand::Paid { unpaid: false, .. })
        ));
    }

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::parse_from([
            "busroster", "student", "add", "--id", "7", "--name", "A", "--lat", "-33.9", "--lon",
            "18.4",
        ]);
        match cli.command {
            Command::Student(StudentCommand::Add(fields)) => {
                assert_eq!(fields.lat, Some(-33.9));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
