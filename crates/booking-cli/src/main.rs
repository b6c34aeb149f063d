//! `booking` CLI: query and maintain a practice's schedule document.
//!
//! ## Usage
//!
//! ```sh
//! # Free 30-minute morning slots for Anna with therapist t1
//! booking suggest -i schedule.json --patient Anna --therapist t1 --duration 30 \
//!     --time-of-day timeframe1 --from 2026-10-19 --to 2026-10-23
//!
//! # Is t1 free of absences on a given slot?
//! booking available -i schedule.json --therapist t1 --date 19.10.2026 --start 9:00 --end 9:30
//!
//! # Everything blocking a proposed single appointment
//! booking conflicts -i schedule.json --therapist t1 --date 2026-10-19 --start 9:00 --end 9:30
//!
//! # Single appointments a new weekly series would run into
//! booking series-conflicts -i schedule.json --therapist t1 --weekday Montag \
//!     --start 10:00 --end 10:30 --from 2026-10-19 --to 2027-03-29
//!
//! # A patient's upcoming appointments
//! booking patient -i schedule.json --name Anna
//!
//! # Rewrite a document in canonical form (stdin -> stdout)
//! cat schedule.json | booking normalize
//! ```

mod store;

use std::path::PathBuf;

use anyhow::{Context, Result};
use booking_engine::appointment::{AppointmentDetails, AppointmentId, SeriesAppointment, SingleAppointment};
use booking_engine::dates;
use booking_engine::slot::{self, Slot, TimeValue};
use booking_engine::suggest::{DateRange, SuggestionRequest, TimeOfDay};
use booking_engine::{EngineConfig, Schedule};
use chrono::{NaiveDate, Weekday};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::store::JsonFileStore;

#[derive(Parser)]
#[command(
    name = "booking",
    version,
    about = "Appointment availability and conflict queries for a therapy practice"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override today's date (yyyy-mm-dd or dd.mm.yyyy)
    #[arg(long, global = true, value_parser = parse_day)]
    today: Option<NaiveDate>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List free slots for a patient
    Suggest {
        /// Schedule document (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        patient: String,
        /// Therapist id; repeat for several therapists
        #[arg(long = "therapist", required = true)]
        therapists: Vec<String>,
        /// Appointment length in minutes, a multiple of 10
        #[arg(long)]
        duration: u32,
        /// any, timeframe1, timeframe2 or timeframe3
        #[arg(long, default_value = "any")]
        time_of_day: TimeOfDay,
        /// Number of appointments to be booked
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// First day searched (defaults to tomorrow)
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,
        /// Last day searched
        #[arg(long, value_parser = parse_day)]
        to: Option<NaiveDate>,
    },
    /// Check a therapist's absences for one slot
    Available {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        therapist: String,
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_slot)]
        start: Slot,
        #[arg(long, value_parser = parse_slot)]
        end: Slot,
    },
    /// Report everything blocking a proposed single appointment
    Conflicts {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        therapist: String,
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_slot)]
        start: Slot,
        #[arg(long, value_parser = parse_slot)]
        end: Slot,
        /// Id of the appointment being edited, excluded from the result
        #[arg(long)]
        id: Option<String>,
    },
    /// List single appointments a proposed series would run into
    SeriesConflicts {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        therapist: String,
        /// German or English weekday name
        #[arg(long, value_parser = parse_weekday)]
        weekday: Weekday,
        #[arg(long, value_parser = parse_slot)]
        start: Slot,
        #[arg(long, value_parser = parse_slot)]
        end: Slot,
        #[arg(long, value_parser = parse_day)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_day)]
        to: NaiveDate,
        /// Recurrence interval in weeks
        #[arg(long, default_value_t = 1)]
        interval: u32,
    },
    /// List a patient's appointments for the coming year
    Patient {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        name: String,
    },
    /// Print the time grid
    Labels,
    /// Load a document and write it back in canonical form
    Normalize {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Suggest {
            input,
            output,
            patient,
            therapists,
            duration,
            time_of_day,
            count,
            from,
            to,
        } => {
            let schedule = load(input, config)?;
            let today = cli.today.unwrap_or_else(|| schedule.today());
            let request = SuggestionRequest {
                patient,
                therapist_ids: therapists,
                appointment_count: count,
                duration_minutes: duration,
                time_of_day,
                date_range: DateRange { start: from, end: to },
            };
            let suggestions = schedule.find_suggestions(&request, today);
            debug!(found = suggestions.len(), "suggestions computed");
            write_json(output, &suggestions)?;
        }
        Commands::Available {
            input,
            therapist,
            date,
            start,
            end,
        } => {
            let schedule = load(input, config)?;
            let available = schedule.is_available(&therapist, date, start, end);
            write_json(
                None,
                &json!({
                    "therapist": therapist,
                    "date": date,
                    "start": start,
                    "end": end,
                    "available": available,
                }),
            )?;
        }
        Commands::Conflicts {
            input,
            therapist,
            date,
            start,
            end,
            id,
        } => {
            let schedule = load(input, config)?;
            let details = AppointmentDetails::new("", therapist, "", start, end)
                .context("Invalid appointment")?;
            let mut candidate = SingleAppointment::new(date, details);
            if let Some(id) = id {
                candidate = candidate.with_id(AppointmentId::new(id));
            }
            write_json(None, &schedule.check_booking(&candidate))?;
        }
        Commands::SeriesConflicts {
            input,
            therapist,
            weekday,
            start,
            end,
            from,
            to,
            interval,
        } => {
            let schedule = load(input, config)?;
            let today = cli.today.unwrap_or_else(|| schedule.today());
            let details = AppointmentDetails::new("", therapist, "", start, end)
                .context("Invalid appointment")?;
            let series = SeriesAppointment::new(details, weekday, interval, from, to)
                .context("Invalid series")?;
            write_json(None, &schedule.series_conflicts(&series, today))?;
        }
        Commands::Patient { input, name } => {
            let schedule = load(input, config)?;
            let today = cli.today.unwrap_or_else(|| schedule.today());
            write_json(None, &schedule.appointments_for_patient(&name, today))?;
        }
        Commands::Labels => {
            for (index, label) in slot::all_labels().into_iter().skip(1).enumerate() {
                println!("{}\t{}", index, label);
            }
        }
        Commands::Normalize { input, output } => {
            let store = JsonFileStore::new(input, output);
            let mut schedule =
                Schedule::load(&store, config).context("Failed to load schedule")?;
            schedule.save(&store).context("Failed to write schedule")?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(input: Option<PathBuf>, config: EngineConfig) -> Result<Schedule> {
    Schedule::load(&JsonFileStore::new(input, None), config).context("Failed to load schedule")
}

fn write_json(path: Option<PathBuf>, value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match path {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

fn parse_day(value: &str) -> std::result::Result<NaiveDate, String> {
    if value.contains('.') {
        dates::parse_readable(value).map_err(|e| e.to_string())
    } else {
        value
            .parse::<NaiveDate>()
            .map_err(|e| format!("{}: {}", value, e))
    }
}

fn parse_slot(value: &str) -> std::result::Result<Slot, String> {
    let time = match value.parse::<u16>() {
        Ok(index) => TimeValue::Index(index),
        Err(_) => TimeValue::Label(value.to_string()),
    };
    time.normalize().map_err(|e| e.to_string())
}

fn parse_weekday(value: &str) -> std::result::Result<Weekday, String> {
    dates::parse_weekday(value).map_err(|e| e.to_string())
}
