use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use aircon_engine::config::DEFAULT_UTC_OFFSET_MINUTES;
use aircon_engine::kv::FileKv;
use aircon_engine::ports::ScheduleStore;
use aircon_engine::schedule::{fill_with_default, listing_window, validate_edit};
use aircon_engine::store::ScheduleRepository;
use aircon_engine::{ArrivalTime, ScheduleConfig, ScheduleEntry};

/// Edit the per-day arrival schedule stored in the data file.
#[derive(Parser)]
#[command(name = "aircon-schedule", version)]
struct Cli {
    #[arg(long, env = "DATA_FILE")]
    data_file: PathBuf,

    #[arg(long, env = "DEFAULT_ARRIVED_HOME__HOUR", default_value_t = 20)]
    default_arrival_hour: u32,

    #[arg(long, env = "DEFAULT_ARRIVED_HOME__MINUTE", default_value_t = 0)]
    default_arrival_minute: u32,

    #[arg(long, env = "UTC_OFFSET_MINUTES", default_value_t = DEFAULT_UTC_OFFSET_MINUTES, allow_negative_numbers = true)]
    utc_offset_minutes: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Every day from today to the end of the listing window.
    List,
    Show { date: NaiveDate },
    Set {
        date: NaiveDate,
        hour: u32,
        minute: u32,
        #[arg(long)]
        disabled: bool,
    },
    /// Drop the stored record so the day uses the default again.
    Reset { date: NaiveDate },
}

fn print_entry(entry: &ScheduleEntry) {
    let status = match (entry.schedule.disabled, entry.is_default) {
        (true, _) => "disabled",
        (false, true) => "default",
        (false, false) => "",
    };
    println!(
        "{} {} {}",
        entry.date.format("%Y-%m-%d %a"),
        entry.schedule.arrival,
        status
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_arrival = ArrivalTime::new(cli.default_arrival_hour, cli.default_arrival_minute)
        .context("invalid default arrival")?;
    let offset = chrono::FixedOffset::east_opt(cli.utc_offset_minutes.saturating_mul(60))
        .context("invalid UTC offset")?;
    let today = Utc::now().with_timezone(&offset).date_naive();
    let schedules = ScheduleRepository::new(Arc::new(FileKv::new(&cli.data_file)));

    match cli.command {
        Command::List => {
            let (start, end) = listing_window(today);
            let stored: BTreeMap<_, _> = schedules.list(start, end).await?.into_iter().collect();
            for entry in fill_with_default(start, end, &stored, default_arrival) {
                print_entry(&entry);
            }
        }
        Command::Show { date } => {
            let entry = match schedules.get(date).await? {
                Some(schedule) => ScheduleEntry { date, schedule, is_default: false },
                None => ScheduleEntry {
                    date,
                    schedule: ScheduleConfig::enabled_at(default_arrival),
                    is_default: true,
                },
            };
            print_entry(&entry);
        }
        Command::Set { date, hour, minute, disabled } => {
            let schedule = ScheduleConfig {
                arrival: ArrivalTime::new(hour, minute)?,
                disabled,
            };
            validate_edit(today, date, &schedule)?;
            schedules.set(date, schedule).await?;
            println!("Set {} -> {}{}", date, schedule.arrival, if disabled { " (disabled)" } else { "" });
        }
        Command::Reset { date } => {
            schedules.reset(date).await?;
            println!("Reset {}", date);
        }
    }
    Ok(())
}
