//! Disaster sensing daemon.
//!
//! ## Usage
//!
//! ```bash
//! # Run the monitor with defaults (5 s ticks, synthetic sensors)
//! disaster_sense_service
//!
//! # Run with a config file, stop after 20 readings
//! disaster_sense_service run disaster_sense.toml --ticks 20
//!
//! # Ctrl-C (or SIGTERM) stops after the current tick, waits for alert
//! # emails still being sent, and logs the run summary.
//!
//! # Score a single reading
//! disaster_sense_service score 45 35 960
//!
//! # Write 150 synthetic rows to a CSV
//! disaster_sense_service generate data/sensor_data.csv 150
//! ```
//!
//! Alert delivery reads `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`,
//! `EMAILJS_USER_ID` and `ALERT_RECIPIENT` from the environment or `.env`.

use std::error::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use disaster_sense_service::alert::dispatch::AlertDispatcher;
use disaster_sense_service::alert::thresholds::{self, ThresholdScorer};
use disaster_sense_service::analysis::summary::{summarize, SummaryFilter};
use disaster_sense_service::config::{load_config, MonitorConfig, NotifyConfig};
use disaster_sense_service::ingest::csv;
use disaster_sense_service::ingest::synthetic::SyntheticSource;
use disaster_sense_service::logging::{self, Component};
use disaster_sense_service::model::{Reading, DISASTER_TYPES};
use disaster_sense_service::monitor::Monitor;
use disaster_sense_service::notify::emailjs::EmailJsNotifier;

const DEFAULT_GENERATE_ROWS: usize = 150;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => run(&[]),
        Some("run") => run(&args[1..]),
        Some("score") => score(&args[1..]),
        Some("generate") => generate(&args[1..]),
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        // A bare path or flag is shorthand for `run ...`.
        Some(_) => run(&args),
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  disaster_sense_service [run] [config.toml] [--ticks N]");
    println!("  disaster_sense_service score <temperature> <humidity> <pressure>");
    println!("  disaster_sense_service generate <path> [rows]");
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let mut config_path: Option<&str> = None;
    let mut max_ticks: Option<u64> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ticks" => {
                let value = iter.next().ok_or("--ticks needs a value")?;
                max_ticks = Some(value.parse().map_err(|_| format!("invalid --ticks value: {}", value))?);
            }
            path => config_path = Some(path),
        }
    }

    let config = match config_path {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };

    logging::init_logger(config.log_level(), config.log_file.as_deref(), true);
    logging::info(
        Component::Config,
        config_path,
        &format!(
            "tick every {}s, history {} readings, warning at {}, critical at {}",
            config.tick_interval_secs,
            config.history_capacity,
            config.severity.warning_at,
            config.severity.critical_at
        ),
    );

    let notify_config = NotifyConfig::from_env();
    let missing = notify_config.missing();
    if !missing.is_empty() {
        logging::warn(
            Component::Config,
            None,
            &format!("alerts will not be delivered; unset: {}", missing.join(", ")),
        );
    }
    let notifier = EmailJsNotifier::new(notify_config)?;
    let dispatcher = AlertDispatcher::new(Arc::new(notifier));

    let mut monitor = Monitor::new(
        Box::new(SyntheticSource::new()),
        Box::new(ThresholdScorer::new(config.severity)),
        dispatcher,
        config.history_capacity,
    );
    if let Some(path) = &config.log_csv {
        monitor = monitor.with_log_csv(path);
    }

    if let Some(path) = &config.seed_csv {
        match csv::load_readings(path) {
            Ok(readings) => {
                let added = monitor.seed(readings);
                logging::info(Component::Sensor, Some(path.as_str()), &format!("seeded {} readings", added));
            }
            Err(e) => logging::warn(Component::Sensor, Some(path.as_str()), &format!("seed skipped: {}", e)),
        }
    }

    let stop = monitor.stop_handle();
    ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;

    monitor.run(Duration::from_secs(config.tick_interval_secs), max_ticks);

    let dispatcher = monitor.dispatcher();
    if dispatcher.in_flight() > 0 {
        logging::info(
            Component::Dispatch,
            None,
            &format!("waiting for {} alert deliveries", dispatcher.in_flight()),
        );
    }
    if !dispatcher.drain(Duration::from_secs(config.drain_timeout_secs)) {
        logging::warn(
            Component::Dispatch,
            None,
            &format!(
                "{} alert deliveries still running after {}s; abandoning them",
                dispatcher.in_flight(),
                config.drain_timeout_secs
            ),
        );
    }

    let summary = summarize(monitor.history(), &SummaryFilter::default());
    let mut by_type: Vec<String> = DISASTER_TYPES
        .iter()
        .map(|t| format!("{}: {}", t, summary.count_for_type(t)))
        .collect();
    let unknown = summary.count_for_type("unknown");
    if unknown > 0 {
        by_type.push(format!("unknown: {}", unknown));
    }
    logging::info(
        Component::System,
        None,
        &format!("{} readings in history | {}", summary.total, by_type.join(" | ")),
    );
    logging::log_run_summary(monitor.ticks(), monitor.dispatcher().submitted(), monitor.history().len());

    Ok(())
}

// ---------------------------------------------------------------------------
// score
// ---------------------------------------------------------------------------

fn score(args: &[String]) -> Result<(), Box<dyn Error>> {
    if args.len() != 3 {
        print_usage();
        return Err("score needs <temperature> <humidity> <pressure>".into());
    }

    let mut values = [0.0f64; 3];
    for (slot, (raw, name)) in values.iter_mut().zip(args.iter().zip(["temperature", "humidity", "pressure"])) {
        *slot = raw.parse().map_err(|_| format!("invalid {}: {}", name, raw))?;
    }

    let reading = Reading::new(values[0], values[1], values[2]);
    let score = thresholds::score(&reading);
    println!("score: {:.2}", score);
    println!("label: {}", thresholds::label(score));
    Ok(())
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

fn generate(args: &[String]) -> Result<(), Box<dyn Error>> {
    let path = args.first().ok_or("generate needs an output path")?;
    let rows = match args.get(1) {
        Some(raw) => raw.parse().map_err(|_| format!("invalid row count: {}", raw))?,
        None => DEFAULT_GENERATE_ROWS,
    };

    let readings = SyntheticSource::new().generate_many(rows);
    csv::write_readings(path, &readings)?;
    println!("{} sensor rows written to {}", rows, path);
    Ok(())
}
