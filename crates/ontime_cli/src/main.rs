//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `ontime_core` end to end: open storage, add appointments,
//!   print one listing page and the audit history.
//! - Keep output deterministic enough for quick local sanity checks.

use futures::executor::block_on;
use log::error;
use ontime_core::db::{open_db, open_db_in_memory};
use ontime_core::{
    init_logging_from_config, Appointment, AppointmentService, ClassificationRepository,
    ClassificationTypes, CoreConfig, HistoryService, SqliteAppointmentRepository,
    SqliteAuditRepository, SqliteClassificationRepository,
};
use std::error::Error;
use std::process::ExitCode;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const DEMO_START_MS: i64 = 1_767_225_600_000;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("ontime: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    let conn = match config.db_path.as_ref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let appointments = SqliteAppointmentRepository::try_new(&conn)?;
    let classifications = SqliteClassificationRepository::try_new(&conn)?;
    let initial = classifications
        .get_classification_by_name(ClassificationTypes::initial())?
        .ok_or("initial classification is missing from the registry")?;
    let service = AppointmentService::from_config(appointments, classifications, &config);
    let history = HistoryService::new(SqliteAuditRepository::try_new(&conn)?);

    println!("ontime_core version={}", ontime_core::core_version());

    if config.db_path.is_none() {
        for day in 0..5 {
            let mut appointment = Appointment::new(
                format!("Check-up #{}", day + 1),
                DEMO_START_MS + day * DAY_MS,
                initial.id,
            );
            appointment.reason = Some("routine".to_string());
            service.add_appointment(&appointment)?;
        }
    }

    for classification in service.classification_names()? {
        println!("classification={classification}");
    }

    let listing = block_on(service.list_page(&initial.name, None, Some(1)))?;
    println!(
        "page={}/{} total_items={}",
        listing.pagination.current_page,
        listing.pagination.total_pages,
        listing.pagination.total_items
    );
    for appointment in &listing.items {
        println!(
            "appointment id={} at={} objective={}",
            appointment.id, appointment.appointment_at, appointment.objective
        );
    }

    let records = block_on(history.history())?;
    println!("history_records={}", records.records.len());
    Ok(())
}
