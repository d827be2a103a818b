use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use termin::booking::BookingService;
use termin::config::Config;
use termin::storage::SqliteBookingRepository;

/// Parameters of the availability command
#[derive(Debug)]
pub struct AvailabilityParams {
    pub profile: String,
    pub service: String,
    pub date: String,
    pub staff: Option<String>,
    pub json: bool,
}

fn open_service(config: &Config) -> Result<BookingService> {
    let store = SqliteBookingRepository::new(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open database: {}",
            config.database.sqlite_path.display()
        )
    })?;
    Ok(BookingService::new(Arc::new(store), config))
}

/// Print the slots of a service on a date
pub fn availability(config: &Config, params: AvailabilityParams) -> Result<()> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}. Expected YYYY-MM-DD", params.date))?;

    let service = open_service(config)?;
    let slots = service.availability(
        &params.profile,
        &params.service,
        date,
        params.staff.as_deref(),
    )?;

    if params.json {
        println!("{}", serde_json::to_string_pretty(&slots)?);
        return Ok(());
    }

    println!("Availability for {} / {} on {date}", params.profile, params.service);
    println!("{:-<44}", "");
    if slots.is_empty() {
        println!("  (no slots)");
    }
    for slot in &slots {
        println!(
            "  {}-{}  {:<10} {}",
            slot.start,
            slot.end,
            slot.status.as_str(),
            slot.staff_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Print the blocked and taken days of a profile
pub fn unavailable_days(config: &Config, profile: &str) -> Result<()> {
    let service = open_service(config)?;
    let days = service.unavailable_days(profile)?;

    println!("Unavailable days for {profile}: {}", days.len());
    for day in days {
        println!("  {day}");
    }
    Ok(())
}

/// Run one expiry sweep
pub(crate) fn expire(config: &Config) -> Result<usize> {
    let service = open_service(config)?;
    Ok(service.expire_stale()?)
}
