//! Recurring weekly time slots and the typed weekday they recur on.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, RoundtableError};

/// Day of the week with the canonical Monday-first ordering.
///
/// Replaces the ad-hoc string ordering the storage layer would otherwise
/// need; derived `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Capitalized English name, as rendered in user-facing messages.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Weekday of a concrete calendar date.
    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            _ => Err(format!("Invalid Weekday: {}", s)),
        }
    }
}

/// A weekly-recurring bookable time window scoped to a city.
///
/// Slots are deactivated rather than deleted so historical applications and
/// meetings keep a valid reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSlot {
    pub id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub city: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl RecurringSlot {
    /// Create a slot after validating the time window.
    pub fn new(
        day_of_week: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        city: impl Into<String>,
    ) -> Result<Self> {
        // Overnight wrap (end before start) is deliberately rejected; meetings
        // assume a same-day end.
        if start_time >= end_time {
            return Err(RoundtableError::Validation(format!(
                "slot start {start_time} must be before end {end_time}"
            )));
        }

        let city = city.into();
        if city.trim().is_empty() {
            return Err(RoundtableError::Validation("slot city must not be empty".into()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            day_of_week,
            start_time,
            end_time,
            city,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Human-readable label, e.g. `Wednesday 18:00-19:00`.
    pub fn label(&self) -> String {
        format!(
            "{} {}-{}",
            self.day_of_week,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}
