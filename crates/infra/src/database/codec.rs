//! Conversions between SQLite column text and domain values.
//!
//! Dates are stored as `YYYY-MM-DD`, times as `HH:MM`, timestamps as unix
//! seconds. A malformed stored value is a database error, not a silent skip.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use roundtable_domain::{Result, RoundtableError, Weekday};
use uuid::Uuid;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M";

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn encode_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| RoundtableError::Database(format!("invalid stored uuid '{value}': {err}")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| RoundtableError::Database(format!("invalid stored date '{value}': {err}")))
}

pub(crate) fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|err| RoundtableError::Database(format!("invalid stored time '{value}': {err}")))
}

pub(crate) fn parse_weekday(value: &str) -> Result<Weekday> {
    value
        .parse::<Weekday>()
        .map_err(|err| RoundtableError::Database(format!("invalid stored weekday: {err}")))
}

pub(crate) fn parse_timestamp(value: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(value, 0)
        .ok_or_else(|| RoundtableError::Database(format!("invalid stored timestamp {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_and_time_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(parse_date(&encode_date(date)).unwrap(), date);

        let time = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(encode_time(time), "18:00");
        assert_eq!(parse_time("18:00").unwrap(), time);
    }

    #[test]
    fn malformed_values_surface_as_database_errors() {
        assert!(matches!(parse_date("05.06.2024"), Err(RoundtableError::Database(_))));
        assert!(matches!(parse_time("6pm"), Err(RoundtableError::Database(_))));
        assert!(matches!(parse_uuid("not-a-uuid"), Err(RoundtableError::Database(_))));
        assert!(matches!(parse_weekday("Someday"), Err(RoundtableError::Database(_))));
    }
}
