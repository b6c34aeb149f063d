//! Calendar helpers: readable date strings, weekday names, weekday arithmetic.
//!
//! Stored documents use the German readable form `dd.mm.yyyy` for
//! cancellations and date-keyed absences, and German weekday names
//! (`"Montag"` ... `"Freitag"`) for weekday buckets and weekday absences.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{EngineError, Result};

const READABLE_FORMAT: &str = "%d.%m.%Y";
const ISO_FORMAT: &str = "%Y-%m-%d";

/// Format a date as `dd.mm.yyyy`.
pub fn to_readable(date: NaiveDate) -> String {
    date.format(READABLE_FORMAT).to_string()
}

/// Parse a `dd.mm.yyyy` date.
pub fn parse_readable(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), READABLE_FORMAT)
        .map_err(|_| EngineError::InvalidDate(value.to_string()))
}

/// Parse any date form found in stored documents.
///
/// Accepts `dd.mm.yyyy`, `yyyy-mm-dd`, and RFC 3339 instants. Instants are
/// converted into `tz` before the time of day is dropped, so an instant
/// written as local midnight lands on the intended calendar day.
pub fn parse_date(value: &str, tz: Tz) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.contains('.') && !trimmed.contains('T') {
        return parse_readable(trimmed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|instant| instant.with_timezone(&tz).date_naive())
        .map_err(|_| EngineError::InvalidDate(value.to_string()))
}

/// Convert epoch milliseconds into a calendar date in `tz`.
pub fn date_from_millis(millis: i64, tz: Tz) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|instant| instant.with_timezone(&tz).date_naive())
        .ok_or_else(|| EngineError::InvalidDate(millis.to_string()))
}

/// Epoch milliseconds of UTC midnight on `date`.
pub fn millis_from_date(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// The current calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// German weekday name as stored in documents.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

fn weekday_abbreviation(weekday: Weekday) -> &'static str {
    &weekday_name(weekday)[..2]
}

/// Parse a weekday name. German names are canonical; English names and
/// abbreviations are accepted as well.
pub fn parse_weekday(value: &str) -> Result<Weekday> {
    let trimmed = value.trim();
    let german = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .find(|weekday| weekday_name(*weekday).eq_ignore_ascii_case(trimmed));

    match german {
        Some(weekday) => Ok(weekday),
        None => trimmed
            .parse::<Weekday>()
            .map_err(|_| EngineError::InvalidWeekday(value.to_string())),
    }
}

/// Human-readable form used in listings, e.g. `"Mo, 19.10.2026"`.
pub fn to_display(date: NaiveDate) -> String {
    format!(
        "{}, {}",
        weekday_abbreviation(date.weekday()),
        to_readable(date)
    )
}

/// The first date on or after `date` falling on `weekday`.
pub fn first_on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - date.weekday().num_days_from_monday() as i64)
        % 7;
    date + Duration::days(ahead)
}

/// Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Serde adapter storing a `chrono::Weekday` under its German name.
pub mod weekday_serde {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        weekday: &Weekday,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_name(*weekday))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_weekday(&raw).map_err(serde::de::Error::custom)
    }
}
