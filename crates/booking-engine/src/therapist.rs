//! Therapists and their absence/exception windows.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dates;
use crate::error::{EngineError, Result};
use crate::slot::Slot;

/// Lower bound standing in for "active since forever" (1980-01-01).
pub fn unbounded_since() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Upper bound standing in for "active until forever" (2080-01-01).
pub fn unbounded_until() -> NaiveDate {
    NaiveDate::from_ymd_opt(2080, 1, 1).unwrap_or(NaiveDate::MAX)
}

/// Which days a window applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaySelector {
    /// One calendar date, stored as `dd.mm.yyyy`.
    Date(NaiveDate),
    /// Every occurrence of a weekday, stored under its German name.
    Weekday(Weekday),
}

impl DaySelector {
    /// Parse a stored selector. Anything containing a `.` is a date.
    pub fn parse(value: &str) -> Result<Self> {
        if value.contains('.') {
            dates::parse_readable(value).map(DaySelector::Date)
        } else {
            dates::parse_weekday(value).map(DaySelector::Weekday)
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            DaySelector::Date(day) => *day == date,
            DaySelector::Weekday(weekday) => date.weekday() == *weekday,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, DaySelector::Date(_))
    }
}

impl fmt::Display for DaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaySelector::Date(date) => f.write_str(&dates::to_readable(*date)),
            DaySelector::Weekday(weekday) => f.write_str(dates::weekday_name(*weekday)),
        }
    }
}

impl Serialize for DaySelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DaySelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DaySelector::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A `[start, end)` window on the days picked by a [`DaySelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayWindow {
    pub day: DaySelector,
    pub start: Slot,
    pub end: Slot,
}

/// Time a therapist is away.
pub type Absence = DayWindow;
/// Time a therapist is explicitly present despite an absence.
pub type Exception = DayWindow;

impl DayWindow {
    /// # Errors
    /// Returns [`EngineError::InvalidRange`] unless `start < end`.
    pub fn new(day: DaySelector, start: Slot, end: Slot) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidRange {
                start: start.label(),
                end: end.label(),
            });
        }
        Ok(Self { day, start, end })
    }

    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.day.matches(date)
    }

    /// Half-open intersection with `[start, end)`.
    pub fn overlaps(&self, start: Slot, end: Slot) -> bool {
        self.start < end && self.end > start
    }

    pub fn covers(&self, start: Slot, end: Slot) -> bool {
        self.start <= start && self.end >= end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    pub id: String,
    pub name: String,
    pub active_since: NaiveDate,
    pub active_until: NaiveDate,
    pub absences: Vec<Absence>,
    pub exceptions: Vec<Exception>,
}

impl Therapist {
    /// A therapist active without bounds and with no absences.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active_since: unbounded_since(),
            active_until: unbounded_until(),
            absences: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.active_since <= date && date <= self.active_until
    }

    /// Replace every absence keyed by `day` with `absences`.
    ///
    /// Date-keyed absences older than `retention_months` before `today` are
    /// dropped, and identical weekday absences are collapsed.
    pub fn set_absences_for_day(
        &mut self,
        day: DaySelector,
        absences: Vec<Absence>,
        today: NaiveDate,
        retention_months: u32,
    ) {
        let mut merged: Vec<Absence> = self
            .absences
            .iter()
            .filter(|absence| absence.day != day)
            .copied()
            .collect();
        merged.extend(absences);
        let pruned = prune_old_absences(merged, today, retention_months);
        self.absences = dedupe_weekday_absences(pruned);
    }

    /// Replace every exception keyed by `day` with `exceptions`.
    pub fn set_exceptions_for_day(&mut self, day: DaySelector, exceptions: Vec<Exception>) {
        self.exceptions.retain(|exception| exception.day != day);
        self.exceptions.extend(exceptions);
    }
}

/// Drop date-keyed absences that ended more than `retention_months` ago.
/// Weekday absences are always kept.
pub fn prune_old_absences(
    absences: Vec<Absence>,
    today: NaiveDate,
    retention_months: u32,
) -> Vec<Absence> {
    let cutoff = today
        .checked_sub_months(Months::new(retention_months))
        .unwrap_or(NaiveDate::MIN);
    absences
        .into_iter()
        .filter(|absence| match absence.day {
            DaySelector::Date(date) => date >= cutoff,
            DaySelector::Weekday(_) => true,
        })
        .collect()
}

/// Collapse weekday absences with identical day and times, keeping the first.
pub fn dedupe_weekday_absences(absences: Vec<Absence>) -> Vec<Absence> {
    let mut unique: Vec<Absence> = Vec::with_capacity(absences.len());
    for absence in absences {
        if absence.day.is_date() || !unique.contains(&absence) {
            unique.push(absence);
        }
    }
    unique
}
