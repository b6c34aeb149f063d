//! Appointment entities.
//!
//! Both kinds of booking share [`AppointmentDetails`] and the [`Appointment`]
//! interval contract. A [`SingleAppointment`] lives on one calendar date; a
//! [`SeriesAppointment`] repeats on a weekday every `interval_weeks` weeks
//! inside its validity window, minus cancelled occurrences.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates;
use crate::error::{EngineError, Result};
use crate::slot::Slot;

/// Opaque handle used to target updates and deletions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(String);

impl AppointmentId {
    pub fn new(id: impl Into<String>) -> Self {
        AppointmentId(id.into())
    }

    pub fn generate() -> Self {
        AppointmentId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppointmentId {
    fn from(id: &str) -> Self {
        AppointmentId::new(id)
    }
}

/// Treatment modality markers carried by every appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modalities {
    #[serde(rename = "isHotair")]
    pub hot_air: bool,
    #[serde(rename = "isUltrasonic")]
    pub ultrasonic: bool,
    #[serde(rename = "isElectric")]
    pub electric: bool,
}

/// Fields common to single and series appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    /// Therapist display name.
    pub therapist: String,
    #[serde(rename = "therapistID")]
    pub therapist_id: String,
    pub patient: String,
    pub start_time: Slot,
    pub end_time: Slot,
    pub comment: String,
    #[serde(flatten)]
    pub modalities: Modalities,
}

impl AppointmentDetails {
    /// # Errors
    /// Returns [`EngineError::InvalidRange`] unless `start < end`.
    pub fn new(
        therapist: impl Into<String>,
        therapist_id: impl Into<String>,
        patient: impl Into<String>,
        start_time: Slot,
        end_time: Slot,
    ) -> Result<Self> {
        if start_time >= end_time {
            return Err(EngineError::InvalidRange {
                start: start_time.label(),
                end: end_time.label(),
            });
        }
        Ok(Self {
            therapist: therapist.into(),
            therapist_id: therapist_id.into(),
            patient: patient.into(),
            start_time,
            end_time,
            comment: String::new(),
            modalities: Modalities::default(),
        })
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_modalities(mut self, modalities: Modalities) -> Self {
        self.modalities = modalities;
        self
    }
}

/// The time-interval contract shared by every appointment kind.
pub trait Appointment {
    fn details(&self) -> &AppointmentDetails;

    fn therapist_id(&self) -> &str {
        &self.details().therapist_id
    }

    fn patient(&self) -> &str {
        &self.details().patient
    }

    fn start(&self) -> Slot {
        self.details().start_time
    }

    fn end(&self) -> Slot {
        self.details().end_time
    }

    /// Half-open intersection with `[start, end)`.
    ///
    /// Adjacent intervals (one ends where the other starts) do not overlap.
    fn overlaps(&self, start: Slot, end: Slot) -> bool {
        self.start() < end && self.end() > start
    }

    /// The legacy point/interval probe used by the series-conflict sweep.
    ///
    /// With an `end`, matches when the end points coincide, the start points
    /// coincide, one interval strictly contains the other, or the intervals
    /// partially overlap on either side. Without an `end`, only an identical
    /// start matches.
    fn matches_probe(&self, start: Slot, end: Option<Slot>) -> bool {
        let (own_start, own_end) = (self.start(), self.end());
        match end {
            Some(end) => {
                own_end == end
                    || own_start == start
                    || (own_start < start && own_end > end)
                    || (own_start > start && own_start < end)
                    || (own_end > start && own_end < end)
            }
            None => own_start == start,
        }
    }

    /// Whether the appointment lies entirely inside `[start, end]`.
    fn is_within(&self, start: Slot, end: Slot) -> bool {
        self.start() >= start && self.end() <= end
    }
}

/// A one-off appointment on a concrete date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAppointment {
    pub id: AppointmentId,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub details: AppointmentDetails,
}

impl SingleAppointment {
    pub fn new(date: NaiveDate, details: AppointmentDetails) -> Self {
        Self {
            id: AppointmentId::generate(),
            date,
            details,
        }
    }

    pub fn with_id(mut self, id: AppointmentId) -> Self {
        self.id = id;
        self
    }

    /// Deduplication key: two entries with the same key describe one booking.
    pub fn identity_key(&self) -> (NaiveDate, Slot, &str) {
        (self.date, self.details.start_time, &self.details.therapist_id)
    }
}

impl Appointment for SingleAppointment {
    fn details(&self) -> &AppointmentDetails {
        &self.details
    }
}

/// One suppressed occurrence of a series appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub date: NaiveDate,
    pub patient: String,
}

impl Cancellation {
    pub fn new(date: NaiveDate, patient: impl Into<String>) -> Self {
        Self {
            date,
            patient: patient.into(),
        }
    }
}

/// A weekly recurring appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesAppointment {
    pub id: AppointmentId,
    #[serde(with = "dates::weekday_serde")]
    pub weekday: Weekday,
    /// Recurrence interval in weeks, at least 1.
    pub interval_weeks: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cancellations: Vec<Cancellation>,
    #[serde(rename = "isBWO")]
    pub is_bwo: bool,
    #[serde(flatten)]
    pub details: AppointmentDetails,
}

impl SeriesAppointment {
    /// # Errors
    /// Returns [`EngineError::InvalidInterval`] when `interval_weeks` is 0.
    pub fn new(
        details: AppointmentDetails,
        weekday: Weekday,
        interval_weeks: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self> {
        if interval_weeks == 0 {
            return Err(EngineError::InvalidInterval(interval_weeks));
        }
        Ok(Self {
            id: AppointmentId::generate(),
            weekday,
            interval_weeks,
            start_date,
            end_date,
            cancellations: Vec::new(),
            is_bwo: false,
            details,
        })
    }

    pub fn with_id(mut self, id: AppointmentId) -> Self {
        self.id = id;
        self
    }

    /// The first date of the series: its weekday on or after `start_date`.
    pub fn first_occurrence(&self) -> NaiveDate {
        dates::first_on_or_after(self.start_date, self.weekday)
    }

    /// Whether `date` lies inside the validity window.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whether the recurrence produces an occurrence on `date`, ignoring
    /// cancellations.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if date.weekday() != self.weekday || !self.is_active_on(date) {
            return false;
        }
        let days = (date - self.first_occurrence()).num_days();
        days >= 0 && days % (7 * self.interval_weeks.max(1) as i64) == 0
    }

    pub fn is_cancelled_on(&self, date: NaiveDate) -> bool {
        self.cancellations.iter().any(|c| c.date == date)
    }

    /// An occurrence exists on `date` and has not been cancelled.
    pub fn is_booked_on(&self, date: NaiveDate) -> bool {
        self.occurs_on(date) && !self.is_cancelled_on(date)
    }
}

impl Appointment for SeriesAppointment {
    fn details(&self) -> &AppointmentDetails {
        &self.details
    }
}
