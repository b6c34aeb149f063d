//! The persisted schedule document and the persistence seam.
//!
//! [`ScheduleDocument`] mirrors the JSON kept by the practice frontend.
//! Times are normalized into [`Slot`]s while deserializing (they may arrive
//! as `"8:00"` or `6`), and dates are resolved into calendar days when a
//! document is turned into a [`Schedule`](crate::schedule::Schedule).
//! Loading and saving whole documents is the job of a [`ScheduleStore`].

use std::cell::RefCell;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::appointment::{
    AppointmentDetails, AppointmentId, Cancellation, Modalities, SeriesAppointment,
    SingleAppointment,
};
use crate::dates;
use crate::daylist::Daylist;
use crate::error::{EngineError, Result};
use crate::masterlist::Masterlist;
use crate::slot::Slot;
use crate::therapist::{self, DayWindow, Therapist};

/// Sentinel for "no bound" in `activeSince` / `activeUntil`.
const UNBOUNDED: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDocument {
    pub created_date: String,
    #[serde(default)]
    pub masterlist: MasterlistDocument,
    #[serde(default)]
    pub daylist: DaylistDocument,
    #[serde(default)]
    pub therapists: Vec<TherapistRecord>,
}

impl ScheduleDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterlistDocument {
    #[serde(default)]
    pub elements: Vec<WeekdayRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayRecord {
    pub weekday: String,
    #[serde(default)]
    pub appointments: Vec<SeriesRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaylistDocument {
    #[serde(default)]
    pub elements: Vec<DayRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: String,
    #[serde(default)]
    pub appointments: Vec<SingleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub therapist: Option<String>,
    #[serde(rename = "therapistID")]
    pub therapist_id: String,
    #[serde(default)]
    pub patient: Option<String>,
    pub start_time: Slot,
    pub end_time: Slot,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub modalities: Modalities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub therapist: Option<String>,
    #[serde(rename = "therapistID")]
    pub therapist_id: String,
    #[serde(default)]
    pub patient: Option<String>,
    pub start_time: Slot,
    pub end_time: Slot,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub cancellations: Vec<CancellationRecord>,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "isBWO", default)]
    pub is_bwo: bool,
    #[serde(flatten)]
    pub modalities: Modalities,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub date: String,
    #[serde(default)]
    pub patient: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistRecord {
    pub name: String,
    pub id: String,
    #[serde(default = "unbounded")]
    pub active_since: ActiveBound,
    #[serde(default = "unbounded")]
    pub active_until: ActiveBound,
    #[serde(default)]
    pub absences: Vec<DayWindow>,
    #[serde(default)]
    pub exceptions: Option<Vec<DayWindow>>,
}

/// `activeSince` / `activeUntil`: epoch milliseconds, `-1` for "no bound",
/// or a date string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveBound {
    Millis(i64),
    Text(String),
}

fn unbounded() -> ActiveBound {
    ActiveBound::Millis(UNBOUNDED)
}

impl ActiveBound {
    fn resolve(&self, sentinel: NaiveDate, tz: Tz) -> Result<NaiveDate> {
        match self {
            ActiveBound::Millis(UNBOUNDED) => Ok(sentinel),
            ActiveBound::Millis(millis) => dates::date_from_millis(*millis, tz),
            ActiveBound::Text(text) => dates::parse_date(text, tz),
        }
    }

    fn from_date(date: NaiveDate, sentinel: NaiveDate) -> Self {
        if date == sentinel {
            ActiveBound::Millis(UNBOUNDED)
        } else {
            ActiveBound::Millis(dates::millis_from_date(date))
        }
    }
}

fn details(
    therapist: Option<String>,
    therapist_id: String,
    patient: Option<String>,
    start_time: Slot,
    end_time: Slot,
    comment: Option<String>,
    modalities: Modalities,
) -> AppointmentDetails {
    if start_time >= end_time {
        warn!(%therapist_id, start = %start_time, end = %end_time, "stored appointment has an empty time range");
    }
    AppointmentDetails {
        therapist: therapist.unwrap_or_default(),
        therapist_id,
        patient: patient.unwrap_or_default(),
        start_time,
        end_time,
        comment: comment.unwrap_or_default(),
        modalities,
    }
}

fn id_or_generated(id: Option<String>) -> AppointmentId {
    id.filter(|id| !id.is_empty())
        .map(AppointmentId::new)
        .unwrap_or_else(AppointmentId::generate)
}

impl SingleRecord {
    pub fn into_appointment(self, date: NaiveDate) -> SingleAppointment {
        SingleAppointment {
            id: id_or_generated(self.id),
            date,
            details: details(
                self.therapist,
                self.therapist_id,
                self.patient,
                self.start_time,
                self.end_time,
                self.comment,
                self.modalities,
            ),
        }
    }
}

impl From<&SingleAppointment> for SingleRecord {
    fn from(appointment: &SingleAppointment) -> Self {
        let details = &appointment.details;
        Self {
            id: Some(appointment.id.to_string()),
            therapist: Some(details.therapist.clone()),
            therapist_id: details.therapist_id.clone(),
            patient: Some(details.patient.clone()),
            start_time: details.start_time,
            end_time: details.end_time,
            comment: Some(details.comment.clone()),
            modalities: details.modalities,
        }
    }
}

impl SeriesRecord {
    /// # Errors
    /// Fails on unparseable dates or a zero interval.
    pub fn into_appointment(self, weekday: chrono::Weekday, tz: Tz) -> Result<SeriesAppointment> {
        if self.interval == 0 {
            return Err(EngineError::InvalidInterval(self.interval));
        }
        let cancellations = self
            .cancellations
            .into_iter()
            .map(|record| {
                dates::parse_date(&record.date, tz)
                    .map(|date| Cancellation::new(date, record.patient.unwrap_or_default()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SeriesAppointment {
            id: id_or_generated(self.id),
            weekday,
            interval_weeks: self.interval,
            start_date: dates::parse_date(&self.start_date, tz)?,
            end_date: dates::parse_date(&self.end_date, tz)?,
            cancellations,
            is_bwo: self.is_bwo,
            details: details(
                self.therapist,
                self.therapist_id,
                self.patient,
                self.start_time,
                self.end_time,
                self.comment,
                self.modalities,
            ),
        })
    }
}

impl From<&SeriesAppointment> for SeriesRecord {
    fn from(series: &SeriesAppointment) -> Self {
        let details = &series.details;
        Self {
            id: Some(series.id.to_string()),
            therapist: Some(details.therapist.clone()),
            therapist_id: details.therapist_id.clone(),
            patient: Some(details.patient.clone()),
            start_time: details.start_time,
            end_time: details.end_time,
            comment: Some(details.comment.clone()),
            interval: series.interval_weeks,
            cancellations: series
                .cancellations
                .iter()
                .map(|cancellation| CancellationRecord {
                    date: dates::to_readable(cancellation.date),
                    patient: Some(cancellation.patient.clone()),
                })
                .collect(),
            start_date: series.start_date.to_string(),
            end_date: series.end_date.to_string(),
            is_bwo: series.is_bwo,
            modalities: details.modalities,
        }
    }
}

impl TherapistRecord {
    pub fn into_therapist(self, tz: Tz) -> Result<Therapist> {
        Ok(Therapist {
            active_since: self.active_since.resolve(therapist::unbounded_since(), tz)?,
            active_until: self.active_until.resolve(therapist::unbounded_until(), tz)?,
            id: self.id,
            name: self.name,
            absences: self.absences,
            exceptions: self.exceptions.unwrap_or_default(),
        })
    }
}

impl From<&Therapist> for TherapistRecord {
    fn from(therapist: &Therapist) -> Self {
        Self {
            name: therapist.name.clone(),
            id: therapist.id.clone(),
            active_since: ActiveBound::from_date(
                therapist.active_since,
                therapist::unbounded_since(),
            ),
            active_until: ActiveBound::from_date(
                therapist.active_until,
                therapist::unbounded_until(),
            ),
            absences: therapist.absences.clone(),
            exceptions: Some(therapist.exceptions.clone()),
        }
    }
}

/// Rebuild the Daylist from its stored buckets. Buckets repeating a date
/// are merged.
pub fn daylist_from_document(document: DaylistDocument, tz: Tz) -> Result<Daylist> {
    let mut daylist = Daylist::new();
    for day in document.elements {
        let date = dates::parse_date(&day.date, tz)?;
        for record in day.appointments {
            daylist.add_appointment(record.into_appointment(date));
        }
    }
    Ok(daylist)
}

pub fn daylist_to_document(daylist: &Daylist) -> DaylistDocument {
    DaylistDocument {
        elements: daylist
            .buckets()
            .map(|bucket| DayRecord {
                date: bucket.date().to_string(),
                appointments: bucket.appointments().iter().map(SingleRecord::from).collect(),
            })
            .collect(),
    }
}

pub fn masterlist_from_document(document: MasterlistDocument, tz: Tz) -> Result<Masterlist> {
    let mut masterlist = Masterlist::new();
    for bucket in document.elements {
        let weekday = dates::parse_weekday(&bucket.weekday)?;
        for record in bucket.appointments {
            masterlist.add_appointment(record.into_appointment(weekday, tz)?);
        }
    }
    Ok(masterlist)
}

pub fn masterlist_to_document(masterlist: &Masterlist) -> MasterlistDocument {
    MasterlistDocument {
        elements: masterlist
            .buckets()
            .map(|(weekday, appointments)| WeekdayRecord {
                weekday: dates::weekday_name(weekday).to_string(),
                appointments: appointments.iter().map(SeriesRecord::from).collect(),
            })
            .collect(),
    }
}

/// The persistence collaborator: loads and saves whole documents.
pub trait ScheduleStore {
    fn load_schedule(&self) -> Result<ScheduleDocument>;
    fn save_schedule(&self, document: &ScheduleDocument) -> Result<()>;
}

/// A store holding one document in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: RefCell<Option<ScheduleDocument>>,
}

impl InMemoryStore {
    pub fn new(document: ScheduleDocument) -> Self {
        Self {
            document: RefCell::new(Some(document)),
        }
    }

    /// The most recently saved (or initial) document.
    pub fn snapshot(&self) -> Option<ScheduleDocument> {
        self.document.borrow().clone()
    }
}

impl ScheduleStore for InMemoryStore {
    fn load_schedule(&self) -> Result<ScheduleDocument> {
        self.snapshot()
            .ok_or_else(|| EngineError::Store("no document stored".to_string()))
    }

    fn save_schedule(&self, document: &ScheduleDocument) -> Result<()> {
        *self.document.borrow_mut() = Some(document.clone());
        Ok(())
    }
}
