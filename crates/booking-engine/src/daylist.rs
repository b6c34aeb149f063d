//! Date-indexed registry of single appointments.
//!
//! Every calendar date holding at least one appointment owns exactly one
//! [`DayBucket`]; inserting looks the bucket up first and only creates one
//! when the date is new, and removing the last appointment of a date drops
//! its bucket. A secondary id index resolves update/delete handles without
//! scanning the calendar.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, Months, NaiveDate, Weekday};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::appointment::{
    Appointment, AppointmentId, Cancellation, SeriesAppointment, SingleAppointment,
};
use crate::dates;
use crate::slot::Slot;

/// How far ahead a patient's appointment history is collected.
pub const PATIENT_HORIZON_MONTHS: u32 = 12;

/// The appointments booked on one calendar date, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    date: NaiveDate,
    appointments: Vec<SingleAppointment>,
}

impl DayBucket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn appointments(&self) -> &[SingleAppointment] {
        &self.appointments
    }
}

/// A recurring rule projected onto the Daylist by
/// [`Daylist::recurring_conflicts`].
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceQuery<'a> {
    pub weekday: Weekday,
    pub therapist_id: &'a str,
    pub start: Slot,
    pub end: Slot,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval_weeks: u32,
    pub cancellations: &'a [Cancellation],
}

impl<'a> From<&'a SeriesAppointment> for RecurrenceQuery<'a> {
    fn from(series: &'a SeriesAppointment) -> Self {
        Self {
            weekday: series.weekday,
            therapist_id: series.therapist_id(),
            start: series.start(),
            end: series.end(),
            start_date: series.start_date,
            end_date: series.end_date,
            interval_weeks: series.interval_weeks,
            cancellations: &series.cancellations,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Daylist {
    days: BTreeMap<NaiveDate, DayBucket>,
    index: HashMap<AppointmentId, NaiveDate>,
}

impl Daylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored appointments.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Buckets in calendar order.
    pub fn buckets(&self) -> impl Iterator<Item = &DayBucket> {
        self.days.values()
    }

    pub fn appointments(&self) -> impl Iterator<Item = &SingleAppointment> {
        self.days.values().flat_map(|bucket| bucket.appointments.iter())
    }

    pub fn find_day(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.get(&date)
    }

    pub fn get(&self, id: &AppointmentId) -> Option<&SingleAppointment> {
        let date = self.index.get(id)?;
        self.days
            .get(date)?
            .appointments
            .iter()
            .find(|appointment| &appointment.id == id)
    }

    /// First appointment of `therapist_id` on `date` matching the legacy
    /// probe rule (see [`Appointment::matches_probe`]).
    pub fn search_appointment(
        &self,
        therapist_id: &str,
        date: NaiveDate,
        start: Slot,
        end: Option<Slot>,
    ) -> Option<&SingleAppointment> {
        self.find_day(date)?.appointments.iter().find(|appointment| {
            appointment.therapist_id() == therapist_id && appointment.matches_probe(start, end)
        })
    }

    /// Appointments of `therapist_id` on `date` lying fully inside
    /// `[start, end]`.
    pub fn appointments_in_range(
        &self,
        therapist_id: &str,
        date: NaiveDate,
        start: Slot,
        end: Slot,
    ) -> Vec<&SingleAppointment> {
        self.find_day(date)
            .map(|bucket| {
                bucket
                    .appointments
                    .iter()
                    .filter(|appointment| {
                        appointment.therapist_id() == therapist_id
                            && appointment.is_within(start, end)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Appointments of `therapist_id` on `date` overlapping `[start, end)`.
    ///
    /// An appointment ending exactly at `start` (or starting exactly at `end`)
    /// is not a conflict.
    pub fn conflicts(
        &self,
        therapist_id: &str,
        date: NaiveDate,
        start: Slot,
        end: Slot,
    ) -> Vec<&SingleAppointment> {
        self.find_day(date)
            .map(|bucket| {
                bucket
                    .appointments
                    .iter()
                    .filter(|appointment| {
                        appointment.therapist_id() == therapist_id
                            && appointment.overlaps(start, end)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A patient's appointments from `today` through one year ahead, without
    /// duplicates of the same (date, start, therapist).
    pub fn appointments_for_patient(
        &self,
        patient: &str,
        today: NaiveDate,
    ) -> Vec<&SingleAppointment> {
        let horizon = today
            .checked_add_months(Months::new(PATIENT_HORIZON_MONTHS))
            .unwrap_or(NaiveDate::MAX);
        let mut seen = HashSet::new();
        self.days
            .range(today..horizon)
            .flat_map(|(_, bucket)| bucket.appointments.iter())
            .filter(|appointment| appointment.patient() == patient)
            .filter(|appointment| seen.insert((*appointment).identity_key()))
            .collect()
    }

    /// Upcoming appointments of a therapist, today included.
    pub fn future_appointments_for_therapist(
        &self,
        therapist_id: &str,
        today: NaiveDate,
    ) -> Vec<&SingleAppointment> {
        self.days
            .range(today..)
            .flat_map(|(_, bucket)| bucket.appointments.iter())
            .filter(|appointment| appointment.therapist_id() == therapist_id)
            .collect()
    }

    /// Single appointments that would clash with a recurring rule.
    ///
    /// Every date yielded by [`recurrence_probe_dates`] is probed with
    /// [`Daylist::search_appointment`]. Hits on a cancelled date are dropped.
    ///
    /// The trailing end-date probe can revisit the last stride date. Unlike
    /// the legacy booking list, which listed that hit a second time, an
    /// appointment found by more than one probe is reported once.
    pub fn recurring_conflicts(
        &self,
        query: &RecurrenceQuery<'_>,
        today: NaiveDate,
    ) -> Vec<&SingleAppointment> {
        let probes = recurrence_probe_dates(
            query.weekday,
            query.start_date,
            query.end_date,
            query.interval_weeks,
            today,
        );

        let mut reported = HashSet::new();
        let hits: Vec<&SingleAppointment> = probes
            .into_iter()
            .filter_map(|date| {
                self.search_appointment(query.therapist_id, date, query.start, Some(query.end))
            })
            .filter(|hit| reported.insert(hit.id.clone()))
            .collect();

        hits.into_iter()
            .filter(|hit| {
                !query
                    .cancellations
                    .iter()
                    .any(|cancellation| cancellation.date == hit.date)
            })
            .collect()
    }

    /// Insert `appointment` into the bucket of its date.
    ///
    /// Ids are unique within the registry: an appointment whose id is already
    /// taken is stored under a freshly generated one.
    pub fn add_appointment(&mut self, mut appointment: SingleAppointment) {
        if self.index.contains_key(&appointment.id) {
            let fresh = AppointmentId::generate();
            warn!(id = %appointment.id, date = %appointment.date, new_id = %fresh, "duplicate single appointment id, assigning a new one");
            appointment.id = fresh;
        }
        debug!(id = %appointment.id, date = %appointment.date, "adding single appointment");
        self.index.insert(appointment.id.clone(), appointment.date);
        self.days
            .entry(appointment.date)
            .or_insert_with(|| DayBucket {
                date: appointment.date,
                appointments: Vec::new(),
            })
            .appointments
            .push(appointment);
    }

    /// Replace the stored appointment carrying `appointment.id` on
    /// `appointment.date`.
    ///
    /// The bucket is looked up by the incoming date; returns `false` and
    /// leaves the registry untouched when that date holds no appointment with
    /// this id.
    pub fn change_appointment(&mut self, appointment: SingleAppointment) -> bool {
        let Some(bucket) = self.days.get_mut(&appointment.date) else {
            debug!(id = %appointment.id, "change skipped: no bucket for date");
            return false;
        };
        match bucket
            .appointments
            .iter_mut()
            .find(|stored| stored.id == appointment.id)
        {
            Some(stored) => {
                *stored = appointment;
                true
            }
            None => {
                debug!(id = %appointment.id, "change skipped: id not on this date");
                false
            }
        }
    }

    /// Remove the appointment with `id`, returning it when it existed.
    pub fn delete_appointment(&mut self, id: &AppointmentId) -> Option<SingleAppointment> {
        let date = self.index.remove(id)?;
        let bucket = self.days.get_mut(&date)?;
        let position = bucket.appointments.iter().position(|stored| &stored.id == id)?;
        let removed = bucket.appointments.remove(position);
        if bucket.appointments.is_empty() {
            self.days.remove(&date);
        }
        info!(id = %removed.id, date = %removed.date, patient = %removed.patient(), "deleted single appointment");
        Some(removed)
    }

    /// Drop appointments whose patient field is empty. Returns how many were
    /// removed.
    pub fn remove_appointments_without_patient(&mut self) -> usize {
        let mut removed = 0;
        for bucket in self.days.values_mut() {
            bucket.appointments.retain(|appointment| {
                if !appointment.patient().trim().is_empty() {
                    return true;
                }
                if self.index.get(&appointment.id) == Some(&appointment.date) {
                    self.index.remove(&appointment.id);
                }
                debug!(id = %appointment.id, date = %appointment.date, "dropping appointment without patient");
                removed += 1;
                false
            });
        }
        self.days.retain(|_, bucket| !bucket.appointments.is_empty());
        removed
    }
}

impl FromIterator<SingleAppointment> for Daylist {
    fn from_iter<I: IntoIterator<Item = SingleAppointment>>(iter: I) -> Self {
        let mut daylist = Daylist::new();
        for appointment in iter {
            daylist.add_appointment(appointment);
        }
        daylist
    }
}

/// The dates a recurring rule probes, in order.
///
/// Starts at the first `weekday` on or after `start_date` and steps by
/// `interval_weeks * 7` days while the date is on or before `end_date`. The
/// end date is then probed once more on its own, whether or not the stride
/// lands on it. Dates before `today` are never probed.
pub fn recurrence_probe_dates(
    weekday: Weekday,
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval_weeks: u32,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let step = Duration::days(7 * interval_weeks.max(1) as i64);
    let mut probes = Vec::new();

    let mut current = dates::first_on_or_after(start_date, weekday);
    while current <= end_date {
        if current >= today {
            probes.push(current);
        }
        current += step;
    }

    if end_date >= today {
        probes.push(end_date);
    }
    probes
}
