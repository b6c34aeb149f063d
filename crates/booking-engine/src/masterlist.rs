//! Weekday-indexed registry of series appointments.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, info, warn};

use crate::appointment::{
    Appointment, AppointmentId, Cancellation, SeriesAppointment, SingleAppointment,
};
use crate::slot::Slot;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Default)]
pub struct Masterlist {
    weekdays: HashMap<Weekday, Vec<SeriesAppointment>>,
    index: HashMap<AppointmentId, Weekday>,
}

impl Masterlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored series.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Series of one weekday, in insertion order.
    pub fn weekday(&self, weekday: Weekday) -> &[SeriesAppointment] {
        self.weekdays
            .get(&weekday)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Non-empty weekday buckets, Monday first.
    pub fn buckets(&self) -> impl Iterator<Item = (Weekday, &[SeriesAppointment])> {
        WEEK.into_iter()
            .map(|weekday| (weekday, self.weekday(weekday)))
            .filter(|(_, appointments)| !appointments.is_empty())
    }

    pub fn appointments(&self) -> impl Iterator<Item = &SeriesAppointment> {
        self.buckets().flat_map(|(_, appointments)| appointments.iter())
    }

    pub fn get(&self, id: &AppointmentId) -> Option<&SeriesAppointment> {
        let weekday = self.index.get(id)?;
        self.weekday(*weekday).iter().find(|series| &series.id == id)
    }

    fn get_mut(&mut self, id: &AppointmentId) -> Option<&mut SeriesAppointment> {
        let weekday = self.index.get(id)?;
        self.weekdays
            .get_mut(weekday)?
            .iter_mut()
            .find(|series| &series.id == id)
    }

    /// Series of `therapist_id` booked on `date` and overlapping
    /// `[start, end)`.
    ///
    /// A series counts as booked on `date` when the date is inside its
    /// validity window, falls on its recurrence cycle, and has not been
    /// cancelled.
    pub fn conflicts(
        &self,
        therapist_id: &str,
        date: NaiveDate,
        start: Slot,
        end: Slot,
    ) -> Vec<&SeriesAppointment> {
        self.weekday(date.weekday())
            .iter()
            .filter(|series| {
                series.therapist_id() == therapist_id
                    && series.is_booked_on(date)
                    && series.overlaps(start, end)
            })
            .collect()
    }

    /// Series that would clash with a proposed single appointment.
    pub fn conflicts_for_single(&self, single: &SingleAppointment) -> Vec<&SeriesAppointment> {
        self.conflicts(single.therapist_id(), single.date, single.start(), single.end())
    }

    /// Insert `series` into its weekday bucket. A series whose id is already
    /// taken is stored under a freshly generated one.
    pub fn add_appointment(&mut self, mut series: SeriesAppointment) {
        if self.index.contains_key(&series.id) {
            let fresh = AppointmentId::generate();
            warn!(id = %series.id, weekday = %series.weekday, new_id = %fresh, "duplicate series appointment id, assigning a new one");
            series.id = fresh;
        }
        debug!(id = %series.id, weekday = %series.weekday, "adding series appointment");
        self.index.insert(series.id.clone(), series.weekday);
        self.weekdays.entry(series.weekday).or_default().push(series);
    }

    /// Replace the series carrying `series.id`. A changed weekday moves the
    /// record to its new bucket. Returns `false` for an unknown id.
    pub fn change_appointment(&mut self, series: SeriesAppointment) -> bool {
        if !self.index.contains_key(&series.id) {
            debug!(id = %series.id, "change skipped: unknown series");
            return false;
        }
        if let Some(stored) = self.get_mut(&series.id) {
            if stored.weekday == series.weekday {
                *stored = series;
                return true;
            }
        }
        self.remove_from_bucket(&series.id);
        self.add_appointment(series);
        true
    }

    /// Remove the series with `id`, returning it when it existed.
    pub fn delete_appointment(&mut self, id: &AppointmentId) -> Option<SeriesAppointment> {
        let removed = self.remove_from_bucket(id)?;
        info!(id = %removed.id, patient = %removed.patient(), "deleted series appointment");
        Some(removed)
    }

    fn remove_from_bucket(&mut self, id: &AppointmentId) -> Option<SeriesAppointment> {
        let weekday = self.index.remove(id)?;
        let bucket = self.weekdays.get_mut(&weekday)?;
        let position = bucket.iter().position(|series| &series.id == id)?;
        let removed = bucket.remove(position);
        if bucket.is_empty() {
            self.weekdays.remove(&weekday);
        }
        Some(removed)
    }

    /// Remove every series of a therapist. Returns how many were removed.
    pub fn remove_appointments_for_therapist(&mut self, therapist_id: &str) -> usize {
        let ids: Vec<AppointmentId> = self
            .appointments()
            .filter(|series| series.therapist_id() == therapist_id)
            .map(|series| series.id.clone())
            .collect();
        ids.iter()
            .filter(|id| self.remove_from_bucket(id).is_some())
            .count()
    }

    /// Cancel the occurrence of series `id` on `date`. A cancellation already
    /// recorded for that date is kept as is. Returns `false` for an unknown id.
    pub fn add_cancellation(&mut self, date: NaiveDate, patient: &str, id: &AppointmentId) -> bool {
        let Some(series) = self.get_mut(id) else {
            return false;
        };
        if !series.is_cancelled_on(date) {
            series.cancellations.push(Cancellation::new(date, patient));
        }
        true
    }

    /// Update the patient recorded on the cancellation of series `id` on
    /// `date`. Returns `false` when no such cancellation exists.
    pub fn change_cancellation(
        &mut self,
        date: NaiveDate,
        patient: &str,
        id: &AppointmentId,
    ) -> bool {
        let cancellation = self.get_mut(id).and_then(|series| {
            series
                .cancellations
                .iter_mut()
                .find(|cancellation| cancellation.date == date)
        });
        match cancellation {
            Some(cancellation) => {
                cancellation.patient = patient.to_string();
                true
            }
            None => false,
        }
    }

    /// Reinstate the occurrence of series `id` on `date`. Returns `false`
    /// when nothing was cancelled on that date.
    pub fn remove_cancellation(&mut self, date: NaiveDate, id: &AppointmentId) -> bool {
        let Some(series) = self.get_mut(id) else {
            return false;
        };
        let before = series.cancellations.len();
        series.cancellations.retain(|cancellation| cancellation.date != date);
        series.cancellations.len() != before
    }
}

impl FromIterator<SeriesAppointment> for Masterlist {
    fn from_iter<I: IntoIterator<Item = SeriesAppointment>>(iter: I) -> Self {
        let mut masterlist = Masterlist::new();
        for series in iter {
            masterlist.add_appointment(series);
        }
        masterlist
    }
}
