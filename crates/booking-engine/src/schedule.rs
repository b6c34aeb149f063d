//! The scheduling session: one owned context holding both registries and the
//! therapist roster.
//!
//! Every mutation goes through `&mut Schedule`, so writes are serialized by
//! ownership rather than by locking. A session is built from a
//! [`ScheduleDocument`] and written back whole.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::appointment::{AppointmentId, SeriesAppointment, SingleAppointment};
use crate::availability;
use crate::config::EngineConfig;
use crate::dates;
use crate::daylist::{Daylist, RecurrenceQuery};
use crate::document::{self, ScheduleDocument, ScheduleStore};
use crate::error::Result;
use crate::masterlist::Masterlist;
use crate::slot::Slot;
use crate::suggest::{SuggestionRequest, SuggestionSearch};
use crate::therapist::{DaySelector, DayWindow, Therapist};

/// Everything standing in the way of booking one single appointment.
#[derive(Debug, Clone, Serialize)]
pub struct BookingCheck<'a> {
    pub therapist_known: bool,
    pub therapist_available: bool,
    pub single_conflicts: Vec<&'a SingleAppointment>,
    pub series_conflicts: Vec<&'a SeriesAppointment>,
}

impl BookingCheck<'_> {
    pub fn is_clear(&self) -> bool {
        self.therapist_known
            && self.therapist_available
            && self.single_conflicts.is_empty()
            && self.series_conflicts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    created_date: NaiveDate,
    daylist: Daylist,
    masterlist: Masterlist,
    therapists: Vec<Therapist>,
    config: EngineConfig,
}

impl Schedule {
    /// An empty schedule created today.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            created_date: dates::today_in(config.timezone),
            daylist: Daylist::new(),
            masterlist: Masterlist::new(),
            therapists: Vec::new(),
            config,
        }
    }

    /// Materialize a stored document.
    ///
    /// # Errors
    /// Fails on dates, weekdays or intervals that cannot be interpreted.
    pub fn from_document(document: ScheduleDocument, config: EngineConfig) -> Result<Self> {
        let tz = config.timezone;
        let created_date = dates::parse_date(&document.created_date, tz)?;
        let daylist = document::daylist_from_document(document.daylist, tz)?;
        let masterlist = document::masterlist_from_document(document.masterlist, tz)?;
        let therapists = document
            .therapists
            .into_iter()
            .map(|record| record.into_therapist(tz))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            singles = daylist.len(),
            series = masterlist.len(),
            therapists = therapists.len(),
            "schedule loaded"
        );
        Ok(Self {
            created_date,
            daylist,
            masterlist,
            therapists,
            config,
        })
    }

    pub fn to_document(&self) -> ScheduleDocument {
        ScheduleDocument {
            created_date: self.created_date.to_string(),
            masterlist: document::masterlist_to_document(&self.masterlist),
            daylist: document::daylist_to_document(&self.daylist),
            therapists: self.therapists.iter().map(Into::into).collect(),
        }
    }

    pub fn load(store: &impl ScheduleStore, config: EngineConfig) -> Result<Self> {
        Self::from_document(store.load_schedule()?, config)
    }

    /// Drop single appointments without a patient, then hand the whole
    /// document to `store`.
    pub fn save(&mut self, store: &impl ScheduleStore) -> Result<()> {
        let purged = self.daylist.remove_appointments_without_patient();
        if purged > 0 {
            info!(purged, "removed single appointments without patient");
        }
        store.save_schedule(&self.to_document())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date
    }

    /// Today in the configured time zone.
    pub fn today(&self) -> NaiveDate {
        dates::today_in(self.config.timezone)
    }

    pub fn daylist(&self) -> &Daylist {
        &self.daylist
    }

    pub fn masterlist(&self) -> &Masterlist {
        &self.masterlist
    }

    pub fn therapists(&self) -> &[Therapist] {
        &self.therapists
    }

    pub fn therapist(&self, id: &str) -> Option<&Therapist> {
        self.therapists.iter().find(|therapist| therapist.id == id)
    }

    fn therapist_mut(&mut self, id: &str) -> Option<&mut Therapist> {
        self.therapists.iter_mut().find(|therapist| therapist.id == id)
    }

    // ── Single appointments ────────────────────────────────────────────────

    pub fn add_single_appointment(&mut self, appointment: SingleAppointment) {
        self.daylist.add_appointment(appointment);
    }

    pub fn change_single_appointment(&mut self, appointment: SingleAppointment) -> bool {
        self.daylist.change_appointment(appointment)
    }

    pub fn delete_single_appointment(&mut self, id: &AppointmentId) -> Option<SingleAppointment> {
        self.daylist.delete_appointment(id)
    }

    // ── Series appointments and cancellations ─────────────────────────────

    pub fn add_series_appointment(&mut self, series: SeriesAppointment) {
        self.masterlist.add_appointment(series);
    }

    pub fn change_series_appointment(&mut self, series: SeriesAppointment) -> bool {
        self.masterlist.change_appointment(series)
    }

    pub fn delete_series_appointment(&mut self, id: &AppointmentId) -> Option<SeriesAppointment> {
        self.masterlist.delete_appointment(id)
    }

    pub fn add_cancellation(&mut self, date: NaiveDate, patient: &str, id: &AppointmentId) -> bool {
        self.masterlist.add_cancellation(date, patient, id)
    }

    pub fn change_cancellation(&mut self, date: NaiveDate, patient: &str, id: &AppointmentId) -> bool {
        self.masterlist.change_cancellation(date, patient, id)
    }

    pub fn remove_cancellation(&mut self, date: NaiveDate, id: &AppointmentId) -> bool {
        self.masterlist.remove_cancellation(date, id)
    }

    // ── Therapists ─────────────────────────────────────────────────────────

    /// Add a therapist active from `today` with no end. Returns `false` when
    /// the id is taken.
    pub fn add_therapist(&mut self, id: &str, name: &str, today: NaiveDate) -> bool {
        if self.therapist(id).is_some() {
            return false;
        }
        let mut therapist = Therapist::new(id, name);
        therapist.active_since = today;
        self.therapists.push(therapist);
        true
    }

    /// Remove a therapist together with all of their series appointments.
    pub fn remove_therapist(&mut self, id: &str) -> Option<Therapist> {
        let position = self.therapists.iter().position(|therapist| therapist.id == id)?;
        let removed = self.therapists.remove(position);
        let series = self.masterlist.remove_appointments_for_therapist(id);
        info!(therapist = %id, series, "removed therapist");
        Some(removed)
    }

    pub fn rename_therapist(&mut self, id: &str, name: &str) -> bool {
        match self.therapist_mut(id) {
            Some(therapist) => {
                therapist.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace a therapist's absences for one day selector, pruning stale
    /// date-keyed absences and collapsing duplicate weekday absences.
    pub fn set_absences_for_day(
        &mut self,
        therapist_id: &str,
        day: DaySelector,
        absences: Vec<DayWindow>,
        today: NaiveDate,
    ) -> bool {
        let retention = self.config.absence_retention_months;
        match self.therapist_mut(therapist_id) {
            Some(therapist) => {
                therapist.set_absences_for_day(day, absences, today, retention);
                true
            }
            None => false,
        }
    }

    pub fn set_exceptions_for_day(
        &mut self,
        therapist_id: &str,
        day: DaySelector,
        exceptions: Vec<DayWindow>,
    ) -> bool {
        match self.therapist_mut(therapist_id) {
            Some(therapist) => {
                therapist.set_exceptions_for_day(day, exceptions);
                true
            }
            None => false,
        }
    }

    pub fn future_appointments_for_therapist(
        &self,
        therapist_id: &str,
        today: NaiveDate,
    ) -> Vec<&SingleAppointment> {
        self.daylist.future_appointments_for_therapist(therapist_id, today)
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Whether a known therapist is free of absences for `[start, end)`.
    /// Unknown therapists are never available.
    pub fn is_available(&self, therapist_id: &str, date: NaiveDate, start: Slot, end: Slot) -> bool {
        self.therapist(therapist_id).is_some_and(|therapist| {
            availability::is_available_with(
                therapist,
                date,
                start,
                end,
                self.config.exception_policy,
            )
        })
    }

    /// Everything blocking `candidate`. Stored appointments sharing the
    /// candidate's id are not reported, so an edit does not clash with the
    /// record it replaces.
    pub fn check_booking(&self, candidate: &SingleAppointment) -> BookingCheck<'_> {
        let details = &candidate.details;
        let therapist_known = self.therapist(&details.therapist_id).is_some();
        BookingCheck {
            therapist_known,
            therapist_available: self.is_available(
                &details.therapist_id,
                candidate.date,
                details.start_time,
                details.end_time,
            ),
            single_conflicts: self
                .daylist
                .conflicts(
                    &details.therapist_id,
                    candidate.date,
                    details.start_time,
                    details.end_time,
                )
                .into_iter()
                .filter(|existing| existing.id != candidate.id)
                .collect(),
            series_conflicts: self.masterlist.conflicts_for_single(candidate),
        }
    }

    /// Single appointments from `today` on that a series would run into.
    pub fn series_conflicts(
        &self,
        series: &SeriesAppointment,
        today: NaiveDate,
    ) -> Vec<&SingleAppointment> {
        self.daylist
            .recurring_conflicts(&RecurrenceQuery::from(series), today)
    }

    pub fn appointments_for_patient(&self, patient: &str, today: NaiveDate) -> Vec<&SingleAppointment> {
        self.daylist.appointments_for_patient(patient, today)
    }

    pub fn find_suggestions(
        &self,
        request: &SuggestionRequest,
        today: NaiveDate,
    ) -> Vec<SingleAppointment> {
        SuggestionSearch::new(&self.daylist, &self.masterlist, &self.therapists)
            .with_config(&self.config)
            .find(request, today)
    }
}
