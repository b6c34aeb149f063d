//! Free-slot suggestion search.
//!
//! Walks business days forward from a start date and slides a
//! duration-sized window over the requested time-of-day frame of every
//! requested therapist. A start index becomes a suggestion when the therapist
//! is available (absences), has no overlapping single appointment (Daylist),
//! and has no overlapping booked series occurrence (Masterlist).

use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::appointment::{AppointmentDetails, Modalities, SingleAppointment};
use crate::availability;
use crate::config::{EngineConfig, ExceptionPolicy};
use crate::dates;
use crate::daylist::Daylist;
use crate::masterlist::Masterlist;
use crate::slot::{self, Slot};
use crate::therapist::Therapist;

/// Days scanned when the request has no end date.
pub const DEFAULT_MAX_SEARCH_DAYS: u32 = 60;

/// Coarse time-of-day frames offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 8:00 - 19:30
    #[default]
    Any,
    /// 8:00 - 12:00
    Timeframe1,
    /// 12:00 - 15:00
    Timeframe2,
    /// 15:00 - 19:30
    Timeframe3,
}

impl TimeOfDay {
    /// The `(start, end)` slots bounding the frame. Appointments must end no
    /// later than `end`.
    pub fn window(self) -> (Slot, Slot) {
        const EIGHT: Slot = Slot::from_index(6);
        const NOON: Slot = Slot::from_index(30);
        const FIFTEEN: Slot = Slot::from_index(48);
        const NINETEEN_THIRTY: Slot = Slot::from_index(75);

        match self {
            TimeOfDay::Any => (EIGHT, NINETEEN_THIRTY),
            TimeOfDay::Timeframe1 => (EIGHT, NOON),
            TimeOfDay::Timeframe2 => (NOON, FIFTEEN),
            TimeOfDay::Timeframe3 => (FIFTEEN, NINETEEN_THIRTY),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(TimeOfDay::Any),
            "timeframe1" => Ok(TimeOfDay::Timeframe1),
            "timeframe2" => Ok(TimeOfDay::Timeframe2),
            "timeframe3" => Ok(TimeOfDay::Timeframe3),
            other => Err(format!(
                "unknown time of day '{}', expected any, timeframe1, timeframe2 or timeframe3",
                other
            )),
        }
    }
}

/// Optional bounds of the searched calendar range, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    pub patient: String,
    pub therapist_ids: Vec<String>,
    /// How many appointments the caller intends to book. The search reports
    /// every free slot; picking `appointment_count` of them is up to the
    /// caller.
    pub appointment_count: u32,
    pub duration_minutes: u32,
    pub time_of_day: TimeOfDay,
    pub date_range: DateRange,
}

/// A suggestion search over borrowed registries.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionSearch<'a> {
    daylist: &'a Daylist,
    masterlist: &'a Masterlist,
    therapists: &'a [Therapist],
    max_search_days: u32,
    exception_policy: ExceptionPolicy,
}

impl<'a> SuggestionSearch<'a> {
    pub fn new(daylist: &'a Daylist, masterlist: &'a Masterlist, therapists: &'a [Therapist]) -> Self {
        Self {
            daylist,
            masterlist,
            therapists,
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
            exception_policy: ExceptionPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.max_search_days = config.max_search_days;
        self.exception_policy = config.exception_policy;
        self
    }

    /// Enumerate every free slot matching `request`.
    ///
    /// Returns an empty list when the patient name or therapist set is empty,
    /// or when the duration is not a positive multiple of 10 minutes. The
    /// search starts at the range start (or the day after `today`) and runs
    /// through the range end, or for the configured number of calendar days
    /// when the range is open. Saturdays and Sundays are skipped.
    pub fn find(&self, request: &SuggestionRequest, today: NaiveDate) -> Vec<SingleAppointment> {
        let mut suggestions = Vec::new();

        if request.patient.trim().is_empty() || request.therapist_ids.is_empty() {
            return suggestions;
        }
        let Some(steps) = slot::steps_for_minutes(request.duration_minutes) else {
            debug!(
                duration = request.duration_minutes,
                "duration does not fit the 10-minute grid"
            );
            return suggestions;
        };

        let mut day = request
            .date_range
            .start
            .unwrap_or(today + Duration::days(1));
        let mut days_searched = 0u32;

        loop {
            let keep_going = match request.date_range.end {
                Some(end) => day <= end,
                None => days_searched < self.max_search_days,
            };
            if !keep_going {
                break;
            }

            if dates::is_business_day(day) {
                for therapist_id in &request.therapist_ids {
                    let Some(therapist) = self.therapists.iter().find(|t| &t.id == therapist_id)
                    else {
                        continue;
                    };
                    if !therapist.is_active_on(day) {
                        continue;
                    }
                    suggestions.extend(self.slots_on(therapist, day, steps, request));
                }
            }

            days_searched += 1;
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        debug!(
            patient = %request.patient,
            days = days_searched,
            found = suggestions.len(),
            "suggestion search finished"
        );
        suggestions
    }

    fn slots_on(
        &self,
        therapist: &Therapist,
        date: NaiveDate,
        steps: u16,
        request: &SuggestionRequest,
    ) -> Vec<SingleAppointment> {
        let (frame_start, frame_end) = request.time_of_day.window();
        let Some(last_start) = frame_end.index().checked_sub(steps) else {
            return Vec::new();
        };
        if last_start < frame_start.index() {
            return Vec::new();
        }

        (frame_start.index()..=last_start)
            .map(Slot::from_index)
            .filter_map(|start| {
                let end = start.offset(steps);
                self.is_free(therapist, date, start, end)
                    .then(|| provisional(therapist, &request.patient, date, start, end))
            })
            .collect()
    }

    fn is_free(&self, therapist: &Therapist, date: NaiveDate, start: Slot, end: Slot) -> bool {
        availability::is_available_with(therapist, date, start, end, self.exception_policy)
            && self.daylist.conflicts(&therapist.id, date, start, end).is_empty()
            && self
                .masterlist
                .conflicts(&therapist.id, date, start, end)
                .is_empty()
    }
}

fn provisional(
    therapist: &Therapist,
    patient: &str,
    date: NaiveDate,
    start: Slot,
    end: Slot,
) -> SingleAppointment {
    SingleAppointment::new(
        date,
        AppointmentDetails {
            therapist: therapist.name.clone(),
            therapist_id: therapist.id.clone(),
            patient: patient.to_string(),
            start_time: start,
            end_time: end,
            comment: String::new(),
            modalities: Modalities::default(),
        },
    )
}
