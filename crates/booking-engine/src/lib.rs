//! # booking-engine
//!
//! Availability and conflict resolution for a therapy practice's appointment
//! book: one-off appointments, weekly series with cancellations, therapist
//! absences, and free-slot suggestions.
//!
//! All times live on a 10-minute grid starting at 07:00 (see [`slot`]), and
//! every overlap test runs on grid indices.
//!
//! ## Modules
//!
//! - [`slot`] — time labels <-> grid indices
//! - [`dates`] — readable dates, weekday names, weekday arithmetic
//! - [`appointment`] — single and series appointments
//! - [`therapist`] — therapists, absences, exceptions
//! - [`daylist`] — date-indexed single appointments
//! - [`masterlist`] — weekday-indexed series appointments
//! - [`availability`] — absence checks
//! - [`suggest`] — free-slot search
//! - [`document`] — stored document shape and the persistence seam
//! - [`schedule`] — the session context tying it all together
//! - [`config`] — engine settings
//! - [`error`] — error types

pub mod appointment;
pub mod availability;
pub mod config;
pub mod dates;
pub mod daylist;
pub mod document;
pub mod error;
pub mod masterlist;
pub mod schedule;
pub mod slot;
pub mod suggest;
pub mod therapist;

pub use appointment::{
    Appointment, AppointmentDetails, AppointmentId, Cancellation, Modalities, SeriesAppointment,
    SingleAppointment,
};
pub use availability::is_available;
pub use config::{EngineConfig, ExceptionPolicy};
pub use daylist::{recurrence_probe_dates, Daylist, RecurrenceQuery};
pub use document::{ScheduleDocument, ScheduleStore};
pub use error::EngineError;
pub use masterlist::Masterlist;
pub use schedule::{BookingCheck, Schedule};
pub use slot::{Slot, TimeValue};
pub use suggest::{DateRange, SuggestionRequest, SuggestionSearch, TimeOfDay};
pub use therapist::{Absence, DaySelector, DayWindow, Exception, Therapist};
