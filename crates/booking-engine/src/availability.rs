//! Therapist availability against absences and exceptions.
//!
//! An absence is *relevant* for a date when it is keyed by exactly that date
//! or by the date's weekday. A slot `[start, end)` is blocked by any relevant
//! absence it overlaps under the half-open rule, so a slot ending exactly
//! when an absence begins is still available.
//!
//! Exceptions only take part under [`ExceptionPolicy::Relieve`]: an absence
//! is then ignored for a slot that a relevant exception covers entirely.

use chrono::NaiveDate;

use crate::config::ExceptionPolicy;
use crate::slot::Slot;
use crate::therapist::{Absence, Therapist};

/// Whether `therapist` is free of absences for `[start, end)` on `date`,
/// with exceptions ignored.
pub fn is_available(therapist: &Therapist, date: NaiveDate, start: Slot, end: Slot) -> bool {
    is_available_with(therapist, date, start, end, ExceptionPolicy::Ignore)
}

/// [`is_available`] under an explicit exception policy.
pub fn is_available_with(
    therapist: &Therapist,
    date: NaiveDate,
    start: Slot,
    end: Slot,
    policy: ExceptionPolicy,
) -> bool {
    if therapist.absences.is_empty() {
        return true;
    }
    if policy == ExceptionPolicy::Relieve && is_relieved(therapist, date, start, end) {
        return true;
    }
    blocking_absences(therapist, date, start, end).is_empty()
}

/// The relevant absences overlapping `[start, end)` on `date`.
pub fn blocking_absences(
    therapist: &Therapist,
    date: NaiveDate,
    start: Slot,
    end: Slot,
) -> Vec<&Absence> {
    therapist
        .absences
        .iter()
        .filter(|absence| absence.applies_to(date) && absence.overlaps(start, end))
        .collect()
}

fn is_relieved(therapist: &Therapist, date: NaiveDate, start: Slot, end: Slot) -> bool {
    therapist
        .exceptions
        .iter()
        .any(|exception| exception.applies_to(date) && exception.covers(start, end))
}
