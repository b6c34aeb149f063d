//! Tests for the date-indexed appointment registry.

use booking_engine::appointment::{AppointmentDetails, AppointmentId, Cancellation, SingleAppointment};
use booking_engine::daylist::{recurrence_probe_dates, Daylist, RecurrenceQuery};
use booking_engine::slot::Slot;
use chrono::{NaiveDate, Weekday};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn slot(label: &str) -> Slot {
    Slot::from_label(label).unwrap()
}

fn single(
    id: &str,
    therapist: &str,
    patient: &str,
    on: NaiveDate,
    start: &str,
    end: &str,
) -> SingleAppointment {
    SingleAppointment::new(
        on,
        AppointmentDetails::new("Therapist", therapist, patient, slot(start), slot(end)).unwrap(),
    )
    .with_id(AppointmentId::new(id))
}

fn monday() -> NaiveDate {
    date(2026, 10, 19)
}

// ── Buckets ─────────────────────────────────────────────────────────────────

#[test]
fn one_bucket_per_date() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "8:00", "8:30"));
    daylist.add_appointment(single("b", "t1", "Ben", monday(), "9:00", "9:30"));
    daylist.add_appointment(single("c", "t2", "Cleo", date(2026, 10, 20), "9:00", "9:30"));

    assert_eq!(daylist.buckets().count(), 2);
    assert_eq!(daylist.len(), 3);
    assert_eq!(daylist.find_day(monday()).unwrap().appointments().len(), 2);
    assert!(daylist.find_day(date(2026, 10, 21)).is_none());
}

#[test]
fn deleting_last_appointment_drops_bucket() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "8:00", "8:30"));

    let removed = daylist.delete_appointment(&AppointmentId::new("a"));
    assert_eq!(removed.map(|a| a.details.patient), Some("Anna".to_string()));
    assert!(daylist.find_day(monday()).is_none());
    assert!(daylist.is_empty());
}

#[test]
fn duplicate_id_is_replaced_with_a_fresh_one() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("x", "t1", "Anna", monday(), "9:00", "9:30"));
    daylist.add_appointment(single("x", "t1", "Ben", date(2026, 10, 20), "9:00", "9:30"));

    assert_eq!(daylist.len(), 2);
    assert_eq!(daylist.get(&AppointmentId::new("x")).unwrap().details.patient, "Anna");
    let renamed = daylist
        .appointments()
        .find(|a| a.details.patient == "Ben")
        .unwrap()
        .id
        .clone();
    assert_ne!(renamed, AppointmentId::new("x"));
    assert!(daylist.delete_appointment(&renamed).is_some());
    assert!(daylist.delete_appointment(&AppointmentId::new("x")).is_some());
    assert!(daylist.is_empty());
    assert_eq!(daylist.buckets().count(), 0);
}

#[test]
fn deleting_unknown_id_is_a_no_op() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "8:00", "8:30"));

    assert!(daylist.delete_appointment(&AppointmentId::new("missing")).is_none());
    assert_eq!(daylist.len(), 1);
}

#[test]
fn change_replaces_all_fields() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "8:00", "8:30"));

    let changed = single("a", "t1", "Anna Maria", monday(), "10:00", "10:40");
    assert!(daylist.change_appointment(changed.clone()));
    assert_eq!(daylist.get(&AppointmentId::new("a")), Some(&changed));
}

#[test]
fn change_looks_up_bucket_by_incoming_date() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "8:00", "8:30"));

    // Same id, different date: the incoming date holds no such appointment.
    let moved = single("a", "t1", "Anna", date(2026, 10, 20), "8:00", "8:30");
    assert!(!daylist.change_appointment(moved));
    assert_eq!(daylist.get(&AppointmentId::new("a")).unwrap().date, monday());
}

// ── Lookups ─────────────────────────────────────────────────────────────────

#[test]
fn search_with_end_uses_legacy_match_rule() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "9:00", "10:00"));

    // Partial overlap on the left edge.
    assert!(daylist.search_appointment("t1", monday(), slot("8:30"), Some(slot("9:30"))).is_some());
    // Search interval strictly inside the appointment.
    assert!(daylist.search_appointment("t1", monday(), slot("9:10"), Some(slot("9:50"))).is_some());
    // Search interval strictly around the appointment.
    assert!(daylist.search_appointment("t1", monday(), slot("8:30"), Some(slot("10:30"))).is_some());
    // Starts coincide, search ends early.
    assert!(daylist.search_appointment("t1", monday(), slot("9:00"), Some(slot("9:30"))).is_some());
    // Ends coincide.
    assert!(daylist.search_appointment("t1", monday(), slot("9:40"), Some(slot("10:00"))).is_some());
    // Adjacent after.
    assert!(daylist.search_appointment("t1", monday(), slot("10:00"), Some(slot("10:30"))).is_none());
    // Other therapist.
    assert!(daylist.search_appointment("t2", monday(), slot("9:00"), Some(slot("10:00"))).is_none());
}

#[test]
fn search_without_end_matches_start_only() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "9:00", "10:00"));

    assert!(daylist.search_appointment("t1", monday(), slot("9:00"), None).is_some());
    assert!(daylist.search_appointment("t1", monday(), slot("9:10"), None).is_none());
}

#[test]
fn range_lookup_requires_full_containment() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "9:00", "9:30"));
    daylist.add_appointment(single("b", "t1", "Ben", monday(), "9:30", "10:30"));

    let found = daylist.appointments_in_range("t1", monday(), slot("9:00"), slot("10:00"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, AppointmentId::new("a"));
}

#[test]
fn conflicts_use_half_open_overlap() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "9:00", "10:00"));

    assert_eq!(daylist.conflicts("t1", monday(), slot("9:30"), slot("10:30")).len(), 1);
    assert_eq!(daylist.conflicts("t1", monday(), slot("8:00"), slot("11:00")).len(), 1);
    assert!(daylist.conflicts("t1", monday(), slot("10:00"), slot("10:30")).is_empty());
    assert!(daylist.conflicts("t1", monday(), slot("8:30"), slot("9:00")).is_empty());
}

#[test]
fn patient_history_covers_one_year_and_dedupes() {
    let today = monday();
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("past", "t1", "Anna", date(2026, 10, 12), "9:00", "9:30"));
    daylist.add_appointment(single("a", "t1", "Anna", today, "9:00", "9:30"));
    daylist.add_appointment(single("dup", "t1", "Anna", today, "9:00", "9:30"));
    daylist.add_appointment(single("b", "t2", "Anna", today, "9:00", "9:30"));
    daylist.add_appointment(single("far", "t1", "Anna", date(2027, 10, 19), "9:00", "9:30"));
    daylist.add_appointment(single("other", "t1", "Ben", today, "11:00", "11:30"));

    let history = daylist.appointments_for_patient("Anna", today);
    let ids: Vec<&str> = history.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn future_appointments_for_therapist_include_today() {
    let today = monday();
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("past", "t1", "Anna", date(2026, 10, 12), "9:00", "9:30"));
    daylist.add_appointment(single("today", "t1", "Anna", today, "9:00", "9:30"));
    daylist.add_appointment(single("other", "t2", "Ben", today, "9:00", "9:30"));

    let future = daylist.future_appointments_for_therapist("t1", today);
    assert_eq!(future.len(), 1);
    assert_eq!(future[0].id, AppointmentId::new("today"));
}

#[test]
fn purge_removes_appointments_without_patient() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("a", "t1", "Anna", monday(), "9:00", "9:30"));
    daylist.add_appointment(single("blank", "t1", "  ", monday(), "10:00", "10:30"));

    assert_eq!(daylist.remove_appointments_without_patient(), 1);
    assert_eq!(daylist.len(), 1);
}

#[test]
fn purge_reaches_every_record_sharing_an_id() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("x", "t1", "", monday(), "9:00", "9:30"));
    daylist.add_appointment(single("x", "t1", "", date(2026, 10, 20), "9:00", "9:30"));
    daylist.add_appointment(single("kept", "t1", "Anna", date(2026, 10, 20), "10:00", "10:30"));

    assert_eq!(daylist.remove_appointments_without_patient(), 2);
    assert_eq!(daylist.len(), 1);
    assert!(daylist.find_day(monday()).is_none());
    assert!(daylist.appointments().all(|a| !a.details.patient.is_empty()));
    assert!(daylist.get(&AppointmentId::new("x")).is_none());
}

// ── Recurring projection ────────────────────────────────────────────────────

#[test]
fn weekly_probe_visits_each_monday_then_end_date() {
    let start = monday();
    let end = date(2026, 11, 9);

    let probes = recurrence_probe_dates(Weekday::Mon, start, end, 1, start);

    assert_eq!(
        probes,
        vec![
            date(2026, 10, 19),
            date(2026, 10, 26),
            date(2026, 11, 2),
            date(2026, 11, 9),
            date(2026, 11, 9),
        ]
    );
}

#[test]
fn probe_starts_at_first_matching_weekday() {
    // Starting on a Tuesday, the first Monday is six days later.
    let probes = recurrence_probe_dates(
        Weekday::Mon,
        date(2026, 10, 20),
        date(2026, 11, 2),
        1,
        date(2026, 10, 1),
    );
    assert_eq!(probes, vec![date(2026, 10, 26), date(2026, 11, 2), date(2026, 11, 2)]);
}

#[test]
fn end_date_is_probed_even_off_stride() {
    // Bi-weekly from 19.10.: 19.10., 02.11.; the end date 09.11. is off stride.
    let probes = recurrence_probe_dates(Weekday::Mon, monday(), date(2026, 11, 9), 2, monday());
    assert_eq!(probes, vec![date(2026, 10, 19), date(2026, 11, 2), date(2026, 11, 9)]);
}

#[test]
fn past_dates_are_not_probed() {
    let today = date(2026, 10, 27);
    let probes = recurrence_probe_dates(Weekday::Mon, monday(), date(2026, 11, 9), 1, today);
    assert_eq!(probes, vec![date(2026, 11, 2), date(2026, 11, 9), date(2026, 11, 9)]);
}

#[test]
fn recurring_conflicts_skip_cancelled_dates() {
    let mut daylist = Daylist::new();
    for (id, day) in [("w1", 19), ("w2", 26)] {
        daylist.add_appointment(single(id, "t1", "Anna", date(2026, 10, day), "10:00", "10:30"));
    }
    daylist.add_appointment(single("w3", "t1", "Anna", date(2026, 11, 2), "10:00", "10:30"));
    daylist.add_appointment(single("w4", "t1", "Anna", date(2026, 11, 9), "10:00", "10:30"));

    let cancellations = vec![Cancellation::new(date(2026, 10, 26), "Anna")];
    let query = RecurrenceQuery {
        weekday: Weekday::Mon,
        therapist_id: "t1",
        start: slot("10:00"),
        end: slot("10:30"),
        start_date: monday(),
        end_date: date(2026, 11, 9),
        interval_weeks: 1,
        cancellations: &cancellations,
    };

    let conflicts = daylist.recurring_conflicts(&query, monday());
    let ids: Vec<&str> = conflicts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["w1", "w3", "w4"]);
}

#[test]
fn recurring_conflicts_follow_the_interval() {
    let mut daylist = Daylist::new();
    daylist.add_appointment(single("on", "t1", "Anna", date(2026, 11, 2), "10:00", "10:30"));
    daylist.add_appointment(single("off", "t1", "Anna", date(2026, 10, 26), "10:00", "10:30"));

    let query = RecurrenceQuery {
        weekday: Weekday::Mon,
        therapist_id: "t1",
        start: slot("10:00"),
        end: slot("10:30"),
        start_date: monday(),
        end_date: date(2026, 11, 2),
        interval_weeks: 2,
        cancellations: &[],
    };

    let conflicts = daylist.recurring_conflicts(&query, monday());
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, AppointmentId::new("on"));
}
