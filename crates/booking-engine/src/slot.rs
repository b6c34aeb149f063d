//! The booking-day time grid.
//!
//! A [`Slot`] is an ordinal on a fixed 10-minute grid starting at 07:00
//! (index 0 = "7:00", index 1 = "7:10", ...). Every interval comparison in the
//! engine runs on these ordinals. Schedule documents carry times either as a
//! label (`"8:00"`) or as a raw index (`6`); both are normalized into a `Slot`
//! the moment they are deserialized, so labels never travel past ingestion.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, Result};

/// First hour of the grid.
pub const GRID_START_HOUR: u16 = 7;
/// Hour at which the grid ends (exclusive).
pub const GRID_END_HOUR: u16 = 21;
/// Minutes covered by one slot.
pub const SLOT_MINUTES: u32 = 10;
pub const SLOTS_PER_HOUR: u16 = 6;
/// Number of labelled slots, 7:00 through 20:50.
pub const SLOT_COUNT: u16 = (GRID_END_HOUR - GRID_START_HOUR) * SLOTS_PER_HOUR;

static LABELS: LazyLock<Vec<String>> =
    LazyLock::new(|| (0..SLOT_COUNT).map(arithmetic_label).collect());

fn label_table() -> &'static [String] {
    &LABELS
}

fn arithmetic_label(index: u16) -> String {
    let hour = GRID_START_HOUR + index / SLOTS_PER_HOUR;
    let minute = (index % SLOTS_PER_HOUR) * SLOT_MINUTES as u16;
    format!("{}:{:02}", hour, minute)
}

/// A position on the 10-minute booking grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u16);

impl Slot {
    pub const fn from_index(index: u16) -> Self {
        Slot(index)
    }

    pub const fn index(self) -> u16 {
        self.0
    }

    /// Parse an `H:MM` label.
    ///
    /// The canonical label table is authoritative; labels it does not contain
    /// (`"08:00"`, `"21:00"`) are reconstructed arithmetically as
    /// `(hour - 7) * 6 + minute / 10`.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidTime`] when the label is not `H:MM`, lies
    /// outside 07:00-24:00, or falls between grid lines.
    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim();
        if let Some(position) = label_table().iter().position(|l| l == label) {
            return Ok(Slot(position as u16));
        }

        let invalid = || EngineError::InvalidTime(label.to_string());
        let (hour, minute) = label.split_once(':').ok_or_else(invalid)?;
        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;

        if !(GRID_START_HOUR..=24).contains(&hour) || minute >= 60 || minute % SLOT_MINUTES as u16 != 0 {
            return Err(invalid());
        }

        Ok(Slot(
            (hour - GRID_START_HOUR) * SLOTS_PER_HOUR + minute / SLOT_MINUTES as u16,
        ))
    }

    /// The `H:MM` label of this slot.
    pub fn label(self) -> String {
        label_table()
            .get(self.0 as usize)
            .cloned()
            .unwrap_or_else(|| arithmetic_label(self.0))
    }

    /// The slot `steps` grid lines later.
    pub fn offset(self, steps: u16) -> Slot {
        Slot(self.0 + steps)
    }

    /// Whether the slot has an entry in the canonical label table.
    pub fn is_on_grid(self) -> bool {
        self.0 < SLOT_COUNT
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Convert a duration into a number of grid steps.
///
/// Returns `None` unless `minutes` is a positive exact multiple of
/// [`SLOT_MINUTES`].
pub fn steps_for_minutes(minutes: u32) -> Option<u16> {
    if minutes == 0 || minutes % SLOT_MINUTES != 0 {
        return None;
    }
    u16::try_from(minutes / SLOT_MINUTES).ok()
}

/// Every slot label from 7:00 to 20:50, preceded by the empty "unselected"
/// entry used by selection lists.
pub fn all_labels() -> Vec<&'static str> {
    std::iter::once("")
        .chain(label_table().iter().map(String::as_str))
        .collect()
}

/// A time as it appears in a stored document: a label or a raw index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Index(u16),
    Label(String),
}

impl TimeValue {
    pub fn normalize(&self) -> Result<Slot> {
        match self {
            TimeValue::Index(index) => Ok(Slot(*index)),
            TimeValue::Label(label) => Slot::from_label(label),
        }
    }
}

impl From<Slot> for TimeValue {
    fn from(slot: Slot) -> Self {
        TimeValue::Label(slot.label())
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        TimeValue::deserialize(deserializer)?
            .normalize()
            .map_err(serde::de::Error::custom)
    }
}

