use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::TrackerId;

/// Collapses a point in time to the calendar day it falls on.
pub trait IntoDay {
    fn into_day(self) -> NaiveDate;
}

impl IntoDay for NaiveDate {
    fn into_day(self) -> NaiveDate {
        self
    }
}

impl IntoDay for NaiveDateTime {
    fn into_day(self) -> NaiveDate {
        self.date()
    }
}

/// Uses the calendar date in the timestamp's own zone, so a `DateTime<Local>`
/// lands on the local day.
impl<Tz: TimeZone> IntoDay for DateTime<Tz> {
    fn into_day(self) -> NaiveDate {
        self.date_naive()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompletionRecord {
    pub tracker_id: TrackerId,
    pub date: NaiveDate,
}

impl CompletionRecord {
    pub fn new(tracker_id: TrackerId, date: impl IntoDay) -> Self {
        Self {
            tracker_id,
            date: date.into_day(),
        }
    }
}

/// Set of completion marks; holds at most one record per tracker and day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CompletionLog {
    records: BTreeSet<CompletionRecord>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the mark for the tracker on that day and returns whether it is
    /// now completed.
    pub fn toggle(&mut self, tracker_id: TrackerId, date: impl IntoDay) -> bool {
        let record = CompletionRecord::new(tracker_id, date);
        if self.records.remove(&record) {
            false
        } else {
            self.records.insert(record);
            true
        }
    }

    pub fn is_completed(&self, tracker_id: TrackerId, date: impl IntoDay) -> bool {
        self.records
            .contains(&CompletionRecord::new(tracker_id, date))
    }

    /// Number of days the tracker has ever been marked done.
    pub fn days_completed(&self, tracker_id: TrackerId) -> usize {
        self.records
            .iter()
            .filter(|record| record.tracker_id == tracker_id)
            .count()
    }

    pub fn records_on(&self, date: impl IntoDay) -> impl Iterator<Item = &CompletionRecord> {
        let date = date.into_day();
        self.records.iter().filter(move |record| record.date == date)
    }

    /// Drops every record of the tracker, returning how many were removed.
    pub fn remove_tracker(&mut self, tracker_id: TrackerId) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.tracker_id != tracker_id);
        before - self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<CompletionRecord> for CompletionLog {
    fn from_iter<I: IntoIterator<Item = CompletionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CompletionLog {
    type Item = &'a CompletionRecord;
    type IntoIter = std::collections::btree_set::Iter<'a, CompletionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Returns the log with the (tracker, day) mark flipped. Applying it twice
/// with the same arguments yields the original log.
pub fn toggle_completion(
    mut log: CompletionLog,
    tracker_id: TrackerId,
    date: impl IntoDay,
) -> CompletionLog {
    log.toggle(tracker_id, date);
    log
}
