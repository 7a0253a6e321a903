use chrono::{Datelike, NaiveDate};

use crate::model::Tracker;

/// Whether `tracker` should be offered on `date`. Irregular trackers are
/// always due, scheduled ones follow their weekday flags.
pub fn is_due(tracker: &Tracker, date: NaiveDate) -> bool {
    match &tracker.schedule {
        None => true,
        Some(schedule) => schedule.is_due_on(date.weekday()),
    }
}

pub fn due_count(trackers: &[Tracker], date: NaiveDate) -> usize {
    trackers
        .iter()
        .filter(|tracker| is_due(tracker, date))
        .count()
}
