use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionLog;
use crate::model::Tracker;
use crate::schedule::due_count;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    /// Completions on the busiest single day.
    pub best_period: usize,
    /// Days in the logged span where every due tracker got a mark.
    pub ideal_days: usize,
    pub completed_today: usize,
    /// Completions per day over the logged span, rounded half up.
    pub average: usize,
}

pub fn compute_statistics(
    trackers: &[Tracker],
    log: &CompletionLog,
    today: NaiveDate,
) -> Statistics {
    let per_day = completions_per_day(log);
    let (Some(first), Some(last)) = (
        per_day.keys().next().copied(),
        per_day.keys().next_back().copied(),
    ) else {
        return Statistics::default();
    };

    let span_days = (last - first).num_days() as usize + 1;
    let ideal_days = first
        .iter_days()
        .take(span_days)
        .filter(|day| {
            let due = due_count(trackers, *day);
            due > 0 && per_day.get(day).copied().unwrap_or(0) == due
        })
        .count();

    Statistics {
        best_period: per_day.values().copied().max().unwrap_or(0),
        ideal_days,
        completed_today: per_day.get(&today).copied().unwrap_or(0),
        average: rounded_average(log.len(), span_days),
    }
}

fn completions_per_day(log: &CompletionLog) -> BTreeMap<NaiveDate, usize> {
    let mut per_day = BTreeMap::new();
    for record in log {
        *per_day.entry(record.date).or_insert(0) += 1;
    }
    per_day
}

fn rounded_average(total: usize, days: usize) -> usize {
    if days == 0 {
        return 0;
    }
    (2 * total + days) / (2 * days)
}
