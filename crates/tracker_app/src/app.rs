use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};
use tracker_core::{Board, BoardQuery, EmptyState, Statistics, StatusFilter, TrackerStore};

const DEFAULT_STORE: &str = "habits.json";
const DEFAULT_CATEGORIES: [&str; 3] = ["Health", "Home comfort", "Important"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) status: StatusFilter,
    pub(crate) search: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Reads settings through `lookup`; unusable values are logged and
    /// replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_STORE") {
            if !path.trim().is_empty() {
                config.store_path = PathBuf::from(path.trim());
            }
        }
        if let Some(raw) = lookup("HABIT_DATE") {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => config.date = Some(date),
                Err(err) => warn!(value = %raw, %err, "ignoring HABIT_DATE"),
            }
        }
        if let Some(raw) = lookup("HABIT_FILTER") {
            match raw.parse::<StatusFilter>() {
                Ok(status) => config.status = status,
                Err(err) => warn!(%err, "ignoring HABIT_FILTER"),
            }
        }
        if let Some(search) = lookup("HABIT_SEARCH") {
            config.search = search;
        }
        config
    }

    pub(crate) fn query(&self, today: NaiveDate) -> BoardQuery {
        let mut query = BoardQuery::new(self.date.unwrap_or(today)).with_search(self.search.clone());
        query.select_status(self.status, today);
        query
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE),
            date: None,
            status: StatusFilter::All,
            search: String::new(),
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let today = Local::now().date_naive();
    let store = TrackerStore::builder()
        .with_path(&config.store_path)
        .with_categories(DEFAULT_CATEGORIES)
        .build()
        .with_context(|| format!("opening {}", config.store_path.display()))?;
    let snapshot = store.snapshot();
    let query = config.query(today);
    info!(date = %query.date, status = %query.status, "rendering board");

    let board = snapshot.board(&query, today);
    let stats = snapshot.statistics(today);
    print!("{}", render(&board, &stats, !snapshot.trackers.is_empty()));
    Ok(())
}

pub fn render(board: &Board, stats: &Statistics, has_trackers: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trackers for {}", board.date);
    match board.empty_state {
        Some(EmptyState::NothingToTrack) => {
            let _ = writeln!(out, "  What are we going to track?");
        }
        Some(EmptyState::NothingFound) => {
            let _ = writeln!(out, "  Nothing found");
        }
        None => {}
    }
    for section in &board.sections {
        let _ = writeln!(out, "{}", section.category.title);
        for card in &section.cards {
            let mark = match (card.completed, card.can_toggle) {
                (true, _) => "[x]",
                (false, true) => "[ ]",
                (false, false) => "[-]",
            };
            let pin = if card.tracker.pinned { " (pinned)" } else { "" };
            let _ = writeln!(
                out,
                "  {mark} {} {}{pin}: {} days",
                card.tracker.emoji, card.tracker.name, card.days_completed
            );
        }
    }

    let _ = writeln!(out, "Statistics");
    if !has_trackers {
        let _ = writeln!(out, "  Nothing to analyze yet");
        return out;
    }
    let _ = writeln!(out, "  Best period: {}", stats.best_period);
    let _ = writeln!(out, "  Ideal days: {}", stats.ideal_days);
    let _ = writeln!(out, "  Trackers completed: {}", stats.completed_today);
    let _ = writeln!(out, "  Average value: {}", stats.average);
    out
}
