use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionLog;
use crate::model::{Category, Tracker};
use crate::schedule::is_due;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Today,
    Completed,
    Incomplete,
}

impl StatusFilter {
    pub const VARIANTS: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Today,
        StatusFilter::Completed,
        StatusFilter::Incomplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Today => "today",
            StatusFilter::Completed => "completed",
            StatusFilter::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::VARIANTS
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown status filter `{wanted}`"))
    }
}

/// Date, search text and status filter currently applied to the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardQuery {
    pub date: NaiveDate,
    pub search: String,
    pub status: StatusFilter,
}

impl BoardQuery {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            search: String::new(),
            status: StatusFilter::All,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Applies a filter choice. Choosing [`StatusFilter::Today`] also moves
    /// the board back to `today`.
    pub fn select_status(&mut self, status: StatusFilter, today: NaiveDate) {
        self.status = status;
        if status == StatusFilter::Today {
            self.date = today;
        }
    }

    fn matches_search(&self, tracker: &Tracker) -> bool {
        if self.search.is_empty() {
            return true;
        }
        tracker
            .name
            .to_lowercase()
            .contains(&self.search.to_lowercase())
    }

    fn matches_status(&self, tracker: &Tracker, log: &CompletionLog) -> bool {
        match self.status {
            StatusFilter::All | StatusFilter::Today => true,
            StatusFilter::Completed => log.is_completed(tracker.id, self.date),
            StatusFilter::Incomplete => !log.is_completed(tracker.id, self.date),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerGroup {
    pub category: Category,
    pub trackers: Vec<Tracker>,
}

/// Trackers to show for `query`, bucketed by category. Categories come out
/// sorted by title and trackers by name; empty categories are left out, and
/// so are trackers whose category is unknown.
pub fn visible_trackers(
    categories: &[Category],
    trackers: &[Tracker],
    query: &BoardQuery,
    log: &CompletionLog,
) -> Vec<TrackerGroup> {
    let mut buckets: BTreeMap<&str, Vec<Tracker>> = BTreeMap::new();

    for tracker in trackers
        .iter()
        .filter(|tracker| is_due(tracker, query.date))
        .filter(|tracker| query.matches_search(tracker))
        .filter(|tracker| query.matches_status(tracker, log))
    {
        let Some(category) = tracker
            .category
            .as_deref()
            .and_then(|title| categories.iter().find(|category| category.title == title))
        else {
            tracing::debug!(
                tracker = %tracker.id,
                name = %tracker.name,
                "skipping tracker without a known category"
            );
            continue;
        };
        buckets
            .entry(category.title.as_str())
            .or_default()
            .push(tracker.clone());
    }

    buckets
        .into_iter()
        .map(|(title, mut trackers)| {
            trackers.sort_by(|a, b| a.name.cmp(&b.name));
            TrackerGroup {
                category: Category {
                    title: title.to_string(),
                },
                trackers,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerCard {
    pub tracker: Tracker,
    pub completed: bool,
    pub days_completed: usize,
    /// Future days cannot be marked.
    pub can_toggle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardSection {
    pub category: Category,
    pub cards: Vec<TrackerCard>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmptyState {
    /// Nothing is scheduled for the day.
    NothingToTrack,
    /// The search text or the status filter removed everything.
    NothingFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pub date: NaiveDate,
    pub sections: Vec<BoardSection>,
    pub empty_state: Option<EmptyState>,
    pub has_due_trackers: bool,
}

impl Board {
    pub fn card_count(&self) -> usize {
        self.sections.iter().map(|section| section.cards.len()).sum()
    }
}

pub fn build_board(
    categories: &[Category],
    trackers: &[Tracker],
    query: &BoardQuery,
    log: &CompletionLog,
    today: NaiveDate,
) -> Board {
    let can_toggle = query.date <= today;
    let sections: Vec<BoardSection> = visible_trackers(categories, trackers, query, log)
        .into_iter()
        .map(|group| BoardSection {
            category: group.category,
            cards: group
                .trackers
                .into_iter()
                .map(|tracker| TrackerCard {
                    completed: log.is_completed(tracker.id, query.date),
                    days_completed: log.days_completed(tracker.id),
                    can_toggle,
                    tracker,
                })
                .collect(),
        })
        .collect();

    let narrowed = !query.search.is_empty()
        || matches!(
            query.status,
            StatusFilter::Completed | StatusFilter::Incomplete
        );
    let empty_state = match (sections.is_empty(), narrowed) {
        (false, _) => None,
        (true, true) => Some(EmptyState::NothingFound),
        (true, false) => Some(EmptyState::NothingToTrack),
    };

    Board {
        date: query.date,
        has_due_trackers: trackers.iter().any(|tracker| is_due(tracker, query.date)),
        sections,
        empty_state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schedule, TrackerDraft};
    use chrono::Weekday;

    // 2024-01-01 is a Monday.
    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn tracker(name: &str, category: &str, schedule: Option<Schedule>) -> Tracker {
        let mut draft = TrackerDraft::new(name, category);
        draft.schedule = schedule;
        Tracker::from_draft(draft).unwrap()
    }

    fn categories(titles: &[&str]) -> Vec<Category> {
        titles.iter().map(|title| Category::new(title).unwrap()).collect()
    }

    fn names(groups: &[TrackerGroup]) -> Vec<(String, Vec<String>)> {
        groups
            .iter()
            .map(|group| {
                (
                    group.category.title.clone(),
                    group.trackers.iter().map(|t| t.name.clone()).collect(),
                )
            })
            .collect()
    }

    fn fixture() -> (Vec<Category>, Vec<Tracker>) {
        let mwf = Schedule::on(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]).unwrap();
        let trackers = vec![
            tracker("Water plants", "Home", Some(mwf)),
            tracker("Vacuum", "Home", Some(Schedule::every_day())),
            tracker("Run", "Health", Some(Schedule::on(&[Weekday::Tue]).unwrap())),
            tracker("Drink water", "Health", None),
            tracker("Tax return", "Admin", None),
        ];
        (categories(&["Home", "Health", "Admin", "Empty"]), trackers)
    }

    #[test]
    fn plain_query_returns_due_trackers_sorted() {
        let (cats, trackers) = fixture();
        let groups = visible_trackers(&cats, &trackers, &BoardQuery::new(day(2)), &CompletionLog::new());
        assert_eq!(
            names(&groups),
            vec![
                ("Admin".to_string(), vec!["Tax return".to_string()]),
                (
                    "Health".to_string(),
                    vec!["Drink water".to_string(), "Run".to_string()]
                ),
                ("Home".to_string(), vec!["Vacuum".to_string()]),
            ]
        );
    }

    #[test]
    fn water_plants_shows_on_wednesday_only() {
        let (cats, trackers) = fixture();
        let log = CompletionLog::new();
        let query = BoardQuery::new(day(2)).with_search("water plants");
        assert!(visible_trackers(&cats, &trackers, &query, &log).is_empty());

        let query = BoardQuery::new(day(3)).with_search("water plants");
        assert_eq!(
            names(&visible_trackers(&cats, &trackers, &query, &log)),
            vec![("Home".to_string(), vec!["Water plants".to_string()])]
        );
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let (cats, trackers) = fixture();
        let query = BoardQuery::new(day(3)).with_search("WATER");
        let groups = visible_trackers(&cats, &trackers, &query, &CompletionLog::new());
        assert_eq!(
            names(&groups),
            vec![
                ("Health".to_string(), vec!["Drink water".to_string()]),
                ("Home".to_string(), vec!["Water plants".to_string()]),
            ]
        );
    }

    #[test]
    fn completed_and_incomplete_split_by_marks_on_date() {
        let (cats, trackers) = fixture();
        let vacuum = trackers.iter().find(|t| t.name == "Vacuum").unwrap().id;
        let mut log = CompletionLog::new();
        log.toggle(vacuum, day(3));
        // A mark on another day must not count.
        let drink = trackers.iter().find(|t| t.name == "Drink water").unwrap().id;
        log.toggle(drink, day(2));

        let done = BoardQuery::new(day(3)).with_status(StatusFilter::Completed);
        assert_eq!(
            names(&visible_trackers(&cats, &trackers, &done, &log)),
            vec![("Home".to_string(), vec!["Vacuum".to_string()])]
        );

        let open = BoardQuery::new(day(3)).with_status(StatusFilter::Incomplete);
        let groups = visible_trackers(&cats, &trackers, &open, &log);
        let all: Vec<String> = groups
            .iter()
            .flat_map(|g| g.trackers.iter().map(|t| t.name.clone()))
            .collect();
        assert_eq!(all, vec!["Tax return", "Drink water", "Water plants"]);
    }

    #[test]
    fn irregular_trackers_stay_visible_after_completion() {
        let (cats, trackers) = fixture();
        let tax = trackers.iter().find(|t| t.name == "Tax return").unwrap().id;
        let mut log = CompletionLog::new();
        log.toggle(tax, day(4));
        for d in 4..8 {
            let groups = visible_trackers(&cats, &trackers, &BoardQuery::new(day(d)), &log);
            assert!(groups.iter().any(|g| g.category.title == "Admin"));
        }
    }

    #[test]
    fn selecting_today_resets_the_date() {
        let mut query = BoardQuery::new(day(10));
        query.select_status(StatusFilter::Completed, day(20));
        assert_eq!(query.date, day(10));
        query.select_status(StatusFilter::Today, day(20));
        assert_eq!(query.date, day(20));
        assert_eq!(query.status, StatusFilter::Today);

        let (cats, trackers) = fixture();
        let log = CompletionLog::new();
        let today = visible_trackers(&cats, &trackers, &query, &log);
        let all = visible_trackers(&cats, &trackers, &BoardQuery::new(day(20)), &log);
        assert_eq!(today, all);
    }

    #[test]
    fn orphans_are_excluded() {
        let (cats, mut trackers) = fixture();
        trackers.push(tracker("Lost", "Deleted", None));
        let mut homeless = tracker("Nowhere", "Home", None);
        homeless.category = None;
        trackers.push(homeless);

        let groups = visible_trackers(&cats, &trackers, &BoardQuery::new(day(1)), &CompletionLog::new());
        assert!(groups
            .iter()
            .flat_map(|g| &g.trackers)
            .all(|t| t.name != "Lost" && t.name != "Nowhere"));
        assert!(groups.iter().all(|g| g.category.title != "Deleted"));
    }

    #[test]
    fn sorting_is_ordinal() {
        let cats = categories(&["b", "B", "a"]);
        let trackers = vec![
            tracker("zeta", "b", None),
            tracker("Zeta", "b", None),
            tracker("alpha", "B", None),
            tracker("x", "a", None),
        ];
        let groups = visible_trackers(&cats, &trackers, &BoardQuery::new(day(1)), &CompletionLog::new());
        assert_eq!(
            names(&groups),
            vec![
                ("B".to_string(), vec!["alpha".to_string()]),
                ("a".to_string(), vec!["x".to_string()]),
                (
                    "b".to_string(),
                    vec!["Zeta".to_string(), "zeta".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn repeated_calls_agree() {
        let (cats, trackers) = fixture();
        let mut log = CompletionLog::new();
        log.toggle(trackers[1].id, day(5));
        let query = BoardQuery::new(day(5)).with_status(StatusFilter::Incomplete);
        let first = visible_trackers(&cats, &trackers, &query, &log);
        let second = visible_trackers(&cats, &trackers, &query, &log);
        assert_eq!(first, second);
    }

    #[test]
    fn parses_status_names() {
        assert_eq!("Today".parse::<StatusFilter>().unwrap(), StatusFilter::Today);
        assert_eq!(
            " incomplete ".parse::<StatusFilter>().unwrap(),
            StatusFilter::Incomplete
        );
        assert!("pending".parse::<StatusFilter>().is_err());
        for filter in StatusFilter::VARIANTS {
            assert_eq!(filter.to_string().parse::<StatusFilter>().unwrap(), filter);
        }
    }

    #[test]
    fn board_marks_cards_and_locks_future_days() {
        let (cats, trackers) = fixture();
        let vacuum = trackers.iter().find(|t| t.name == "Vacuum").unwrap().id;
        let mut log = CompletionLog::new();
        log.toggle(vacuum, day(1));
        log.toggle(vacuum, day(3));

        let board = build_board(&cats, &trackers, &BoardQuery::new(day(3)), &log, day(3));
        assert_eq!(board.empty_state, None);
        assert!(board.has_due_trackers);
        let card = board
            .sections
            .iter()
            .flat_map(|s| &s.cards)
            .find(|c| c.tracker.id == vacuum)
            .unwrap();
        assert!(card.completed);
        assert_eq!(card.days_completed, 2);
        assert!(card.can_toggle);

        let future = build_board(&cats, &trackers, &BoardQuery::new(day(4)), &log, day(3));
        assert!(future
            .sections
            .iter()
            .flat_map(|s| &s.cards)
            .all(|c| !c.can_toggle && !c.completed));
    }

    #[test]
    fn board_reports_why_it_is_empty() {
        let cats = categories(&["Health"]);
        let trackers = vec![tracker(
            "Run",
            "Health",
            Some(Schedule::on(&[Weekday::Tue]).unwrap()),
        )];
        let log = CompletionLog::new();

        let monday = build_board(&cats, &trackers, &BoardQuery::new(day(1)), &log, day(1));
        assert_eq!(monday.empty_state, Some(EmptyState::NothingToTrack));
        assert!(!monday.has_due_trackers);

        let query = BoardQuery::new(day(2)).with_search("swim");
        let searched = build_board(&cats, &trackers, &query, &log, day(2));
        assert_eq!(searched.empty_state, Some(EmptyState::NothingFound));
        assert!(searched.has_due_trackers);

        let query = BoardQuery::new(day(2)).with_status(StatusFilter::Completed);
        let filtered = build_board(&cats, &trackers, &query, &log, day(2));
        assert_eq!(filtered.empty_state, Some(EmptyState::NothingFound));
        assert_eq!(filtered.card_count(), 0);
    }

    #[test]
    fn blank_search_is_still_a_search() {
        let cats = categories(&["Health"]);
        let trackers = vec![tracker("Run", "Health", Some(Schedule::every_day()))];
        let query = BoardQuery::new(day(2)).with_search("  ");

        let board = build_board(&cats, &trackers, &query, &CompletionLog::new(), day(2));
        assert_eq!(board.card_count(), 0);
        assert!(board.has_due_trackers);
        assert_eq!(board.empty_state, Some(EmptyState::NothingFound));
    }
}
