use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    completion::{CompletionLog, IntoDay},
    error::StoreError,
    filter::{self, Board, BoardQuery, TrackerGroup},
    model::{normalize_title, Category, Tracker, TrackerDraft, TrackerId},
    stats::{self, Statistics},
};

/// Everything the store holds, as handed to the board and statistics code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub categories: Vec<Category>,
    pub trackers: Vec<Tracker>,
    #[serde(default)]
    pub completions: CompletionLog,
}

impl StoreSnapshot {
    pub fn visible_trackers(&self, query: &BoardQuery) -> Vec<TrackerGroup> {
        filter::visible_trackers(&self.categories, &self.trackers, query, &self.completions)
    }

    pub fn board(&self, query: &BoardQuery, today: NaiveDate) -> Board {
        filter::build_board(
            &self.categories,
            &self.trackers,
            query,
            &self.completions,
            today,
        )
    }

    pub fn statistics(&self, today: NaiveDate) -> Statistics {
        stats::compute_statistics(&self.trackers, &self.completions, today)
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.trackers.iter().find(|tracker| tracker.id == id)
    }

    fn tracker_mut(&mut self, id: TrackerId) -> Result<&mut Tracker, StoreError> {
        self.trackers
            .iter_mut()
            .find(|tracker| tracker.id == id)
            .ok_or(StoreError::UnknownTracker(id))
    }

    fn has_category(&self, title: &str) -> bool {
        self.categories.iter().any(|category| category.title == title)
    }

    fn require_category(&self, title: &str) -> Result<(), StoreError> {
        if self.has_category(title) {
            Ok(())
        } else {
            Err(StoreError::UnknownCategory(title.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    CategoryAdded { title: String },
    CategoryRenamed { from: String, to: String },
    CategoryDeleted { title: String, orphaned: usize },
    TrackerAdded { id: TrackerId },
    TrackerUpdated { id: TrackerId },
    TrackerDeleted { id: TrackerId },
    PinToggled { id: TrackerId, pinned: bool },
    CompletionToggled {
        id: TrackerId,
        date: NaiveDate,
        completed: bool,
    },
    Reloaded,
}

/// Receives one [`StoreChange`] after every successful mutation.
pub trait StoreObserver: Send + Sync {
    fn store_changed(&self, change: &StoreChange);
}

impl<F> StoreObserver for F
where
    F: Fn(&StoreChange) + Send + Sync,
{
    fn store_changed(&self, change: &StoreChange) {
        self(change)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct TrackerStore {
    path: Option<PathBuf>,
    state: RwLock<StoreSnapshot>,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn StoreObserver>)>>,
    next_subscription: AtomicU64,
}

pub struct TrackerStoreBuilder {
    path: Option<PathBuf>,
    observers: Vec<Arc<dyn StoreObserver>>,
    seed_categories: Vec<String>,
}

impl TrackerStoreBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            observers: Vec::new(),
            seed_categories: Vec::new(),
        }
    }

    /// Persist to this JSON file. It is loaded on build when present.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_observer(mut self, observer: impl StoreObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Categories to start with when there is no file to load.
    pub fn with_categories<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_categories
            .extend(titles.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<TrackerStore> {
        let state = match &self.path {
            Some(path) if path.exists() => read_snapshot(path)?,
            _ => {
                let mut snapshot = StoreSnapshot::default();
                for title in &self.seed_categories {
                    let category = Category::new(title)?;
                    if !snapshot.has_category(&category.title) {
                        snapshot.categories.push(category);
                    }
                }
                snapshot
            }
        };
        let store = TrackerStore {
            path: self.path,
            state: RwLock::new(state),
            observers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        };
        for observer in self.observers {
            store.subscribe_shared(observer);
        }
        Ok(store)
    }
}

impl Default for TrackerStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerStore {
    pub fn builder() -> TrackerStoreBuilder {
        TrackerStoreBuilder::new()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state.read().categories.clone()
    }

    pub fn trackers(&self) -> Vec<Tracker> {
        self.state.read().trackers.clone()
    }

    pub fn completions(&self) -> CompletionLog {
        self.state.read().completions.clone()
    }

    pub fn tracker(&self, id: TrackerId) -> Option<Tracker> {
        self.state.read().tracker(id).cloned()
    }

    pub fn subscribe(&self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        self.subscribe_shared(Arc::new(observer))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(candidate, _)| *candidate != id);
        observers.len() != before
    }

    #[instrument(skip(self))]
    pub fn add_category(&self, title: &str) -> Result<Category> {
        let category = Category::new(title)?;
        self.apply(|state| {
            if state.has_category(&category.title) {
                return Err(StoreError::DuplicateCategory(category.title.clone()));
            }
            state.categories.push(category.clone());
            let change = StoreChange::CategoryAdded {
                title: category.title.clone(),
            };
            Ok((category.clone(), change))
        })
    }

    /// Renames a category and moves its trackers along with it.
    #[instrument(skip(self))]
    pub fn rename_category(&self, from: &str, to: &str) -> Result<()> {
        let from = from.trim();
        let to = normalize_title(to).map_err(StoreError::from)?;
        self.apply(|state| {
            state.require_category(from)?;
            if from != to && state.has_category(&to) {
                return Err(StoreError::DuplicateCategory(to.clone()));
            }
            for category in state.categories.iter_mut().filter(|c| c.title == from) {
                category.title = to.clone();
            }
            for tracker in state
                .trackers
                .iter_mut()
                .filter(|t| t.category.as_deref() == Some(from))
            {
                tracker.category = Some(to.clone());
            }
            let change = StoreChange::CategoryRenamed {
                from: from.to_string(),
                to: to.clone(),
            };
            Ok(((), change))
        })
    }

    /// Removes the category. Its trackers keep the stale reference and drop
    /// off every board until they are moved to another category.
    #[instrument(skip(self))]
    pub fn delete_category(&self, title: &str) -> Result<usize> {
        let title = title.trim();
        self.apply(|state| {
            state.require_category(title)?;
            state.categories.retain(|category| category.title != title);
            let orphaned = state
                .trackers
                .iter()
                .filter(|t| t.category.as_deref() == Some(title))
                .count();
            if orphaned > 0 {
                warn!(category = title, orphaned, "deleted category still has trackers");
            }
            let change = StoreChange::CategoryDeleted {
                title: title.to_string(),
                orphaned,
            };
            Ok((orphaned, change))
        })
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add_tracker(&self, draft: TrackerDraft) -> Result<TrackerId> {
        let tracker = Tracker::from_draft(draft)?;
        self.apply(|state| {
            if let Some(title) = &tracker.category {
                state.require_category(title)?;
            }
            let id = tracker.id;
            state.trackers.push(tracker);
            Ok((id, StoreChange::TrackerAdded { id }))
        })
    }

    /// Replaces name, emoji, color, schedule and category. The pin survives.
    #[instrument(skip(self, draft))]
    pub fn update_tracker(&self, id: TrackerId, draft: TrackerDraft) -> Result<()> {
        let mut updated = Tracker::with_id(id, draft)?;
        self.apply(|state| {
            if let Some(title) = &updated.category {
                state.require_category(title)?;
            }
            let current = state.tracker_mut(id)?;
            updated.pinned = current.pinned;
            *current = updated;
            Ok(((), StoreChange::TrackerUpdated { id }))
        })
    }

    /// Deletes the tracker together with its completion history.
    #[instrument(skip(self))]
    pub fn delete_tracker(&self, id: TrackerId) -> Result<()> {
        self.apply(|state| {
            state.tracker_mut(id)?;
            state.trackers.retain(|tracker| tracker.id != id);
            let removed = state.completions.remove_tracker(id);
            debug!(removed, "dropped completion records");
            Ok(((), StoreChange::TrackerDeleted { id }))
        })
    }

    #[instrument(skip(self))]
    pub fn toggle_pinned(&self, id: TrackerId) -> Result<bool> {
        self.apply(|state| {
            let tracker = state.tracker_mut(id)?;
            tracker.pinned = !tracker.pinned;
            let pinned = tracker.pinned;
            Ok((pinned, StoreChange::PinToggled { id, pinned }))
        })
    }

    /// Flips the completion mark for the tracker on `date` and returns the
    /// new state. Days after `today` are refused.
    #[instrument(skip(self, date))]
    pub fn toggle_completion(
        &self,
        id: TrackerId,
        date: impl IntoDay,
        today: NaiveDate,
    ) -> Result<bool> {
        let date = date.into_day();
        if date > today {
            return Err(StoreError::FutureDate { date, today }.into());
        }
        self.apply(|state| {
            state.tracker_mut(id)?;
            let completed = state.completions.toggle(id, date);
            debug!(%date, completed, "toggled completion");
            let change = StoreChange::CompletionToggled {
                id,
                date,
                completed,
            };
            Ok((completed, change))
        })
    }

    /// Re-reads the backing file, replacing in-memory state.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let fresh = read_snapshot(path)?;
        *self.state.write() = fresh;
        self.notify(&StoreChange::Reloaded);
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let state = self.state.read();
        self.persist(&state)
    }
}

impl TrackerStore {
    fn subscribe_shared(&self, observer: Arc<dyn StoreObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Runs `op` on a copy of the state and commits it only when both the
    /// operation and the write to disk succeed.
    fn apply<T>(
        &self,
        op: impl FnOnce(&mut StoreSnapshot) -> Result<(T, StoreChange), StoreError>,
    ) -> Result<T> {
        let (value, change) = {
            let mut state = self.state.write();
            let mut next = state.clone();
            let (value, change) = op(&mut next)?;
            self.persist(&next)?;
            *state = next;
            (value, change)
        };
        debug!(?change, "store updated");
        self.notify(&change);
        Ok(value)
    }

    // Callbacks run without the observer lock held, so they may subscribe
    // or unsubscribe.
    fn notify(&self, change: &StoreChange) {
        let observers: Vec<Arc<dyn StoreObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.store_changed(change);
        }
    }

    fn persist(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let payload = serde_json::to_string_pretty(snapshot)?;
        fs::write(path, payload).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parsing tracker store {}", path.display()))?;
    info!(
        path = %path.display(),
        trackers = snapshot.trackers.len(),
        records = snapshot.completions.len(),
        "loaded tracker store"
    );
    Ok(snapshot)
}
