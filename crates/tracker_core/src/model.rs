use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Longest tracker name the creation form accepts.
pub const MAX_NAME_LEN: usize = 38;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TrackerId(Uuid);

impl TrackerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Weekly due flags, index 0 is Monday and index 6 is Sunday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "Vec<bool>", into = "Vec<bool>")]
pub struct Schedule {
    days: [bool; 7],
}

impl Schedule {
    pub fn from_days(days: &[bool]) -> Result<Self, ValidationError> {
        let days: [bool; 7] = days
            .try_into()
            .map_err(|_| ValidationError::ScheduleLength { len: days.len() })?;
        if !days.iter().any(|due| *due) {
            return Err(ValidationError::EmptySchedule);
        }
        Ok(Self { days })
    }

    pub fn every_day() -> Self {
        Self { days: [true; 7] }
    }

    pub fn on(weekdays: &[Weekday]) -> Result<Self, ValidationError> {
        let mut days = [false; 7];
        for weekday in weekdays {
            days[weekday_index(*weekday)] = true;
        }
        Self::from_days(&days)
    }

    pub fn days(&self) -> &[bool; 7] {
        &self.days
    }

    pub fn is_due_on(&self, weekday: Weekday) -> bool {
        self.days[weekday_index(weekday)]
    }
}

impl TryFrom<Vec<bool>> for Schedule {
    type Error = ValidationError;

    fn try_from(days: Vec<bool>) -> Result<Self, Self::Error> {
        Self::from_days(&days)
    }
}

impl From<Schedule> for Vec<bool> {
    fn from(schedule: Schedule) -> Self {
        schedule.days.to_vec()
    }
}

/// Canonical weekday numbering used everywhere in the crate: Monday is 0.
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tracker {
    pub id: TrackerId,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub pinned: bool,
    /// Title of the owning category. `None` or a title that matches no
    /// category leaves the tracker orphaned.
    pub category: Option<String>,
}

impl Tracker {
    pub fn from_draft(draft: TrackerDraft) -> Result<Self, ValidationError> {
        Self::with_id(TrackerId::new(), draft)
    }

    pub fn with_id(id: TrackerId, draft: TrackerDraft) -> Result<Self, ValidationError> {
        let draft = draft.validated()?;
        Ok(Self {
            id,
            name: draft.name,
            emoji: draft.emoji,
            color: draft.color,
            schedule: draft.schedule,
            pinned: false,
            category: Some(draft.category),
        })
    }

    pub fn is_irregular(&self) -> bool {
        self.schedule.is_none()
    }
}

/// User input for creating or editing a tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerDraft {
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub schedule: Option<Schedule>,
    pub category: String,
}

impl TrackerDraft {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emoji: "🙂".to_string(),
            color: "Color selection 1".to_string(),
            schedule: None,
            category: category.into(),
        }
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    fn validated(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let len = self.name.chars().count();
        if len > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                max: MAX_NAME_LEN,
                len,
            });
        }
        if self.emoji.trim().is_empty() {
            return Err(ValidationError::MissingEmoji);
        }
        if self.color.trim().is_empty() {
            return Err(ValidationError::MissingColor);
        }
        self.category = normalize_title(&self.category)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Category {
    pub title: String,
}

impl Category {
    pub fn new(title: impl AsRef<str>) -> Result<Self, ValidationError> {
        Ok(Self {
            title: normalize_title(title.as_ref())?,
        })
    }
}

pub(crate) fn normalize_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyCategoryTitle);
    }
    Ok(title.to_string())
}
