use chrono::NaiveDate;
use thiserror::Error;

use crate::model::TrackerId;

/// Rejections raised while turning user input into model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("schedule must list exactly 7 weekdays, got {len}")]
    ScheduleLength { len: usize },
    #[error("schedule must select at least one weekday")]
    EmptySchedule,
    #[error("tracker name must not be blank")]
    EmptyName,
    #[error("tracker name is {len} characters long, the limit is {max}")]
    NameTooLong { max: usize, len: usize },
    #[error("tracker needs an emoji")]
    MissingEmoji,
    #[error("tracker needs a color")]
    MissingColor,
    #[error("category title must not be blank")]
    EmptyCategoryTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("unknown tracker `{0}`")]
    UnknownTracker(TrackerId),
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("category `{0}` already exists")]
    DuplicateCategory(String),
    #[error("cannot mark {date} before it happens (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
}
