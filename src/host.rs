//! Collaborators supplied by whatever hosts the controller: a wall clock, an
//! identifier source and a way to ask the user questions.

use time::OffsetDateTime;
use uuid::Uuid;

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

pub trait IdGenerator {
    fn next_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Blocking question/answer dialogs. `None` from `prompt` means cancelled.
pub trait Prompter {
    fn confirm(&mut self, message: &str) -> bool;
    fn prompt(&mut self, label: &str) -> Option<String>;
}

/// An answer collected ahead of time, e.g. from a modal overlay that has
/// already been resolved by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Confirmed,
    Declined,
    Text(String),
    Cancelled,
}

impl Prompter for PromptAnswer {
    fn confirm(&mut self, _message: &str) -> bool {
        matches!(self, PromptAnswer::Confirmed)
    }

    fn prompt(&mut self, _label: &str) -> Option<String> {
        match self {
            PromptAnswer::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}
