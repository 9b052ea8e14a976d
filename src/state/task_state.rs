/// Task state definitions for tracking a crawl task through one wave
///
/// A task moves `Pending -> Running -> Done` and never leaves `Done`.
/// Tasks still `Pending` when the wave deadline passes go straight to `Done`
/// with [`TaskOutcome::Abandoned`].
use std::fmt;

/// Lifecycle state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Queued, waiting for a worker slot
    Pending,

    /// Slot held, fetch and extraction in progress
    Running,

    /// Result or error recorded, slot released
    Done,
}

impl TaskState {
    /// Checks whether a transition to `next` is allowed
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Pending, Self::Done) | (Self::Running, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a task that reached [`TaskState::Done`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// An article was extracted and queued for the result sink
    Article,

    /// The page was fetched for link discovery only (e.g. an index seed page)
    Discovered,

    /// The article already exists in the persistent store
    AlreadyIngested,

    /// Fetching the page failed
    FetchFailed(String),

    /// The dedup existence query failed and policy says abort
    QueryFailed(String),

    /// The wave deadline passed before a slot was acquired
    Abandoned,
}
