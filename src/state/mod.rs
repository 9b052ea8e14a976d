//! State module for tracking crawl task progress
//!
//! # Components
//!
//! - `TaskState`: lifecycle of one crawl task (pending, running, done)
//! - `TaskOutcome`: how a finished task ended

mod task_state;

pub use task_state::{TaskOutcome, TaskState};
