#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod time;

pub use error::Error;
pub use queue::{QueueBuilder, StudyQueue};
pub use scheduler::{AppliedReview, Scheduler};
pub use time::Clock;
