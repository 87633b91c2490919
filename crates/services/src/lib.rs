#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;
pub mod study_service;

pub use vocab_core::Clock;

pub use error::{SessionError, StudyServiceError};
pub use study_service::{PersistedReview, StudyService};

pub use sessions::{
    SessionAnswerResult, SessionLoopService, SessionProgress, SessionReview, StudySession,
};
