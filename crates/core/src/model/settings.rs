use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("daily goal must be > 0")]
    InvalidDailyGoal,

    #[error("new cards per session must be > 0")]
    InvalidNewCardsPerSession,

    #[error("session size must be > 0")]
    InvalidSessionSize,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Configuration for study sessions and the daily goal.
///
/// The daily goal counts graduations (cards leaving the learning phase),
/// not raw answers; cycling a card within learning does not move the goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySettings {
    daily_goal: u32,
    new_cards_per_session: u32,
    session_size: u32,
    shuffle_new: bool,
}

impl StudySettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any count is zero.
    pub fn new(
        daily_goal: u32,
        new_cards_per_session: u32,
        session_size: u32,
        shuffle_new: bool,
    ) -> Result<Self, SettingsError> {
        if daily_goal == 0 {
            return Err(SettingsError::InvalidDailyGoal);
        }
        if new_cards_per_session == 0 {
            return Err(SettingsError::InvalidNewCardsPerSession);
        }
        if session_size == 0 {
            return Err(SettingsError::InvalidSessionSize);
        }

        Ok(Self {
            daily_goal,
            new_cards_per_session,
            session_size,
            shuffle_new,
        })
    }

    /// Graduations counted toward the user's daily goal.
    #[must_use]
    pub fn daily_goal(&self) -> u32 {
        self.daily_goal
    }

    /// Maximum never-studied cards introduced per session.
    #[must_use]
    pub fn new_cards_per_session(&self) -> u32 {
        self.new_cards_per_session
    }

    /// Cap on due review cards pulled into one queue round.
    ///
    /// Learning-phase cards are never capped; they are always eligible
    /// within a session.
    #[must_use]
    pub fn session_size(&self) -> u32 {
        self.session_size
    }

    /// Whether never-studied cards are shuffled before introduction.
    #[must_use]
    pub fn shuffle_new(&self) -> bool {
        self.shuffle_new
    }
}

impl Default for StudySettings {
    /// Ten graduations a day, five new cards and twenty total per session.
    fn default() -> Self {
        Self {
            daily_goal: 10,
            new_cards_per_session: 5,
            session_size: 20,
            shuffle_new: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = StudySettings::default();
        assert!(
            StudySettings::new(
                settings.daily_goal(),
                settings.new_cards_per_session(),
                settings.session_size(),
                settings.shuffle_new(),
            )
            .is_ok()
        );
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(matches!(
            StudySettings::new(0, 5, 20, false),
            Err(SettingsError::InvalidDailyGoal)
        ));
        assert!(matches!(
            StudySettings::new(10, 0, 20, false),
            Err(SettingsError::InvalidNewCardsPerSession)
        ));
        assert!(matches!(
            StudySettings::new(10, 5, 0, false),
            Err(SettingsError::InvalidSessionSize)
        ));
    }
}
