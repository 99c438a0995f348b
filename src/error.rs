use crate::session::SessionState;

/// Errors surfaced by the scoring engine.
///
/// Only `InvalidScript` is fatal to a session; every other variant leaves the
/// session untouched so the caller can skip the tick or keep the prior value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// No audio buffer or playback time was available for this tick.
    #[error("input unavailable: {0}")]
    InputUnavailable(&'static str),

    /// The target-note sequence is empty or malformed.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// A listener-adjustable parameter was outside its accepted range.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    ConfigurationOutOfRange {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A lifecycle operation was called from a state that does not allow it.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// A tick arrived while the session was not playing.
    #[error("tick ignored while {0}")]
    NotPlaying(SessionState),
}

impl EngineError {
    pub(crate) fn out_of_range(
        name: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Self {
        EngineError::ConfigurationOutOfRange {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Convenience Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
