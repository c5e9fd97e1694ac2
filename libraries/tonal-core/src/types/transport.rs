//! Transport state for the playback pipeline
use serde::{Deserialize, Serialize};

/// Playback transport state
///
/// Exactly one authoritative copy exists per engine, owned by the
/// transport state machine; other contexts read snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// No source playing (initial state)
    Stopped,

    /// Actively producing audio
    Playing,

    /// Suspended mid-track; output keeps the device clock alive with silence
    Paused,

    /// Transient state while a seek repositions the pipeline
    Seeking,
}

impl TransportState {
    /// String representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Seeking => "seeking",
        }
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(TransportState::Stopped.to_string(), "stopped");
        assert_eq!(TransportState::Seeking.to_string(), "seeking");
    }
}
