//! Engine error types
use thiserror::Error;
use tonal_core::{CoreError, TransportState};

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by the playback engine control surface
///
/// Recoverable pipeline conditions (underruns, backpressure, sequence
/// gaps) are not errors; they are reported on the event channel and
/// playback continues.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Command not legal in the current transport state
    #[error("cannot {command} while {state}")]
    InvalidState {
        /// The rejected command
        command: &'static str,
        /// Transport state at the time of the command
        state: TransportState,
    },

    /// A worker did not acknowledge a command in time
    #[error("worker did not acknowledge within {0:?}")]
    CommandTimeout(std::time::Duration),

    /// A worker channel closed unexpectedly
    #[error("pipeline channel closed")]
    ChannelClosed,

    /// No track has been loaded
    #[error("no track loaded")]
    NoTrackLoaded,

    /// Core error (decode, device, storage, configuration, ...)
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(core) => core,
            other => CoreError::Other(other.to_string()),
        }
    }
}
