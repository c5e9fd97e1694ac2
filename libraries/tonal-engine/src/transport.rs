//! Transport state machine
//!
//! The transport owns the published playback state. Transitions are
//! driven by the control context; the only exceptions are end-of-source
//! and fatal pipeline failures, which force Stopped from a worker or
//! the output context. Commands illegal in the current state are
//! rejected with `InvalidState`, never silently ignored.

use std::sync::atomic::{AtomicU8, Ordering};

use tonal_core::TransportState;

use crate::error::{EngineError, Result};

const STOPPED: u8 = 0;
const PLAYING: u8 = 1;
const PAUSED: u8 = 2;
const SEEKING: u8 = 3;

fn encode(state: TransportState) -> u8 {
    match state {
        TransportState::Stopped => STOPPED,
        TransportState::Playing => PLAYING,
        TransportState::Paused => PAUSED,
        TransportState::Seeking => SEEKING,
    }
}

fn decode(value: u8) -> TransportState {
    match value {
        PLAYING => TransportState::Playing,
        PAUSED => TransportState::Paused,
        SEEKING => TransportState::Seeking,
        _ => TransportState::Stopped,
    }
}

/// Shared transport state
///
/// Stored as an atomic so the real-time output context can read it
/// without locking. Command transitions all run on the control context
/// (serialized by `&mut PlaybackEngine`), so read-then-store here is
/// not a race; `force_stop` from other contexts only ever moves toward
/// Stopped.
pub struct Transport {
    state: AtomicU8,
}

impl Transport {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(STOPPED),
        }
    }

    /// Current transport state
    pub fn state(&self) -> TransportState {
        decode(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: TransportState) {
        self.state.store(encode(state), Ordering::Release);
    }

    /// Stopped/Paused -> Playing
    ///
    /// Returns the previous state on success.
    pub(crate) fn play(&self) -> Result<TransportState> {
        match self.state() {
            from @ (TransportState::Stopped | TransportState::Paused) => {
                self.set(TransportState::Playing);
                Ok(from)
            }
            state => Err(EngineError::InvalidState {
                command: "play",
                state,
            }),
        }
    }

    /// Playing -> Paused
    pub(crate) fn pause(&self) -> Result<TransportState> {
        match self.state() {
            from @ TransportState::Playing => {
                self.set(TransportState::Paused);
                Ok(from)
            }
            state => Err(EngineError::InvalidState {
                command: "pause",
                state,
            }),
        }
    }

    /// Any -> Stopped; returns the previous state
    pub(crate) fn stop(&self) -> TransportState {
        decode(self.state.swap(STOPPED, Ordering::AcqRel))
    }

    /// Playing/Paused -> Seeking
    ///
    /// Returns the state to restore after the seek completes.
    pub(crate) fn begin_seek(&self) -> Result<TransportState> {
        match self.state() {
            from @ (TransportState::Playing | TransportState::Paused) => {
                self.set(TransportState::Seeking);
                Ok(from)
            }
            state => Err(EngineError::InvalidState {
                command: "seek",
                state,
            }),
        }
    }

    /// Seeking -> the pre-seek state
    pub(crate) fn complete_seek(&self, resume: TransportState) {
        self.set(resume);
    }

    /// Forced transition to Stopped (end-of-source, fatal failure)
    pub(crate) fn force_stop(&self) -> TransportState {
        self.stop()
    }
}
