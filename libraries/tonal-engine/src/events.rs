//! Engine event stream
//!
//! Events are the asynchronous reporting path out of the pipeline:
//! state changes, position jumps, recoverable pipeline conditions
//! (underrun, backpressure, sequence gaps), end of source, and
//! session-fatal failures. Delivery is best effort over a bounded
//! channel; if no one is listening, events are dropped rather than
//! blocking any audio context.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use tonal_core::{SampleRate, TransportState};

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the playback engine
///
/// Serializable so UI layers can forward them across process
/// boundaries as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineEvent {
    /// Transport state changed
    StateChanged {
        /// Previous state
        from: TransportState,
        /// New state
        to: TransportState,
    },

    /// A track was loaded and is ready to play
    TrackLoaded {
        /// Source sample rate
        sample_rate: SampleRate,
        /// Total length in sample frames, if known
        total_frames: Option<u64>,
    },

    /// A seek completed at this source sample position
    Seeked {
        /// Actual position after the seek
        position: u64,
    },

    /// The live gain vector changed (slider move or preset)
    GainsChanged,

    /// A preset was applied to the live gains
    PresetApplied {
        /// Preset name
        name: String,
    },

    /// Source exhausted; the engine transitioned to Stopped
    EndOfSource,

    /// Output needed audio the pipeline had not produced yet;
    /// silence was emitted for the missing span
    Underrun {
        /// Samples substituted with silence
        missing: usize,
    },

    /// A producer could not enqueue within its timeout and will retry
    Backpressure,

    /// Frames were lost between producer and consumer
    SequenceGap {
        /// Sequence number the consumer expected
        expected: u64,
        /// Sequence number actually received
        got: u64,
    },

    /// Decode collaborator failed; the session stopped
    DecodeFailed {
        /// Failure description
        message: String,
    },

    /// Output device failed; the session stopped
    DeviceFailed {
        /// Failure description
        message: String,
    },
}

/// Create the engine event channel
pub(crate) fn channel() -> (EventSender, Receiver<EngineEvent>) {
    let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
    (EventSender { tx }, rx)
}

/// Best-effort event emitter shared by all pipeline contexts
///
/// `emit` never blocks and never allocates beyond the event payload,
/// so it is safe to call from the real-time output context.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: Sender<EngineEvent>,
}

impl EventSender {
    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.tx.try_send(event);
    }
}
