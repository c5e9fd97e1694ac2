//! Bounded SPSC frame queues
//!
//! The pipeline stages are connected by bounded channels carrying
//! [`AudioFrame`] values. Each queue is SPSC by construction: the
//! producer and consumer handles are moved into exactly one producing
//! and one consuming context. A full queue creates backpressure (the
//! producer times out and retries); an empty queue never blocks the
//! real-time consumer, which substitutes silence.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};
use tonal_core::AudioFrame;

use crate::error::{EngineError, Result};

/// Factory for a bounded frame queue
pub struct FrameQueue;

impl FrameQueue {
    /// Create a bounded queue, returning the producer and consumer handles
    pub fn bounded(capacity: usize) -> (FrameProducer, FrameConsumer) {
        let (tx, rx) = bounded(capacity);
        (
            FrameProducer { tx },
            FrameConsumer { rx, last: None },
        )
    }
}

/// Producer-side push failure
#[derive(Debug)]
pub enum PushError {
    /// Queue stayed full for the whole timeout; the frame is handed
    /// back so the producer can retry after reporting backpressure
    Timeout(AudioFrame),
    /// Consumer side has been dropped
    Disconnected,
}

/// Result of a consumer pop
#[derive(Debug)]
pub enum Pop {
    /// Next frame in sequence
    Frame(AudioFrame),
    /// A sequence discontinuity was detected; `frame` is still valid
    /// audio and should be played, but frames in between were lost
    Gap {
        /// Sequence number the consumer expected
        expected: u64,
        /// The frame actually received
        frame: AudioFrame,
    },
    /// Queue is empty (or timed out)
    Empty,
}

/// Producing end of a frame queue
pub struct FrameProducer {
    tx: Sender<AudioFrame>,
}

impl FrameProducer {
    /// Push a frame, blocking up to `timeout` if the queue is full
    ///
    /// # Errors
    /// `Timeout` hands the frame back as the backpressure signal;
    /// `Disconnected` means the consumer is gone.
    pub fn push(&self, frame: AudioFrame, timeout: Duration) -> std::result::Result<(), PushError> {
        match self.tx.send_timeout(frame, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(frame)) => Err(PushError::Timeout(frame)),
            Err(SendTimeoutError::Disconnected(_)) => Err(PushError::Disconnected),
        }
    }
}

/// Consuming end of a frame queue
///
/// Tracks the last seen (generation, sequence) pair to detect dropped
/// frames. Sequence tracking restarts at generation boundaries since a
/// flush legitimately discards in-flight frames.
pub struct FrameConsumer {
    rx: Receiver<AudioFrame>,
    last: Option<(u64, u64)>,
}

impl FrameConsumer {
    /// Non-blocking pop for the real-time consumer
    ///
    /// Returns `Pop::Empty` both when the queue is empty and when the
    /// producer is gone; the real-time context treats both as silence.
    pub fn try_pop(&mut self) -> Pop {
        match self.rx.try_recv() {
            Ok(frame) => self.classify(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Pop::Empty,
        }
    }

    /// Blocking pop for worker contexts
    ///
    /// # Errors
    /// Returns `ChannelClosed` when the producer is gone; a timeout is
    /// not an error and maps to `Pop::Empty`.
    pub fn pop_timeout(&mut self, timeout: Duration) -> Result<Pop> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(self.classify(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(Pop::Empty),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::ChannelClosed),
        }
    }

    fn classify(&mut self, frame: AudioFrame) -> Pop {
        let previous = self.last.replace((frame.generation, frame.seq));
        match previous {
            Some((generation, seq)) if generation == frame.generation && frame.seq != seq + 1 => {
                Pop::Gap {
                    expected: seq + 1,
                    frame,
                }
            }
            _ => Pop::Frame(frame),
        }
    }
}
