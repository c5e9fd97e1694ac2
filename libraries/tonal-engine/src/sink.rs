//! Real-time output consumer
//!
//! `RealtimeSink::fill` is the hot path invoked from the audio device
//! callback. It must never block and never allocate: it copies from
//! the equalized frame queue into the device buffer, substitutes
//! silence when the transport is not Playing or the queue runs dry,
//! and reports conditions upward with non-blocking event sends.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tonal_core::{AudioFrame, TransportState};

use crate::engine::Shared;
use crate::events::{EngineEvent, EventSender};
use crate::queue::{FrameConsumer, Pop};

/// Consumer end of the pipeline, driven by the output device callback
///
/// Created alongside its `PlaybackEngine`; move it into the device
/// callback (`CpalOutput` does this) or drive it directly from a test
/// harness on its own cadence.
pub struct RealtimeSink {
    consumer: FrameConsumer,
    shared: Arc<Shared>,
    events: EventSender,
    /// Partially consumed frame carried across callbacks
    current: Option<(AudioFrame, usize)>,
}

impl RealtimeSink {
    pub(crate) fn new(consumer: FrameConsumer, shared: Arc<Shared>, events: EventSender) -> Self {
        Self {
            consumer,
            shared,
            events,
            current: None,
        }
    }

    /// Fill an interleaved stereo output buffer
    ///
    /// Emits silence without consuming frames unless the transport is
    /// Playing, so a paused session holds its position exactly.
    pub fn fill(&mut self, output: &mut [f32]) {
        if self.shared.transport.state() != TransportState::Playing {
            output.fill(0.0);
            return;
        }

        let generation = self.shared.generation.load(Ordering::Acquire);
        let mut filled = 0;

        while filled < output.len() {
            // Drop frames flushed by a seek or stop
            if let Some((frame, _)) = &self.current {
                if frame.generation < generation {
                    self.current = None;
                }
            }

            match &mut self.current {
                Some((frame, offset)) => {
                    let n = (output.len() - filled).min(frame.samples.len() - *offset);
                    output[filled..filled + n]
                        .copy_from_slice(&frame.samples[*offset..*offset + n]);
                    filled += n;
                    *offset += n;
                    if *offset == frame.samples.len() {
                        self.shared
                            .position
                            .store(frame.end_position(), Ordering::Release);
                        self.current = None;
                    }
                }
                None => match self.consumer.try_pop() {
                    Pop::Frame(frame) => {
                        self.current = Some((frame, 0));
                    }
                    Pop::Gap { expected, frame } => {
                        self.events.emit(EngineEvent::SequenceGap {
                            expected,
                            got: frame.seq,
                        });
                        self.current = Some((frame, 0));
                    }
                    Pop::Empty => {
                        output[filled..].fill(0.0);
                        self.handle_starvation(output.len() - filled);
                        return;
                    }
                },
            }
        }
    }

    /// Queue ran dry: either the source is exhausted (transition to
    /// Stopped) or the pipeline fell behind (underrun, keep playing)
    fn handle_starvation(&mut self, missing: usize) {
        let eof = self.shared.eof_position.load(Ordering::Acquire);
        let position = self.shared.position.load(Ordering::Acquire);

        if eof != u64::MAX && position >= eof {
            let from = self.shared.transport.force_stop();
            if from != TransportState::Stopped {
                self.events.emit(EngineEvent::EndOfSource);
                self.events.emit(EngineEvent::StateChanged {
                    from,
                    to: TransportState::Stopped,
                });
            }
        } else {
            self.events.emit(EngineEvent::Underrun { missing });
        }
    }
}
