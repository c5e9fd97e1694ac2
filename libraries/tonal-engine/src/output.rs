//! CPAL output device binding (feature `desktop`)
//!
//! A dedicated audio thread owns the cpal `Stream` (the stream type
//! is not `Send` on every platform) and the `RealtimeSink` moves into
//! the device callback. The control side only holds a command channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate as CpalSampleRate, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use tonal_core::{AudioSpec, CoreError, TransportState};

use crate::engine::{PlaybackEngine, Shared};
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventSender};
use crate::sink::RealtimeSink;

enum OutputCommand {
    Shutdown,
}

/// CPAL-backed output running the real-time sink
///
/// The stream starts immediately and keeps running until the output
/// is dropped; whether audible audio or silence comes out is decided
/// per callback by the sink from the transport state.
pub struct CpalOutput {
    command_tx: Sender<OutputCommand>,
    _audio_thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device at the stream's spec and start
    /// the callback
    ///
    /// Device failures after startup stop the engine's session and are
    /// reported as `DeviceFailed` events.
    ///
    /// # Errors
    /// Returns `Device` if no device is available or the stream cannot
    /// be built.
    pub fn start(sink: RealtimeSink, spec: AudioSpec, engine: &PlaybackEngine) -> Result<Self> {
        let events = engine.event_sender();
        let shared = engine.shared_state();
        let (command_tx, command_rx) = bounded::<OutputCommand>(4);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let audio_thread = thread::spawn(move || {
            Self::audio_thread_run(sink, spec, events, shared, &command_rx, &ready_tx);
        });

        // Surface stream construction failures synchronously
        ready_rx
            .recv()
            .map_err(|_| EngineError::ChannelClosed)??;

        Ok(Self {
            command_tx,
            _audio_thread: Some(audio_thread),
        })
    }

    fn audio_thread_run(
        sink: RealtimeSink,
        spec: AudioSpec,
        events: EventSender,
        shared: Arc<Shared>,
        command_rx: &Receiver<OutputCommand>,
        ready_tx: &Sender<Result<()>>,
    ) {
        let stream = match Self::build_stream(sink, spec, events, shared) {
            Ok(stream) => {
                ready_tx.send(Ok(())).ok();
                stream
            }
            Err(err) => {
                ready_tx.send(Err(err)).ok();
                return;
            }
        };

        debug!(sample_rate = spec.sample_rate.as_hz(), "output stream running");

        // Park until shutdown; the callback does all the work
        while let Ok(command) = command_rx.recv() {
            match command {
                OutputCommand::Shutdown => break,
            }
        }
        drop(stream);
    }

    fn build_stream(
        sink: RealtimeSink,
        spec: AudioSpec,
        events: EventSender,
        shared: Arc<Shared>,
    ) -> Result<Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| CoreError::device("no output device available"))?;

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: CpalSampleRate(spec.sample_rate.as_hz()),
            buffer_size: BufferSize::Default,
        };

        let mut sink = sink;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    sink.fill(data);
                },
                move |err| {
                    // Device failure is fatal to the session, not the process
                    error!(error = %err, "output stream error");
                    let from = shared.transport.force_stop();
                    events.emit(EngineEvent::DeviceFailed {
                        message: err.to_string(),
                    });
                    if from != TransportState::Stopped {
                        events.emit(EngineEvent::StateChanged {
                            from,
                            to: TransportState::Stopped,
                        });
                    }
                },
                None,
            )
            .map_err(|e| CoreError::device(format!("failed to build stream: {e}")))?;

        stream
            .play()
            .map_err(|e| CoreError::device(format!("failed to start stream: {e}")))?;
        Ok(stream)
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.command_tx.send(OutputCommand::Shutdown);
        if let Some(handle) = self._audio_thread.take() {
            let _ = handle.join();
        }
    }
}
