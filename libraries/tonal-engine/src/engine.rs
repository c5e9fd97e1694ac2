//! Playback session orchestration
//!
//! `PlaybackEngine` is the explicit session object owned by the
//! control context. It spawns two long-lived workers — decode and
//! equalize — connected by bounded frame queues, and publishes shared
//! state (transport, gains, position, generation) that the real-time
//! sink reads without blocking.
//!
//! Flush semantics: seek and stop bump the shared generation counter;
//! every stage discards frames tagged with an older generation instead
//! of draining queues across threads. The equalize worker resets its
//! filter state at each generation boundary so no filter tail from the
//! old position bleeds into the new one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use tonal_core::{
    AudioDecoder, AudioFrame, AudioSpec, BandId, BandLayout, CoreError, GainVector, Preset,
    PresetStore, SampleRate, StreamInfo, TransportState,
};
use tonal_dsp::Equalizer;

use crate::config::EngineConfig;
use crate::decode::SymphoniaDecoder;
use crate::error::{EngineError, Result};
use crate::events::{self, EngineEvent, EventSender};
use crate::presets::MemoryPresetStore;
use crate::queue::{FrameConsumer, FrameProducer, FrameQueue, Pop, PushError};
use crate::sink::RealtimeSink;
use crate::transport::Transport;

/// State shared between the control context, the workers, and the
/// real-time sink
pub(crate) struct Shared {
    /// Published transport state
    pub(crate) transport: Transport,
    /// Flush epoch; bumped by seek and stop
    pub(crate) generation: AtomicU64,
    /// Playback position in source sample frames, written by the sink
    pub(crate) position: AtomicU64,
    /// Final source position once the decoder hits end of source
    /// (`u64::MAX` = not reached)
    pub(crate) eof_position: AtomicU64,
    /// Live gain vector; the mutex is only ever held to swap or clone
    /// the Arc, never across frame processing
    pub(crate) gains: Mutex<Arc<GainVector>>,
    /// Per-band RMS of the most recent equalized frame
    pub(crate) band_energy: Mutex<Arc<Vec<f32>>>,
    /// Active band layout, swappable only while Stopped
    pub(crate) layout: Mutex<Arc<BandLayout>>,
    /// Bumped on every layout swap; the equalize worker rebuilds its
    /// filter bank when it observes a new epoch
    pub(crate) layout_epoch: AtomicU64,
}

/// Commands for the decode worker
enum DecodeCommand {
    Load {
        path: PathBuf,
        ack: Sender<Result<StreamInfo>>,
    },
    Play,
    Pause,
    Seek {
        target: u64,
        ack: Sender<Result<u64>>,
    },
    Stop {
        ack: Sender<()>,
    },
    Shutdown,
}

/// Playback engine control surface
///
/// All transport commands are serialized through `&mut self`; gain and
/// preset operations take `&self` and may run concurrently with them.
/// Dropping the engine shuts down both workers.
pub struct PlaybackEngine {
    config: EngineConfig,
    shared: Arc<Shared>,
    events: EventSender,
    events_rx: Receiver<EngineEvent>,
    decode_tx: Sender<DecodeCommand>,
    store: Mutex<Box<dyn PresetStore>>,
    track: Option<StreamInfo>,
    decode_handle: Option<JoinHandle<()>>,
    equalize_handle: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Create an engine with explicit collaborators
    ///
    /// Returns the engine and the real-time sink feeding the output
    /// device.
    ///
    /// # Errors
    /// Returns `Configuration` if the config fails validation.
    pub fn new(
        config: EngineConfig,
        decoder: Box<dyn AudioDecoder>,
        store: Box<dyn PresetStore>,
    ) -> Result<(Self, RealtimeSink)> {
        config.validate()?;

        let shared = Arc::new(Shared {
            transport: Transport::new(),
            generation: AtomicU64::new(0),
            position: AtomicU64::new(0),
            eof_position: AtomicU64::new(u64::MAX),
            gains: Mutex::new(Arc::new(GainVector::flat(&config.layout))),
            band_energy: Mutex::new(Arc::new(vec![0.0; config.layout.len()])),
            layout: Mutex::new(Arc::new(config.layout.clone())),
            layout_epoch: AtomicU64::new(0),
        });

        let (events, events_rx) = events::channel();
        let (raw_tx, raw_rx) = FrameQueue::bounded(config.raw_queue_frames);
        let (out_tx, out_rx) = FrameQueue::bounded(config.out_queue_frames);
        let (decode_tx, decode_rx) = bounded(16);

        let decode_handle = {
            let mut worker = DecodeWorker {
                decoder,
                producer: raw_tx,
                commands: decode_rx,
                shared: Arc::clone(&shared),
                events: events.clone(),
                frame_size: config.frame_size,
                enqueue_timeout: config.enqueue_timeout,
                spec: AudioSpec::cd_stereo(),
                generation: 0,
                seq: 0,
                position: 0,
                playing: false,
                eof: false,
                pending: None,
            };
            thread::spawn(move || worker.run())
        };

        let equalize_handle = {
            let mut worker = EqualizeWorker {
                consumer: raw_rx,
                producer: out_tx,
                shared: Arc::clone(&shared),
                events: events.clone(),
                layout: config.layout.clone(),
                layout_epoch: 0,
                enqueue_timeout: config.enqueue_timeout,
                equalizer: None,
                sample_rate: None,
                last_generation: 0,
            };
            thread::spawn(move || worker.run())
        };

        let sink = RealtimeSink::new(out_rx, Arc::clone(&shared), events.clone());

        Ok((
            Self {
                config,
                shared,
                events,
                events_rx,
                decode_tx,
                store: Mutex::new(store),
                track: None,
                decode_handle: Some(decode_handle),
                equalize_handle: Some(equalize_handle),
            },
            sink,
        ))
    }

    /// Create an engine with the default collaborators: a Symphonia
    /// decoder and an in-memory preset store preloaded with the
    /// factory presets
    pub fn with_defaults(config: EngineConfig) -> Result<(Self, RealtimeSink)> {
        let store = MemoryPresetStore::with_factory(&config.layout);
        Self::new(config, Box::new(SymphoniaDecoder::new()), Box::new(store))
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current transport state
    pub fn state(&self) -> TransportState {
        self.shared.transport.state()
    }

    /// Playback position in source sample frames
    pub fn position(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    /// A receiver for the engine event stream
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events_rx.clone()
    }

    /// Load a source; only legal while Stopped
    ///
    /// # Errors
    /// `InvalidState` if not Stopped, or the decode collaborator's
    /// open failure.
    pub fn load(&mut self, path: &Path) -> Result<StreamInfo> {
        let state = self.state();
        if state != TransportState::Stopped {
            return Err(EngineError::InvalidState {
                command: "load",
                state,
            });
        }

        let (ack_tx, ack_rx) = bounded(1);
        self.send_command(DecodeCommand::Load {
            path: path.to_path_buf(),
            ack: ack_tx,
        })?;
        let info = self.recv_ack(&ack_rx)??;

        self.shared.position.store(0, Ordering::Release);
        self.shared.eof_position.store(u64::MAX, Ordering::Release);
        debug!(path = %path.display(), sample_rate = info.sample_rate.as_hz(), "track loaded");
        self.events.emit(EngineEvent::TrackLoaded {
            sample_rate: info.sample_rate,
            total_frames: info.total_frames,
        });
        self.track = Some(info.clone());
        Ok(info)
    }

    /// Start or resume playback
    ///
    /// # Errors
    /// `NoTrackLoaded` while Stopped with nothing loaded;
    /// `InvalidState` while Playing or Seeking.
    pub fn play(&mut self) -> Result<()> {
        if self.track.is_none() {
            return Err(EngineError::NoTrackLoaded);
        }
        // Starting from Stopped replays from the start: flush leftover
        // frames (the generation bump also resets filter state) and
        // clear the end-of-source marker before the transport flips to
        // Playing, so the sink cannot observe the old final position
        // and immediately re-stop the session
        if self.state() == TransportState::Stopped {
            self.shared.generation.fetch_add(1, Ordering::AcqRel);
            self.shared.position.store(0, Ordering::Release);
            self.shared.eof_position.store(u64::MAX, Ordering::Release);
        }
        let from = self.shared.transport.play()?;
        self.send_command(DecodeCommand::Play)?;
        debug!(?from, "transport -> playing");
        self.events.emit(EngineEvent::StateChanged {
            from,
            to: TransportState::Playing,
        });
        Ok(())
    }

    /// Pause playback; the output keeps running and emits silence
    pub fn pause(&mut self) -> Result<()> {
        let from = self.shared.transport.pause()?;
        self.send_command(DecodeCommand::Pause)?;
        debug!("transport -> paused");
        self.events.emit(EngineEvent::StateChanged {
            from,
            to: TransportState::Paused,
        });
        Ok(())
    }

    /// Stop playback and rewind to the start
    ///
    /// Legal in any state. Blocks briefly until the decode worker has
    /// quiesced; in-flight frames are flushed via the generation bump.
    pub fn stop(&mut self) -> Result<()> {
        let from = self.shared.transport.stop();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);

        let (ack_tx, ack_rx) = bounded(1);
        self.send_command(DecodeCommand::Stop { ack: ack_tx })?;
        self.recv_ack(&ack_rx)?;

        self.shared.position.store(0, Ordering::Release);
        self.shared.eof_position.store(u64::MAX, Ordering::Release);
        if from != TransportState::Stopped {
            debug!(?from, "transport -> stopped");
            self.events.emit(EngineEvent::StateChanged {
                from,
                to: TransportState::Stopped,
            });
        }
        Ok(())
    }

    /// Seek to a source sample position
    ///
    /// Blocks until the decoder has repositioned. Targets at or past
    /// end of source resolve to the Stopped transition, not an error.
    ///
    /// # Errors
    /// `InvalidState` unless Playing or Paused; the decode
    /// collaborator's failure if the reposition fails.
    pub fn seek(&mut self, target: u64) -> Result<()> {
        if self.track.is_none() {
            return Err(EngineError::NoTrackLoaded);
        }
        let resume = self.shared.transport.begin_seek()?;

        // Seeking past the end is end-of-source, not a decode error
        let past_end = self
            .track
            .as_ref()
            .and_then(|t| t.total_frames)
            .is_some_and(|total| target >= total);
        if past_end {
            self.shared.transport.force_stop();
            self.shared.generation.fetch_add(1, Ordering::AcqRel);
            let (ack_tx, ack_rx) = bounded(1);
            self.send_command(DecodeCommand::Stop { ack: ack_tx })?;
            self.recv_ack(&ack_rx)?;
            self.shared.position.store(0, Ordering::Release);
            debug!(target, "seek past end of source");
            self.events.emit(EngineEvent::EndOfSource);
            self.events.emit(EngineEvent::StateChanged {
                from: resume,
                to: TransportState::Stopped,
            });
            return Ok(());
        }

        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let (ack_tx, ack_rx) = bounded(1);
        self.send_command(DecodeCommand::Seek {
            target,
            ack: ack_tx,
        })?;
        match self.recv_ack(&ack_rx)? {
            Ok(actual) => {
                self.shared.position.store(actual, Ordering::Release);
                self.shared.transport.complete_seek(resume);
                debug!(target, actual, "seek complete");
                self.events.emit(EngineEvent::Seeked { position: actual });
                Ok(())
            }
            Err(err) => {
                // A failed reposition leaves the decoder in an unknown
                // spot; stop the session
                self.shared.transport.force_stop();
                self.events.emit(EngineEvent::StateChanged {
                    from: TransportState::Seeking,
                    to: TransportState::Stopped,
                });
                Err(err)
            }
        }
    }

    /// Replace the band layout; only legal while Stopped
    ///
    /// The equalize worker rebuilds its filter bank for the new layout
    /// before processing the next frame. Live gains reset to flat at
    /// the new band count.
    ///
    /// # Errors
    /// `Configuration` if the transport is not Stopped.
    pub fn set_layout(&mut self, layout: BandLayout) -> Result<()> {
        let state = self.state();
        if state != TransportState::Stopped {
            return Err(CoreError::configuration(format!(
                "cannot reconfigure bands while {state}"
            ))
            .into());
        }

        {
            let mut guard = self
                .shared
                .layout
                .lock()
                .map_err(|_| EngineError::ChannelClosed)?;
            *guard = Arc::new(layout.clone());
        }
        {
            let mut guard = self
                .shared
                .gains
                .lock()
                .map_err(|_| EngineError::ChannelClosed)?;
            *guard = Arc::new(GainVector::flat(&layout));
        }
        {
            let mut guard = self
                .shared
                .band_energy
                .lock()
                .map_err(|_| EngineError::ChannelClosed)?;
            *guard = Arc::new(vec![0.0; layout.len()]);
        }
        self.config.layout = layout;
        self.shared.layout_epoch.fetch_add(1, Ordering::AcqRel);
        debug!(bands = self.config.layout.len(), "band layout replaced");
        self.events.emit(EngineEvent::GainsChanged);
        Ok(())
    }

    /// Set one band's gain in dB (clamped); legal in any state
    pub fn set_gain(&self, band: BandId, db: f32) -> Result<()> {
        let mut guard = self.shared.gains.lock().map_err(|_| EngineError::ChannelClosed)?;
        let mut next = (**guard).clone();
        next.set(band, db)?;
        *guard = Arc::new(next);
        drop(guard);
        self.events.emit(EngineEvent::GainsChanged);
        Ok(())
    }

    /// Replace the whole gain vector atomically
    ///
    /// # Errors
    /// `Configuration` if the band count does not match the layout.
    pub fn set_gains(&self, gains: GainVector) -> Result<()> {
        if gains.len() != self.config.layout.len() {
            return Err(CoreError::configuration(format!(
                "gain vector has {} bands, layout has {}",
                gains.len(),
                self.config.layout.len()
            ))
            .into());
        }
        let mut guard = self.shared.gains.lock().map_err(|_| EngineError::ChannelClosed)?;
        *guard = Arc::new(gains);
        drop(guard);
        self.events.emit(EngineEvent::GainsChanged);
        Ok(())
    }

    /// Snapshot of the live gain vector
    pub fn gains(&self) -> Arc<GainVector> {
        self.shared
            .gains
            .lock()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// Apply a stored preset to the live gains
    ///
    /// # Errors
    /// `InvalidInput` if no preset has that name.
    pub fn apply_preset(&self, name: &str) -> Result<()> {
        let preset = {
            let store = self.store.lock().map_err(|_| EngineError::ChannelClosed)?;
            store
                .load_all()?
                .into_iter()
                .find(|p| p.name == name)
                .ok_or_else(|| CoreError::invalid_input(format!("no preset named '{name}'")))?
        };
        self.set_gains(preset.gains)?;
        self.events.emit(EngineEvent::PresetApplied {
            name: name.to_owned(),
        });
        Ok(())
    }

    /// Save the current gains as a named preset
    pub fn save_preset(&self, name: &str) -> Result<()> {
        let preset = Preset::new(name, (*self.gains()).clone());
        let mut store = self.store.lock().map_err(|_| EngineError::ChannelClosed)?;
        store.save(&preset)?;
        Ok(())
    }

    /// Delete a stored preset
    pub fn delete_preset(&self, name: &str) -> Result<()> {
        let mut store = self.store.lock().map_err(|_| EngineError::ChannelClosed)?;
        store.delete(name)?;
        Ok(())
    }

    /// All stored presets
    pub fn presets(&self) -> Result<Vec<Preset>> {
        let store = self.store.lock().map_err(|_| EngineError::ChannelClosed)?;
        Ok(store.load_all()?)
    }

    /// Per-band RMS of the most recent equalized frame, for display
    pub fn band_energy(&self) -> Arc<Vec<f32>> {
        self.shared
            .band_energy
            .lock()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    pub(crate) fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    pub(crate) fn shared_state(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    fn send_command(&self, command: DecodeCommand) -> Result<()> {
        self.decode_tx
            .send(command)
            .map_err(|_| EngineError::ChannelClosed)
    }

    fn recv_ack<T>(&self, ack: &Receiver<T>) -> Result<T> {
        ack.recv_timeout(self.config.command_timeout)
            .map_err(|_| EngineError::CommandTimeout(self.config.command_timeout))
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _ = self.decode_tx.send(DecodeCommand::Shutdown);
        if let Some(handle) = self.decode_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.equalize_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Decode worker: owns the decode collaborator and feeds the raw queue
struct DecodeWorker {
    decoder: Box<dyn AudioDecoder>,
    producer: FrameProducer,
    commands: Receiver<DecodeCommand>,
    shared: Arc<Shared>,
    events: EventSender,
    frame_size: usize,
    enqueue_timeout: Duration,
    spec: AudioSpec,
    /// Flush epoch stamped on produced frames; reloaded at every
    /// command that bumps the shared counter
    generation: u64,
    seq: u64,
    position: u64,
    playing: bool,
    eof: bool,
    /// Frame that timed out on a full queue, retried after the next
    /// command check
    pending: Option<AudioFrame>,
}

impl DecodeWorker {
    fn run(&mut self) {
        loop {
            let active = self.playing && (!self.eof || self.pending.is_some());
            let command = if active {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(crossbeam_channel::TryRecvError::Empty) => None,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => return,
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                }
            };

            if let Some(command) = command {
                if !self.handle_command(command) {
                    return;
                }
                continue;
            }

            if !self.produce() {
                return;
            }
        }
    }

    /// Returns false on shutdown
    fn handle_command(&mut self, command: DecodeCommand) -> bool {
        match command {
            DecodeCommand::Load { path, ack } => {
                self.decoder.close();
                let result = self.decoder.open(&path).map_err(EngineError::from);
                if let Ok(info) = &result {
                    self.spec = AudioSpec::new(info.sample_rate, 2);
                    self.reset_stream_state();
                }
                ack.send(result).ok();
            }
            DecodeCommand::Play => {
                if self.eof {
                    // Replay from the start after a completed run
                    if let Err(err) = self.decoder.seek(0) {
                        warn!(error = %err, "rewind after end of source failed");
                    }
                    self.reset_stream_state();
                }
                // The control side bumps the generation when starting
                // from Stopped; frames tagged before this reload would
                // be discarded downstream
                self.generation = self.shared.generation.load(Ordering::Acquire);
                self.playing = true;
            }
            DecodeCommand::Pause => {
                self.playing = false;
            }
            DecodeCommand::Seek { target, ack } => {
                // Collapse a burst of queued seeks: only the last
                // target is repositioned to, earlier ones are
                // superseded (their acks receive the winning result)
                let mut target = target;
                let mut acks = vec![ack];
                let mut stashed = None;
                while let Ok(next) = self.commands.try_recv() {
                    match next {
                        DecodeCommand::Seek { target: t, ack: a } => {
                            target = t;
                            acks.push(a);
                        }
                        other => {
                            stashed = Some(other);
                            break;
                        }
                    }
                }

                self.pending = None;
                self.generation = self.shared.generation.load(Ordering::Acquire);
                let result = self.decoder.seek(target).map_err(EngineError::from);
                if let Ok(actual) = &result {
                    self.position = *actual;
                    self.eof = false;
                    self.shared.eof_position.store(u64::MAX, Ordering::Release);
                }
                for ack in acks {
                    let reply = match &result {
                        Ok(actual) => Ok(*actual),
                        Err(err) => Err(EngineError::Core(CoreError::decode(err.to_string()))),
                    };
                    ack.send(reply).ok();
                }

                if let Some(command) = stashed {
                    return self.handle_command(command);
                }
            }
            DecodeCommand::Stop { ack } => {
                self.playing = false;
                self.pending = None;
                self.generation = self.shared.generation.load(Ordering::Acquire);
                if let Err(err) = self.decoder.seek(0) {
                    warn!(error = %err, "rewind on stop failed");
                }
                self.reset_stream_state();
                ack.send(()).ok();
            }
            DecodeCommand::Shutdown => return false,
        }
        true
    }

    fn reset_stream_state(&mut self) {
        self.position = 0;
        self.seq = 0;
        self.eof = false;
        self.pending = None;
        self.generation = self.shared.generation.load(Ordering::Acquire);
        self.shared.eof_position.store(u64::MAX, Ordering::Release);
    }

    /// Push the pending frame or decode the next one.
    /// Returns false when the downstream side is gone.
    fn produce(&mut self) -> bool {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.decoder.read_frame(self.frame_size) {
                Ok(Some(block)) => {
                    self.position = block.position + (block.samples.len() / 2) as u64;
                    let frame = AudioFrame::new(
                        block.samples,
                        self.spec,
                        self.seq,
                        block.position,
                        self.generation,
                    );
                    self.seq += 1;
                    frame
                }
                Ok(None) => {
                    debug!(position = self.position, "end of source reached");
                    self.eof = true;
                    self.shared
                        .eof_position
                        .store(self.position, Ordering::Release);
                    return true;
                }
                Err(err) => {
                    warn!(error = %err, "unrecoverable decode failure");
                    self.events.emit(EngineEvent::DecodeFailed {
                        message: err.to_string(),
                    });
                    // Flush frames decoded before the failure; they
                    // must not surface on a later play
                    self.shared.generation.fetch_add(1, Ordering::AcqRel);
                    let from = self.shared.transport.force_stop();
                    if from != TransportState::Stopped {
                        self.events.emit(EngineEvent::StateChanged {
                            from,
                            to: TransportState::Stopped,
                        });
                    }
                    self.playing = false;
                    return true;
                }
            },
        };

        match self.producer.push(frame, self.enqueue_timeout) {
            Ok(()) => true,
            Err(PushError::Timeout(frame)) => {
                self.events.emit(EngineEvent::Backpressure);
                self.pending = Some(frame);
                true
            }
            Err(PushError::Disconnected) => false,
        }
    }
}

/// Equalize worker: owns the equalizer (and its filter state), applies
/// a gain snapshot per frame, feeds the out queue
struct EqualizeWorker {
    consumer: FrameConsumer,
    producer: FrameProducer,
    shared: Arc<Shared>,
    events: EventSender,
    layout: BandLayout,
    layout_epoch: u64,
    enqueue_timeout: Duration,
    equalizer: Option<Equalizer>,
    sample_rate: Option<SampleRate>,
    last_generation: u64,
}

impl EqualizeWorker {
    fn run(&mut self) {
        loop {
            let popped = match self.consumer.pop_timeout(Duration::from_millis(100)) {
                Ok(popped) => popped,
                Err(_) => return,
            };

            let frame = match popped {
                Pop::Frame(frame) => frame,
                Pop::Gap { expected, frame } => {
                    self.events.emit(EngineEvent::SequenceGap {
                        expected,
                        got: frame.seq,
                    });
                    frame
                }
                Pop::Empty => continue,
            };

            if !self.process_and_forward(frame) {
                return;
            }
        }
    }

    /// Returns false when the sink side is gone
    fn process_and_forward(&mut self, mut frame: AudioFrame) -> bool {
        // Frames from before the latest flush are discarded unprocessed
        if frame.generation < self.shared.generation.load(Ordering::Acquire) {
            return true;
        }

        let epoch = self.shared.layout_epoch.load(Ordering::Acquire);
        if epoch != self.layout_epoch {
            let snapshot = match self.shared.layout.lock() {
                Ok(guard) => Arc::clone(&guard),
                Err(poisoned) => Arc::clone(&poisoned.into_inner()),
            };
            self.layout = (*snapshot).clone();
            self.layout_epoch = epoch;
            // Force a rebuild at the frame's sample rate
            self.sample_rate = None;
        }

        if self.sample_rate != Some(frame.spec.sample_rate) {
            match Equalizer::new(&self.layout, frame.spec.sample_rate) {
                Ok(equalizer) => {
                    self.equalizer = Some(equalizer);
                    self.sample_rate = Some(frame.spec.sample_rate);
                    self.last_generation = frame.generation;
                }
                Err(err) => {
                    warn!(error = %err, "equalizer rebuild failed, passing audio through");
                    self.equalizer = None;
                    self.sample_rate = Some(frame.spec.sample_rate);
                }
            }
        }

        if let Some(equalizer) = &mut self.equalizer {
            // A new generation means a seek or stop happened: clear
            // filter tails before processing the first fresh frame
            if frame.generation > self.last_generation {
                equalizer.reset();
                self.last_generation = frame.generation;
            }

            let gains = {
                let guard = match self.shared.gains.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                Arc::clone(&guard)
            };

            if let Err(err) = equalizer.process(&mut frame, &gains) {
                warn!(error = %err, "equalize failed, forwarding frame unprocessed");
            } else if let Ok(mut energy) = self.shared.band_energy.lock() {
                *energy = Arc::new(equalizer.band_energy().to_vec());
            }
        }

        // Forward, re-checking staleness while blocked on a full queue
        loop {
            match self.producer.push(frame, self.enqueue_timeout) {
                Ok(()) => return true,
                Err(PushError::Timeout(returned)) => {
                    if returned.generation < self.shared.generation.load(Ordering::Acquire) {
                        return true;
                    }
                    self.events.emit(EngineEvent::Backpressure);
                    frame = returned;
                }
                Err(PushError::Disconnected) => return false,
            }
        }
    }
}
