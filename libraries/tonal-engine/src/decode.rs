//! Symphonia-backed decode collaborator
//!
//! Default implementation of the `AudioDecoder` contract. Streams a
//! container through Symphonia's probe/format/codec stack and hands
//! the pipeline interleaved stereo f32 blocks. Multichannel sources
//! are downmixed to stereo (rear/center channels folded in at -3 dB);
//! mono is duplicated to both channels.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::warn;

use tonal_core::{AudioDecoder, CoreError, DecodedBlock, Result, SampleRate, StreamInfo};

/// -3 dB fold-in coefficient for center/surround channels (ITU-R BS.775)
const DOWNMIX: f32 = 0.707;

/// Streaming decoder over Symphonia
pub struct SymphoniaDecoder {
    stream: Option<StreamState>,
}

struct StreamState {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    total_frames: Option<u64>,
    time_base: Option<TimeBase>,
    /// Next source sample index to be returned
    position: u64,
    /// Stereo samples decoded past the last block boundary
    leftover: Vec<f32>,
    /// Reused conversion buffer
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaDecoder {
    /// Create a decoder with no source open
    pub fn new() -> Self {
        Self { stream: None }
    }

    fn open_stream(path: &Path) -> Result<StreamState> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CoreError::decode(format!("failed to probe {}: {e}", path.display())))?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| CoreError::decode("no audio tracks found"))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);
        let track_id = track.id;
        let time_base = track.codec_params.time_base;
        let total_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CoreError::decode(format!("failed to create decoder: {e}")))?;

        Ok(StreamState {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            total_frames,
            time_base,
            position: 0,
            leftover: Vec::new(),
            sample_buf: None,
        })
    }
}

impl StreamState {
    /// Decode one packet into `out` as interleaved stereo.
    /// Returns false at end of source.
    fn decode_packet(&mut self, out: &mut Vec<f32>) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(CoreError::decode(format!("error reading packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packets are skippable
                    warn!(error = %e, "recoverable decode error, skipping packet");
                    continue;
                }
                Err(e) => {
                    return Err(CoreError::decode(format!("decode error: {e}")));
                }
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needs_new = self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < decoded.capacity() * channels);
            if needs_new {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let buf = self.sample_buf.as_mut().ok_or_else(|| {
                CoreError::decode("sample buffer unavailable")
            })?;
            buf.copy_interleaved_ref(decoded);

            downmix_to_stereo(buf.samples(), channels, out);
            return Ok(true);
        }
    }
}

/// Fold interleaved n-channel samples into interleaved stereo
fn downmix_to_stereo(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            for &s in samples {
                out.push(s);
                out.push(s);
            }
        }
        2 => out.extend_from_slice(samples),
        n => {
            for frame in samples.chunks_exact(n) {
                let mut left = frame[0];
                let mut right = frame[1];
                for &extra in &frame[2..] {
                    left += extra * DOWNMIX;
                    right += extra * DOWNMIX;
                }
                out.push(left.clamp(-1.0, 1.0));
                out.push(right.clamp(-1.0, 1.0));
            }
        }
    }
}

impl Default for SymphoniaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn open(&mut self, path: &Path) -> Result<StreamInfo> {
        self.stream = None;
        let state = Self::open_stream(path)?;

        let info = StreamInfo {
            sample_rate: SampleRate::new(state.sample_rate),
            channels: state.channels,
            total_frames: state.total_frames,
        };
        self.stream = Some(state);
        Ok(info)
    }

    fn read_frame(&mut self, max_frames: usize) -> Result<Option<DecodedBlock>> {
        let state = self
            .stream
            .as_mut()
            .ok_or_else(|| CoreError::decode("no source open"))?;

        let target = max_frames * 2;
        let mut samples = std::mem::take(&mut state.leftover);

        while samples.len() < target {
            if !state.decode_packet(&mut samples)? {
                break;
            }
        }

        if samples.is_empty() {
            return Ok(None);
        }

        if samples.len() > target {
            state.leftover = samples.split_off(target);
        }

        let position = state.position;
        state.position += (samples.len() / 2) as u64;
        Ok(Some(DecodedBlock { samples, position }))
    }

    fn seek(&mut self, sample_position: u64) -> Result<u64> {
        let state = self
            .stream
            .as_mut()
            .ok_or_else(|| CoreError::decode("no source open"))?;

        let target = match state.total_frames {
            Some(total) => sample_position.min(total),
            None => sample_position,
        };

        let seconds = target as f64 / f64::from(state.sample_rate);
        let time = Time::new(seconds as u64, seconds.fract());

        let seeked = state
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(state.track_id),
                },
            )
            .map_err(|e| CoreError::decode(format!("seek failed: {e}")))?;

        state.decoder.reset();
        state.leftover.clear();

        // Compressed formats land on a packet boundary; report where we
        // actually are
        let actual = match state.time_base {
            Some(tb) => {
                let seconds = seeked.actual_ts as f64 * f64::from(tb.numer) / f64::from(tb.denom);
                (seconds * f64::from(state.sample_rate)).round() as u64
            }
            None => seeked.actual_ts,
        };
        state.position = actual;
        Ok(actual)
    }

    fn close(&mut self) {
        self.stream = None;
    }
}
