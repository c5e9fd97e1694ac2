//! Shared test fixtures: a scripted decode collaborator driving the
//! pipeline without touching real audio files.

use std::path::Path;

use tonal_core::{AudioDecoder, CoreError, DecodedBlock, Result, SampleRate, StreamInfo};

/// Scripted decoder producing a constant-amplitude stereo signal
///
/// Block position tags are exact, which is what the seek-staleness and
/// position tests key on.
pub struct ScriptedDecoder {
    total_frames: u64,
    amplitude: f32,
    position: u64,
    open: bool,
}

impl ScriptedDecoder {
    pub fn new(total_frames: u64) -> Self {
        Self {
            total_frames,
            amplitude: 0.25,
            position: 0,
            open: false,
        }
    }
}

impl AudioDecoder for ScriptedDecoder {
    fn open(&mut self, _path: &Path) -> Result<StreamInfo> {
        self.open = true;
        self.position = 0;
        Ok(StreamInfo {
            sample_rate: SampleRate::CD_QUALITY,
            channels: 2,
            total_frames: Some(self.total_frames),
        })
    }

    fn read_frame(&mut self, max_frames: usize) -> Result<Option<DecodedBlock>> {
        if !self.open {
            return Err(CoreError::decode("no source open"));
        }
        if self.position >= self.total_frames {
            return Ok(None);
        }

        let frames = max_frames.min((self.total_frames - self.position) as usize);
        let block = DecodedBlock {
            samples: vec![self.amplitude; frames * 2],
            position: self.position,
        };
        self.position += frames as u64;
        Ok(Some(block))
    }

    fn seek(&mut self, sample_position: u64) -> Result<u64> {
        if !self.open {
            return Err(CoreError::decode("no source open"));
        }
        self.position = sample_position.min(self.total_frames);
        Ok(self.position)
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Decoder that produces a few good blocks and then fails every read,
/// for stale-audio checks around the fatal-error path
pub struct FlakyDecoder {
    good_blocks: usize,
    produced: usize,
}

impl FlakyDecoder {
    pub fn new(good_blocks: usize) -> Self {
        Self {
            good_blocks,
            produced: 0,
        }
    }
}

impl AudioDecoder for FlakyDecoder {
    fn open(&mut self, _path: &Path) -> Result<StreamInfo> {
        self.produced = 0;
        Ok(StreamInfo {
            sample_rate: SampleRate::CD_QUALITY,
            channels: 2,
            total_frames: None,
        })
    }

    fn read_frame(&mut self, max_frames: usize) -> Result<Option<DecodedBlock>> {
        if self.produced >= self.good_blocks {
            return Err(CoreError::decode("stream corrupted mid-track"));
        }
        let block = DecodedBlock {
            samples: vec![0.25; max_frames * 2],
            position: (self.produced * max_frames) as u64,
        };
        self.produced += 1;
        Ok(Some(block))
    }

    fn seek(&mut self, sample_position: u64) -> Result<u64> {
        Ok(sample_position)
    }

    fn close(&mut self) {}
}

/// Decoder whose reads always fail, for fatal-error paths
pub struct FailingDecoder;

impl AudioDecoder for FailingDecoder {
    fn open(&mut self, _path: &Path) -> Result<StreamInfo> {
        Ok(StreamInfo {
            sample_rate: SampleRate::CD_QUALITY,
            channels: 2,
            total_frames: None,
        })
    }

    fn read_frame(&mut self, _max_frames: usize) -> Result<Option<DecodedBlock>> {
        Err(CoreError::decode("corrupt stream"))
    }

    fn seek(&mut self, _sample_position: u64) -> Result<u64> {
        Ok(0)
    }

    fn close(&mut self) {}
}
