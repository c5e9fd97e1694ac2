//! Engine configuration
use std::time::Duration;

use tonal_core::{BandLayout, CoreError, Result};

/// Playback engine configuration
///
/// Queue capacities trade latency for underrun resistance: larger
/// queues buffer more audio ahead of the output callback at the cost
/// of slower response to gain changes already in flight.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Equalizer band layout
    pub layout: BandLayout,

    /// Sample pairs per pipeline frame
    pub frame_size: usize,

    /// Raw frame queue capacity (decoded, not yet equalized)
    pub raw_queue_frames: usize,

    /// Equalized frame queue capacity (feeding the output callback)
    pub out_queue_frames: usize,

    /// How long a producer waits on a full queue before reporting
    /// backpressure and retrying
    pub enqueue_timeout: Duration,

    /// How long the control context waits for a worker acknowledgement
    /// (load, seek, stop)
    pub command_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: BandLayout::three_way(),
            frame_size: 1024,
            raw_queue_frames: 8,
            out_queue_frames: 4,
            enqueue_timeout: Duration::from_millis(500),
            command_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `Configuration` if a size or timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.frame_size == 0 {
            return Err(CoreError::configuration("frame_size must be non-zero"));
        }
        if self.raw_queue_frames == 0 || self.out_queue_frames == 0 {
            return Err(CoreError::configuration(
                "queue capacities must be non-zero",
            ));
        }
        if self.enqueue_timeout.is_zero() || self.command_timeout.is_zero() {
            return Err(CoreError::configuration("timeouts must be non-zero"));
        }
        Ok(())
    }
}
