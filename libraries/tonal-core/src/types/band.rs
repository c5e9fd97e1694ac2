//! Equalizer band and gain types
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::SampleRate;

/// Minimum per-band gain in dB
pub const GAIN_MIN_DB: f32 = -24.0;

/// Maximum per-band gain in dB
pub const GAIN_MAX_DB: f32 = 24.0;

/// Identifier of an equalizer band within a layout
///
/// Ids are assigned in ascending frequency order, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BandId(pub u16);

impl BandId {
    /// Band index within its layout
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "band {}", self.0)
    }
}

/// Immutable definition of one frequency band
///
/// The lowest band starts at 0 Hz and the highest band ends at the
/// Nyquist frequency; adjacent bands share their crossover edge so the
/// layout covers the full spectrum with no gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Band identifier (ascending frequency order)
    pub id: BandId,

    /// Lower cutoff in Hz (0 for the lowest band)
    pub low_hz: f32,

    /// Upper cutoff in Hz (Nyquist for the highest band)
    pub high_hz: f32,
}

/// A validated set of bands partitioning the spectrum
///
/// A layout is defined by its interior crossover edges; N edges yield
/// N + 1 bands. Band boundaries against a concrete sample rate are
/// materialized by [`BandLayout::bands`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandLayout {
    /// Interior crossover frequencies in Hz, strictly ascending
    edges: Vec<f32>,
}

impl BandLayout {
    /// Create a layout from interior crossover edges
    ///
    /// # Errors
    /// Returns `InvalidInput` if edges are empty, non-finite,
    /// non-positive, or not strictly ascending.
    pub fn new(edges: Vec<f32>) -> Result<Self> {
        if edges.is_empty() {
            return Err(CoreError::invalid_input(
                "band layout needs at least one crossover edge",
            ));
        }
        for window in edges.windows(2) {
            if window[0] >= window[1] {
                return Err(CoreError::invalid_input(format!(
                    "crossover edges must be strictly ascending: {} >= {}",
                    window[0], window[1]
                )));
            }
        }
        for &edge in &edges {
            if !edge.is_finite() || edge <= 0.0 {
                return Err(CoreError::invalid_input(format!(
                    "invalid crossover edge: {edge}"
                )));
            }
        }
        Ok(Self { edges })
    }

    /// Classic three-way split: bass below 200 Hz, mids to 5 kHz, treble above
    pub fn three_way() -> Self {
        Self {
            edges: vec![200.0, 5000.0],
        }
    }

    /// Ten-band octave layout (edges at the geometric midpoints between
    /// the ISO octave center frequencies 31.5 Hz .. 16 kHz)
    pub fn ten_band() -> Self {
        Self {
            edges: vec![
                44.5, 89.1, 176.8, 353.6, 707.1, 1414.2, 2828.4, 5656.9, 11313.7,
            ],
        }
    }

    /// Number of bands in this layout
    pub fn len(&self) -> usize {
        self.edges.len() + 1
    }

    /// A layout always has at least two bands
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Interior crossover edges in Hz
    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Materialize the band definitions against a sample rate
    ///
    /// # Errors
    /// Returns `InvalidInput` if any edge is at or above Nyquist.
    pub fn bands(&self, sample_rate: SampleRate) -> Result<Vec<Band>> {
        let nyquist = sample_rate.nyquist_hz();
        if let Some(&top) = self.edges.last() {
            if top >= nyquist {
                return Err(CoreError::invalid_input(format!(
                    "crossover edge {top} Hz is at or above Nyquist ({nyquist} Hz)"
                )));
            }
        }

        let mut bands = Vec::with_capacity(self.len());
        let mut low = 0.0;
        for (i, &edge) in self.edges.iter().enumerate() {
            bands.push(Band {
                id: BandId(i as u16),
                low_hz: low,
                high_hz: edge,
            });
            low = edge;
        }
        bands.push(Band {
            id: BandId(self.edges.len() as u16),
            low_hz: low,
            high_hz: nyquist,
        });
        Ok(bands)
    }
}

/// Live per-band gain settings in decibels
///
/// One entry per band of the layout it was created for, ordered by band
/// id so summation order is deterministic. Values are clamped to
/// [`GAIN_MIN_DB`, `GAIN_MAX_DB`] on every write. Mutated only by the
/// control context; the audio contexts observe it through an atomic
/// snapshot swap and never see a partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainVector {
    gains_db: Vec<f32>,
}

impl GainVector {
    /// All-flat (0 dB) gains for a layout
    pub fn flat(layout: &BandLayout) -> Self {
        Self {
            gains_db: vec![0.0; layout.len()],
        }
    }

    /// Build from explicit per-band values (clamped), ordered by band id
    pub fn from_db(gains_db: Vec<f32>) -> Self {
        Self {
            gains_db: gains_db
                .into_iter()
                .map(|db| db.clamp(GAIN_MIN_DB, GAIN_MAX_DB))
                .collect(),
        }
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.gains_db.len()
    }

    /// Check if the vector carries no bands
    pub fn is_empty(&self) -> bool {
        self.gains_db.is_empty()
    }

    /// Gain for a band in dB
    pub fn get(&self, id: BandId) -> Option<f32> {
        self.gains_db.get(id.index()).copied()
    }

    /// Set the gain for a band in dB (clamped)
    ///
    /// # Errors
    /// Returns `InvalidInput` if the band id is not part of this vector.
    pub fn set(&mut self, id: BandId, db: f32) -> Result<()> {
        match self.gains_db.get_mut(id.index()) {
            Some(slot) => {
                *slot = db.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
                Ok(())
            }
            None => Err(CoreError::invalid_input(format!(
                "{id} out of range (layout has {} bands)",
                self.gains_db.len()
            ))),
        }
    }

    /// Iterate `(band id, gain dB)` in band order
    pub fn iter(&self) -> impl Iterator<Item = (BandId, f32)> + '_ {
        self.gains_db
            .iter()
            .enumerate()
            .map(|(i, &db)| (BandId(i as u16), db))
    }

    /// Gains as a slice, ordered by band id
    pub fn as_db(&self) -> &[f32] {
        &self.gains_db
    }

    /// True when every band sits at 0 dB
    pub fn is_flat(&self) -> bool {
        self.gains_db.iter().all(|&db| db == 0.0)
    }
}

/// A named, immutable gain vector
///
/// Created by user action or loaded from storage; applying a preset
/// replaces the live `GainVector` atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Preset name (unique within a store)
    pub name: String,

    /// Per-band gains
    pub gains: GainVector,
}

impl Preset {
    /// Create a new preset
    pub fn new(name: impl Into<String>, gains: GainVector) -> Self {
        Self {
            name: name.into(),
            gains,
        }
    }
}
