//! Factory presets and in-memory preset storage
//!
//! Factory curves are authored as 10-point gain tables (one per ISO
//! octave band) and resampled onto whatever band layout the engine is
//! configured with, so a three-way session still gets a sensible
//! "Bass Boost". Durable storage stays behind the `PresetStore` trait;
//! `MemoryPresetStore` is the default session-local implementation.

use std::collections::BTreeMap;

use tonal_core::{BandLayout, CoreError, GainVector, Preset, PresetStore, Result};

/// Factory preset curves as 10-band gain tables (dB, low to high)
const FACTORY_CURVES: [(&str, [f32; 10]); 5] = [
    ("Flat", [0.0; 10]),
    (
        "Bass Boost",
        [6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    ),
    (
        "Treble Boost",
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0],
    ),
    (
        "V-Shape",
        [5.0, 4.0, 2.0, 0.0, -2.0, -2.0, 0.0, 2.0, 4.0, 5.0],
    ),
    (
        "Vocal",
        [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 3.0, 1.0, 0.0, -1.0],
    ),
];

/// Resample a 10-point curve onto `num_bands` by linear interpolation
/// over the band index
fn resample_curve(curve: &[f32; 10], num_bands: usize) -> Vec<f32> {
    if num_bands == 1 {
        return vec![curve.iter().sum::<f32>() / 10.0];
    }
    (0..num_bands)
        .map(|i| {
            let t = i as f32 * 9.0 / (num_bands - 1) as f32;
            let lo = t.floor() as usize;
            let hi = (lo + 1).min(9);
            let frac = t - lo as f32;
            curve[lo] * (1.0 - frac) + curve[hi] * frac
        })
        .collect()
}

/// Build the factory presets for a band layout
pub fn factory_presets(layout: &BandLayout) -> Vec<Preset> {
    FACTORY_CURVES
        .iter()
        .map(|(name, curve)| {
            Preset::new(*name, GainVector::from_db(resample_curve(curve, layout.len())))
        })
        .collect()
}

/// In-memory preset store
///
/// Presets are keyed by name; saving replaces. Load order is by name,
/// so repeated `load_all` calls are deterministic.
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: BTreeMap<String, Preset>,
}

impl MemoryPresetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with the factory presets for a layout
    pub fn with_factory(layout: &BandLayout) -> Self {
        let mut store = Self::new();
        for preset in factory_presets(layout) {
            store.presets.insert(preset.name.clone(), preset);
        }
        store
    }
}

impl PresetStore for MemoryPresetStore {
    fn load_all(&self) -> Result<Vec<Preset>> {
        Ok(self.presets.values().cloned().collect())
    }

    fn save(&mut self, preset: &Preset) -> Result<()> {
        self.presets.insert(preset.name.clone(), preset.clone());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        match self.presets.remove(name) {
            Some(_) => Ok(()),
            None => Err(CoreError::storage(format!("no preset named '{name}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_presets_match_layout_size() {
        let layout = BandLayout::three_way();
        let presets = factory_presets(&layout);
        assert_eq!(presets.len(), 5);
        for preset in &presets {
            assert_eq!(preset.gains.len(), 3);
        }
    }

    #[test]
    fn ten_band_curves_pass_through_unchanged() {
        let layout = BandLayout::ten_band();
        let presets = factory_presets(&layout);

        let bass = presets.iter().find(|p| p.name == "Bass Boost").unwrap();
        assert_eq!(bass.gains.as_db(), &[6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn resampled_curve_keeps_endpoints() {
        let gains = resample_curve(&FACTORY_CURVES[1].1, 3);
        assert_eq!(gains.len(), 3);
        assert_eq!(gains[0], 6.0);
        assert_eq!(gains[2], 0.0);
    }

    #[test]
    fn store_save_replaces() {
        let layout = BandLayout::three_way();
        let mut store = MemoryPresetStore::new();

        let a = Preset::new("Custom", GainVector::from_db(vec![1.0, 0.0, 0.0]));
        let b = Preset::new("Custom", GainVector::from_db(vec![2.0, 0.0, 0.0]));
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].gains, b.gains);
        assert_eq!(all[0].gains.len(), layout.len());
    }

    #[test]
    fn delete_missing_preset_is_an_error() {
        let mut store = MemoryPresetStore::new();
        assert!(store.delete("nope").is_err());

        let preset = Preset::new("Keep", GainVector::from_db(vec![0.0; 3]));
        store.save(&preset).unwrap();
        assert!(store.delete("Keep").is_ok());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn factory_store_contains_flat() {
        let store = MemoryPresetStore::with_factory(&BandLayout::three_way());
        let all = store.load_all().unwrap();
        let flat = all.iter().find(|p| p.name == "Flat").unwrap();
        assert!(flat.gains.is_flat());
    }
}
