//! Onset/offset thresholds and the ambient noise-floor estimate they are
//! calibrated from.

use crate::config::SegmentationConfig;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Hysteresis pair; `offset < onset` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub onset: f32,
    pub offset: f32,
}

impl Thresholds {
    /// Thresholds fixed by configuration, or `None` when the onset must be
    /// calibrated from ambient noise.
    pub fn from_config(cfg: &SegmentationConfig) -> Option<Self> {
        let onset = cfg.onset_threshold?;
        let offset = cfg
            .offset_threshold
            .unwrap_or(onset * cfg.offset_ratio);
        Some(Self { onset, offset })
    }

    /// Thresholds from a measured noise floor.
    ///
    /// `onset = max(mean + k·stddev, min_onset)`; the offset sits
    /// `offset_ratio` of the way from the mean up to the onset, unless the
    /// configuration pins it to a lower value.
    pub fn from_ambient(floor: &NoiseFloor, cfg: &SegmentationConfig) -> Self {
        let mean = floor.mean();
        let onset = (mean + cfg.ambient_k * floor.stddev()).max(cfg.min_onset_threshold);
        let derived = mean + cfg.offset_ratio * (onset - mean);
        let offset = match cfg.offset_threshold {
            Some(fixed) if fixed < onset => fixed,
            Some(fixed) => {
                log::warn!(
                    "configured offset {fixed:.4} is not below calibrated onset {onset:.4}; using {derived:.4}"
                );
                derived
            }
            None => derived,
        };
        // Perfectly steady ambient with k = 0 puts the onset on the mean.
        let offset = if offset < onset { offset } else { onset * cfg.offset_ratio };
        Self { onset, offset }
    }
}

// ---------------------------------------------------------------------------
// NoiseFloor
// ---------------------------------------------------------------------------

/// Running mean/variance of ambient energy (Welford's algorithm).
#[derive(Debug, Clone, Default)]
pub struct NoiseFloor {
    count: usize,
    mean: f64,
    m2: f64,
}

impl NoiseFloor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, energy: f32) {
        self.count += 1;
        let x = energy as f64;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f32 {
        self.mean as f32
    }

    /// Population standard deviation (0.0 with fewer than two samples).
    pub fn stddev(&self) -> f32 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / self.count as f64).sqrt() as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_floor_statistics() {
        let mut floor = NoiseFloor::new();
        for e in [0.01_f32, 0.03, 0.01, 0.03] {
            floor.add(e);
        }
        assert_eq!(floor.count(), 4);
        assert!((floor.mean() - 0.02).abs() < 1e-6);
        assert!((floor.stddev() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn ambient_thresholds_respect_hysteresis() {
        let mut floor = NoiseFloor::new();
        for e in [0.01_f32, 0.03, 0.01, 0.03] {
            floor.add(e);
        }
        let cfg = SegmentationConfig {
            ambient_k: 4.0,
            offset_ratio: 0.5,
            min_onset_threshold: 0.0,
            ..SegmentationConfig::default()
        };
        let t = Thresholds::from_ambient(&floor, &cfg);
        assert!((t.onset - 0.06).abs() < 1e-6, "onset = {}", t.onset);
        assert!((t.offset - 0.04).abs() < 1e-6, "offset = {}", t.offset);
        assert!(t.offset < t.onset);
    }

    #[test]
    fn silent_room_uses_minimum_onset() {
        let mut floor = NoiseFloor::new();
        for _ in 0..10 {
            floor.add(0.0);
        }
        let cfg = SegmentationConfig::default();
        let t = Thresholds::from_ambient(&floor, &cfg);
        assert_eq!(t.onset, cfg.min_onset_threshold);
        assert!(t.offset < t.onset);
    }

    #[test]
    fn steady_ambient_keeps_offset_below_onset() {
        let mut floor = NoiseFloor::new();
        for _ in 0..10 {
            floor.add(0.2);
        }
        let cfg = SegmentationConfig {
            ambient_k: 0.0,
            offset_ratio: 0.5,
            ..SegmentationConfig::default()
        };
        let t = Thresholds::from_ambient(&floor, &cfg);
        assert!((t.onset - 0.2).abs() < 1e-6);
        assert!((t.offset - 0.1).abs() < 1e-6, "offset = {}", t.offset);
    }

    #[test]
    fn fixed_onset_without_offset_uses_ratio() {
        let cfg = SegmentationConfig {
            onset_threshold: Some(0.4),
            offset_ratio: 0.5,
            ..SegmentationConfig::default()
        };
        assert_eq!(
            Thresholds::from_config(&cfg),
            Some(Thresholds { onset: 0.4, offset: 0.2 })
        );
        assert_eq!(Thresholds::from_config(&SegmentationConfig::default()), None);
    }
}
