//! Coarse distance buckets from received peak energy.
//!
//! The bucket is a unitless relative proxy: louder means nearer.  No physical
//! distance is implied.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceClass {
    Near,
    Medium,
    Far,
}

impl DistanceClass {
    /// Bucket `peak_energy` against `near_energy > far_energy`.
    ///
    /// ```
    /// use sound_compass::direction::DistanceClass;
    ///
    /// assert_eq!(DistanceClass::from_energy(0.5, 0.25, 0.05), DistanceClass::Near);
    /// assert_eq!(DistanceClass::from_energy(0.1, 0.25, 0.05), DistanceClass::Medium);
    /// assert_eq!(DistanceClass::from_energy(0.01, 0.25, 0.05), DistanceClass::Far);
    /// ```
    pub fn from_energy(peak_energy: f32, near_energy: f32, far_energy: f32) -> Self {
        if peak_energy >= near_energy {
            DistanceClass::Near
        } else if peak_energy >= far_energy {
            DistanceClass::Medium
        } else {
            DistanceClass::Far
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceClass::Near => "near",
            DistanceClass::Medium => "medium",
            DistanceClass::Far => "far",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rank used to check monotonicity (higher = nearer).
    fn rank(class: DistanceClass) -> u8 {
        match class {
            DistanceClass::Far => 0,
            DistanceClass::Medium => 1,
            DistanceClass::Near => 2,
        }
    }

    #[test]
    fn buckets_are_monotonic_in_energy() {
        let mut last = 0;
        for i in 0..=100 {
            let r = rank(DistanceClass::from_energy(i as f32 / 100.0, 0.25, 0.05));
            assert!(r >= last, "energy {} dropped to rank {r}", i as f32 / 100.0);
            last = r;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn boundaries_belong_to_the_nearer_bucket() {
        assert_eq!(DistanceClass::from_energy(0.25, 0.25, 0.05), DistanceClass::Near);
        assert_eq!(DistanceClass::from_energy(0.05, 0.25, 0.05), DistanceClass::Medium);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DistanceClass::Medium).unwrap(), "\"medium\"");
        assert_eq!(DistanceClass::Far.label(), "far");
    }
}
