//! Sound alerts: the externally visible record produced by fusing a
//! finalized event, its direction estimate and a classification outcome.

use serde::{Deserialize, Serialize};

use super::priority::{Priority, PriorityMapper};
use crate::classify::Classification;
use crate::config::FusionConfig;
use crate::direction::{DirectionEstimate, DistanceClass};
use crate::segment::{EventId, SoundEvent};

pub type AlertId = u64;

/// Label used when the classifier timed out or failed.
pub const UNKNOWN_LABEL: &str = "unknown";
/// Label used when the classifier answered below the usable confidence.
pub const UNKNOWN_SOUND_LABEL: &str = "Unknown sound";

// ---------------------------------------------------------------------------
// ClassificationOutcome
// ---------------------------------------------------------------------------

/// What came back for one pending event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Classified(Classification),
    TimedOut,
    Failed(String),
}

// ---------------------------------------------------------------------------
// SoundAlert
// ---------------------------------------------------------------------------

/// Immutable once created.  Serializes as the flat [`AlertRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "AlertRecord")]
pub struct SoundAlert {
    pub id: AlertId,
    pub event_id: EventId,
    pub sound_label: String,
    pub confidence: f32,
    /// `None` for the no-direction variant (silent or malformed event).
    pub direction: Option<DirectionEstimate>,
    pub priority: Priority,
    /// Milliseconds on the capture clock.
    pub timestamp_ms: u64,
}

impl SoundAlert {
    /// Short human-readable summary, e.g. `"Doorbell (northeast)"`.
    pub fn description(&self) -> String {
        match self.direction {
            Some(d) if !d.indeterminate => {
                format!("{} ({})", self.sound_label, d.compass_point().label())
            }
            _ => self.sound_label.clone(),
        }
    }

    pub fn to_record(&self) -> AlertRecord {
        AlertRecord::from(self.clone())
    }
}

/// Flat wire shape consumed by alert feed clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: AlertId,
    pub sound_label: String,
    pub confidence: f32,
    pub angle_degrees: Option<f32>,
    pub distance_class: Option<DistanceClass>,
    pub priority: Priority,
    pub timestamp: u64,
}

impl From<SoundAlert> for AlertRecord {
    fn from(alert: SoundAlert) -> Self {
        Self {
            id: alert.id,
            sound_label: alert.sound_label,
            confidence: alert.confidence,
            angle_degrees: alert.direction.map(|d| d.angle_degrees),
            distance_class: alert.direction.map(|d| d.distance_class),
            priority: alert.priority,
            timestamp: alert.timestamp_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// AlertFusion
// ---------------------------------------------------------------------------

/// Assigns labels, priorities and fresh ids.  Ids are never reused.
#[derive(Debug, Clone)]
pub struct AlertFusion {
    min_label_confidence: f32,
    mapper: PriorityMapper,
    next_id: AlertId,
}

impl AlertFusion {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            min_label_confidence: config.min_label_confidence,
            mapper: PriorityMapper::from_config(config),
            next_id: 1,
        }
    }

    pub fn fuse(
        &mut self,
        event: &SoundEvent,
        direction: Option<DirectionEstimate>,
        outcome: &ClassificationOutcome,
    ) -> SoundAlert {
        let (sound_label, confidence) = match outcome {
            ClassificationOutcome::Classified(c) if c.confidence >= self.min_label_confidence => {
                (c.label.clone(), c.confidence)
            }
            ClassificationOutcome::Classified(c) => (UNKNOWN_SOUND_LABEL.to_string(), c.confidence),
            ClassificationOutcome::TimedOut | ClassificationOutcome::Failed(_) => {
                (UNKNOWN_LABEL.to_string(), 0.0)
            }
        };

        let id = self.next_id;
        self.next_id += 1;

        SoundAlert {
            id,
            event_id: event.id,
            priority: self.mapper.priority(&sound_label),
            sound_label,
            confidence,
            direction,
            timestamp_ms: event.offset_ms.unwrap_or(event.onset_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::EstimationMethod;

    fn event() -> SoundEvent {
        SoundEvent {
            id: 3,
            onset_ms: 1_000,
            offset_ms: Some(1_450),
            peak_energy: 0.3,
            channel_peaks: vec![0.3, 0.1, 0.0, 0.0],
            active_frames: 12,
            span_frames: 17,
        }
    }

    fn northeast(indeterminate: bool) -> DirectionEstimate {
        DirectionEstimate {
            angle_degrees: 45.0,
            confidence: if indeterminate { 0.05 } else { 0.7 },
            distance_class: DistanceClass::Near,
            indeterminate,
            method: EstimationMethod::LevelDifference,
        }
    }

    fn fusion() -> AlertFusion {
        AlertFusion::new(&FusionConfig::default())
    }

    fn classified(label: &str, confidence: f32) -> ClassificationOutcome {
        ClassificationOutcome::Classified(Classification::new(label, confidence))
    }

    #[test]
    fn car_horn_fuses_as_critical() {
        let alert = fusion().fuse(&event(), Some(northeast(false)), &classified("car horn", 0.95));
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.sound_label, "car horn");
        assert_eq!(alert.event_id, 3);
        assert_eq!(alert.timestamp_ms, 1_450);
    }

    #[test]
    fn bird_chirping_fuses_as_low() {
        let alert = fusion().fuse(&event(), None, &classified("bird chirping", 0.95));
        assert_eq!(alert.priority, Priority::Low);
    }

    #[test]
    fn low_confidence_is_unknown_sound() {
        let alert = fusion().fuse(&event(), Some(northeast(false)), &classified("Siren", 0.1));
        assert_eq!(alert.sound_label, UNKNOWN_SOUND_LABEL);
        assert!((alert.confidence - 0.1).abs() < 1e-6);
        assert_eq!(alert.priority, Priority::Normal);
        assert!(alert.direction.is_some());
    }

    #[test]
    fn timeout_keeps_direction() {
        let dir = northeast(false);
        let alert = fusion().fuse(&event(), Some(dir), &ClassificationOutcome::TimedOut);
        assert_eq!(alert.sound_label, UNKNOWN_LABEL);
        assert_eq!(alert.confidence, 0.0);
        assert_eq!(alert.direction, Some(dir));
    }

    #[test]
    fn ids_increase() {
        let mut f = fusion();
        let a = f.fuse(&event(), None, &ClassificationOutcome::Failed("boom".into()));
        let b = f.fuse(&event(), None, &ClassificationOutcome::TimedOut);
        assert!(b.id > a.id);
    }

    #[test]
    fn description_uses_compass_point() {
        let mut f = fusion();
        let a = f.fuse(&event(), Some(northeast(false)), &classified("Doorbell", 0.9));
        assert_eq!(a.description(), "Doorbell (northeast)");
        let b = f.fuse(&event(), Some(northeast(true)), &classified("Doorbell", 0.9));
        assert_eq!(b.description(), "Doorbell");
        let c = f.fuse(&event(), None, &classified("Doorbell", 0.9));
        assert_eq!(c.description(), "Doorbell");
    }

    #[test]
    fn serializes_as_flat_record() {
        let alert = fusion().fuse(&event(), Some(northeast(false)), &classified("Doorbell", 0.9));
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["sound_label"], "Doorbell");
        assert_eq!(json["angle_degrees"], 45.0);
        assert_eq!(json["distance_class"], "near");
        assert_eq!(json["priority"], "important");
        assert_eq!(json["timestamp"], 1_450);
        assert_eq!(json.as_object().unwrap().len(), 7);

        let back: AlertRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert.to_record());
    }

    #[test]
    fn no_direction_serializes_nulls() {
        let alert = fusion().fuse(&event(), None, &ClassificationOutcome::TimedOut);
        let json = serde_json::to_value(&alert).unwrap();
        assert!(json["angle_degrees"].is_null());
        assert!(json["distance_class"].is_null());
    }
}
