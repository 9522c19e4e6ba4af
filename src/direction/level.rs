//! Level-difference strategy: weighted vector sum of microphone bearings.
//!
//! Each channel's share of the total peak energy weights the unit vector of
//! its microphone:
//!
//! ```text
//! angle      = atan2(Σ wᵢ·sin θᵢ, Σ wᵢ·cos θᵢ)      wᵢ = eᵢ / Σ e
//! confidence = |Σ wᵢ·(sin θᵢ, cos θᵢ)|               ∈ [0, 1]
//! ```
//!
//! Energy concentrated on one microphone gives confidence 1; energy spread
//! evenly around a symmetric array cancels out and gives confidence ≈ 0.

use super::geometry::{bearing, MicPosition};
use super::EstimateError;

/// Bearing and resultant magnitude for the given per-channel energies.
///
/// `energies[i]` belongs to `geometry[i]`.
///
/// # Errors
///
/// * [`EstimateError::GeometryMismatch`]: lengths differ.
/// * [`EstimateError::InsufficientSignal`]: energies are all zero, negative
///   or non-finite.
pub fn weighted_centroid(
    energies: &[f32],
    geometry: &[MicPosition],
) -> Result<(f64, f64), EstimateError> {
    if energies.len() != geometry.len() {
        return Err(EstimateError::GeometryMismatch {
            channels: energies.len(),
            mics: geometry.len(),
        });
    }
    if energies.iter().any(|e| !e.is_finite() || *e < 0.0) {
        return Err(EstimateError::InsufficientSignal);
    }

    let total: f64 = energies.iter().map(|&e| e as f64).sum();
    if total <= f64::EPSILON {
        return Err(EstimateError::InsufficientSignal);
    }

    let (mut east, mut north) = (0.0_f64, 0.0_f64);
    for (&e, mic) in energies.iter().zip(geometry) {
        let w = e as f64 / total;
        let (ux, uy) = mic.unit();
        east += w * ux;
        north += w * uy;
    }

    let magnitude = east.hypot(north).clamp(0.0, 1.0);
    Ok((bearing(east, north), magnitude))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
