//! Time-difference strategy: inter-channel lag from cross-correlation,
//! converted to a far-field arrival direction.
//!
//! For every microphone pair `(i, j)` the lag `τᵢⱼ` that maximises the
//! normalised cross-correlation is found within the physically possible
//! range `|baseline| / c`.  A plane wave arriving from unit direction `u`
//! reaches position `p` at `t₀ − p·u / c`, so each pair contributes one
//! linear equation
//!
//! ```text
//! (pⱼ − pᵢ) · u = −c · τᵢⱼ
//! ```
//!
//! and `u` is the 2-D least-squares solution.  Returns `None` whenever the
//! data cannot support an answer; the caller then falls back to level
//! differences.

use super::geometry::{bearing, MicPosition};

/// Best lag between two channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairLag {
    /// Samples by which the second channel trails the first (sub-sample
    /// refined, may be negative).
    pub lag_samples: f64,
    /// Normalised correlation at the peak, in `[-1, 1]`.
    pub peak: f64,
}

/// Lag of `b` relative to `a` searched over `-max_lag..=max_lag`.
///
/// Returns `None` when either channel is silent or the inputs are empty.
pub fn correlation_lag(a: &[f32], b: &[f32], max_lag: usize) -> Option<PairLag> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }
    let energy_a: f64 = a[..n].iter().map(|&x| (x as f64) * (x as f64)).sum();
    let energy_b: f64 = b[..n].iter().map(|&x| (x as f64) * (x as f64)).sum();
    let norm = (energy_a * energy_b).sqrt();
    if norm <= f64::EPSILON {
        return None;
    }

    let max_lag = max_lag.min(n - 1) as isize;
    let corr = |k: isize| -> f64 {
        let (start, end) = if k >= 0 {
            (0, n as isize - k)
        } else {
            (-k, n as isize)
        };
        (start..end)
            .map(|i| a[i as usize] as f64 * b[(i + k) as usize] as f64)
            .sum::<f64>()
            / norm
    };

    let values: Vec<f64> = (-max_lag..=max_lag).map(corr).collect();
    let (best, &peak) = values
        .iter()
        .enumerate()
        .max_by(|x, y| x.1.total_cmp(y.1))?;

    // Parabolic refinement around the peak.
    let mut delta = 0.0;
    if best > 0 && best + 1 < values.len() {
        let (l, c, r) = (values[best - 1], values[best], values[best + 1]);
        let denom = l - 2.0 * c + r;
        if denom < 0.0 {
            delta = (0.5 * (l - r) / denom).clamp(-0.5, 0.5);
        }
    }

    Some(PairLag {
        lag_samples: best as f64 - max_lag as f64 + delta,
        peak,
    })
}

/// Arrival bearing and confidence from synchronised waveforms.
///
/// `waveforms[i]` belongs to `geometry[i]`.  Confidence is the mean pair
/// correlation peak scaled by how close the solved direction vector is to
/// unit length.
pub fn estimate_time_difference(
    waveforms: &[Vec<f32>],
    geometry: &[MicPosition],
    sample_rate: u32,
    speed_of_sound: f32,
) -> Option<(f64, f64)> {
    if waveforms.len() != geometry.len() || geometry.len() < 2 || sample_rate == 0 {
        return None;
    }
    let len = waveforms[0].len();
    if len < 2 || waveforms.iter().any(|w| w.len() != len) {
        return None;
    }

    let fs = sample_rate as f64;
    let c = speed_of_sound as f64;
    let positions: Vec<(f64, f64)> = geometry.iter().map(MicPosition::position).collect();

    // Normal equations AᵀA·u = Aᵀb
    let (mut sxx, mut sxy, mut syy) = (0.0_f64, 0.0_f64, 0.0_f64);
    let (mut bx, mut by) = (0.0_f64, 0.0_f64);
    let mut peaks = Vec::new();

    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            let dx = positions[j].0 - positions[i].0;
            let dy = positions[j].1 - positions[i].1;
            let baseline = dx.hypot(dy);
            if baseline < 1e-6 {
                continue;
            }
            let max_lag = (baseline / c * fs).ceil() as usize + 1;
            let lag = correlation_lag(&waveforms[i], &waveforms[j], max_lag)?;

            let rhs = -c * lag.lag_samples / fs;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
            bx += dx * rhs;
            by += dy * rhs;
            peaks.push(lag.peak.max(0.0));
        }
    }

    let det = sxx * syy - sxy * sxy;
    let scale = (sxx + syy).powi(2);
    if peaks.is_empty() || det <= 1e-9 * scale {
        return None;
    }

    let ux = (syy * bx - sxy * by) / det;
    let uy = (sxx * by - sxy * bx) / det;
    let magnitude = ux.hypot(uy);
    if magnitude < 1e-9 {
        return None;
    }

    let mean_peak = peaks.iter().sum::<f64>() / peaks.len() as f64;
    let consistency = (1.0 - (magnitude - 1.0).abs()).clamp(0.0, 1.0);
    Some((bearing(ux, uy), (mean_peak * consistency).clamp(0.0, 1.0)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 48_000;
    const C: f32 = 343.0;

    /// Deterministic broadband burst (xorshift noise).
    fn burst(len: usize) -> Vec<f32> {
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn delayed(signal: &[f32], delay: usize, total: usize) -> Vec<f32> {
        let mut out = vec![0.0; total];
        out[delay..delay + signal.len()].copy_from_slice(signal);
        out
    }

    fn square(radius: f32) -> Vec<MicPosition> {
        [0.0, 90.0, 180.0, 270.0]
            .into_iter()
            .map(|a| MicPosition::new(a, radius))
            .collect()
    }

    /// Render a plane wave arriving from `source_deg` on `geometry`.
    fn plane_wave(source_deg: f64, geometry: &[MicPosition]) -> Vec<Vec<f32>> {
        let pulse = burst(256);
        let (ux, uy) = MicPosition::new(source_deg as f32, 1.0).unit();
        geometry
            .iter()
            .map(|mic| {
                let (px, py) = mic.position();
                let t = -(px * ux + py * uy) / C as f64;
                let delay = (200.0 + t * FS as f64).round() as usize;
                delayed(&pulse, delay, 700)
            })
            .collect()
    }

    #[test]
    fn lag_of_delayed_copy() {
        let pulse = burst(128);
        let a = delayed(&pulse, 10, 300);
        let b = delayed(&pulse, 17, 300);
        let lag = correlation_lag(&a, &b, 20).unwrap();
        assert!((lag.lag_samples - 7.0).abs() < 0.5, "lag = {:?}", lag);
        assert!(lag.peak > 0.99);

        let back = correlation_lag(&b, &a, 20).unwrap();
        assert!((back.lag_samples + 7.0).abs() < 0.5);
    }

    #[test]
    fn silent_channel_has_no_lag() {
        assert!(correlation_lag(&[0.0; 64], &burst(64), 8).is_none());
        assert!(correlation_lag(&[], &[], 8).is_none());
    }

    #[test]
    fn recovers_plane_wave_bearing() {
        let geometry = square(0.5);
        for source in [0.0, 90.0, 135.0, 250.0] {
            let waves = plane_wave(source, &geometry);
            let (angle, conf) = estimate_time_difference(&waves, &geometry, FS, C).unwrap();
            let err = ((angle - source + 540.0) % 360.0 - 180.0).abs();
            assert!(err < 3.0, "source {source} → {angle}");
            assert!(conf > 0.8, "confidence {conf}");
        }
    }

    #[test]
    fn collinear_pair_cannot_resolve() {
        let geometry = vec![MicPosition::new(0.0, 0.5), MicPosition::new(180.0, 0.5)];
        let waves = plane_wave(45.0, &geometry);
        assert!(estimate_time_difference(&waves, &geometry, FS, C).is_none());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let geometry = square(0.5);
        let mut waves = plane_wave(90.0, &geometry);
        waves[2].pop();
        assert!(estimate_time_difference(&waves, &geometry, FS, C).is_none());
    }
}
