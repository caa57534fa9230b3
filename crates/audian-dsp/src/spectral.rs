//! Decibel conversion and order statistics for spectrogram tiles.

/// Level reported for a tile with no power at all.
pub const SILENCE_DB: f32 = -200.0;

/// Convert power values to decibels in place, `10 * log10(p)`.
///
/// Non-positive values are first replaced by the smallest positive value in
/// `power`, so silent cells sit at the quietest level of the tile instead of
/// `-inf`.
pub fn power_to_db(power: &mut [f32]) {
    let floor = power
        .iter()
        .copied()
        .filter(|&p| p > 0.0)
        .fold(f32::INFINITY, f32::min);

    if !floor.is_finite() {
        power.fill(SILENCE_DB);
        return;
    }

    for p in power.iter_mut() {
        let value = if *p > 0.0 { *p } else { floor };
        *p = 10.0 * value.log10();
    }
}

/// The `q`-th percentile (0..=100) with linear interpolation between the two
/// nearest ranks. NaNs sort last. `None` for an empty slice.
pub fn percentile(values: &[f32], q: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let q = q.clamp(0.0, 100.0) / 100.0;
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
