//! Integer-step decimation.
//!
//! No anti-aliasing is applied here; callers low-pass first (the envelope
//! already is a low-pass signal).

/// Number of output frames when taking every `step`-th of `frames` frames.
#[inline]
pub fn decimated_len(frames: usize, step: usize) -> usize {
    let step = step.max(1);
    frames.div_ceil(step)
}

/// Keep every `step`-th sample, starting with the first.
pub fn decimate(input: &[f32], step: usize) -> Vec<f32> {
    let step = step.max(1);
    if step == 1 {
        return input.to_vec();
    }
    input.iter().step_by(step).copied().collect()
}
