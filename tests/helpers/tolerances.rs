//! Tolerance constants for pipeline testing.
//!
//! Different operations require different precision levels.

/// Floating point rounding errors (pass-through, plain copies).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// DSP processing tolerance (filters recomputed over different spans).
pub const DSP_EPSILON: f32 = 1e-4;

/// Perceptual tolerance (~-60dB).
pub const PERCEPTUAL_EPSILON: f32 = 0.001;

/// Silence threshold (~-40dB relative to a full-scale tone), for signals
/// pushed far outside a filter's passband.
pub const STOPBAND_RMS: f32 = 0.01;

/// 16-bit quantization step size.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;
