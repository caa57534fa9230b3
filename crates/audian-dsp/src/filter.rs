//! Butterworth filters as cascades of second-order sections.
//!
//! Each section is the bilinear transform (with frequency prewarping) of one
//! analog Butterworth pole pair, so the cascade has exactly the Butterworth
//! magnitude response. Odd orders add one first-order section. Band-pass is a
//! high-pass cascade followed by a low-pass cascade of the same order.

use crate::{Error, Result};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Highest supported Butterworth order.
pub const MAX_ORDER: usize = 16;

/// Filter response selected from a pair of cutoffs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    /// Identity, no filtering at all.
    PassThrough,
    Lowpass { cutoff: f64 },
    Highpass { cutoff: f64 },
    Bandpass { low: f64, high: f64 },
}

impl FilterKind {
    /// Pick the response for a high-pass / low-pass cutoff pair.
    ///
    /// - `highpass == 0` and `lowpass >= nyquist`: pass-through
    /// - `highpass == 0`: low-pass at `lowpass`
    /// - `lowpass >= nyquist`: high-pass at `highpass`
    /// - otherwise band-pass, which requires `highpass < lowpass`
    pub fn from_cutoffs(highpass: f64, lowpass: f64, rate: f64) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidParameter(format!("sample rate {rate}")));
        }
        if !highpass.is_finite() || !lowpass.is_finite() {
            return Err(Error::InvalidCutoff("cutoffs must be finite".into()));
        }
        if highpass < 0.0 {
            return Err(Error::InvalidCutoff(format!("negative highpass {highpass} Hz")));
        }
        if lowpass <= 0.0 {
            return Err(Error::InvalidCutoff(format!("lowpass {lowpass} Hz must be positive")));
        }

        let nyquist = rate / 2.0;
        let highpass_active = highpass > 0.0;
        let lowpass_active = lowpass < nyquist;

        if highpass_active && highpass >= nyquist {
            return Err(Error::InvalidCutoff(format!(
                "highpass {highpass} Hz at or above Nyquist {nyquist} Hz"
            )));
        }

        Ok(match (highpass_active, lowpass_active) {
            (false, false) => FilterKind::PassThrough,
            (false, true) => FilterKind::Lowpass { cutoff: lowpass },
            (true, false) => FilterKind::Highpass { cutoff: highpass },
            (true, true) => {
                if highpass >= lowpass {
                    return Err(Error::InvalidCutoff(format!(
                        "highpass {highpass} Hz must be below lowpass {lowpass} Hz"
                    )));
                }
                FilterKind::Bandpass {
                    low: highpass,
                    high: lowpass,
                }
            }
        })
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, FilterKind::PassThrough)
    }
}

/// One normalized section `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    /// `a[0]` is always 1.
    pub a: [f64; 3],
}

#[derive(Clone, Copy)]
enum Response {
    Low,
    High,
}

impl Biquad {
    fn second_order(response: Response, cutoff: f64, q: f64, rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        let b = match response {
            Response::Low => [(1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0],
            Response::High => [(1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0],
        };

        Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [1.0, -2.0 * cos_w0 / a0, (1.0 - alpha) / a0],
        }
    }

    fn first_order(response: Response, cutoff: f64, rate: f64) -> Self {
        let k = (PI * cutoff / rate).tan();
        let a1 = (k - 1.0) / (k + 1.0);
        let b = match response {
            Response::Low => [k / (1.0 + k), k / (1.0 + k), 0.0],
            Response::High => [1.0 / (1.0 + k), -1.0 / (1.0 + k), 0.0],
        };
        Self {
            b,
            a: [1.0, a1, 0.0],
        }
    }

    /// Gain at DC.
    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[1] + self.a[2])
    }

    /// Transposed direct-form II state after settling on a unit step.
    fn step_state(&self) -> [f64; 2] {
        let y = self.dc_gain();
        let z2 = self.b[2] - self.a[2] * y;
        let z1 = self.b[1] - self.a[1] * y + z2;
        [z1, z2]
    }

    fn response_at(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = 1.0 + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }
}

/// A cascade of [`Biquad`] sections. An empty cascade is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    kind: FilterKind,
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// The identity filter.
    pub fn pass_through() -> Self {
        Self {
            kind: FilterKind::PassThrough,
            sections: Vec::new(),
        }
    }

    /// Design a digital Butterworth filter of the given order.
    pub fn butterworth(kind: FilterKind, order: usize, rate: f64) -> Result<Self> {
        if !(1..=MAX_ORDER).contains(&order) {
            return Err(Error::InvalidParameter(format!(
                "filter order {order} outside 1..={MAX_ORDER}"
            )));
        }
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidParameter(format!("sample rate {rate}")));
        }

        let nyquist = rate / 2.0;
        let check = |cutoff: f64| {
            if cutoff > 0.0 && cutoff < nyquist {
                Ok(())
            } else {
                Err(Error::InvalidCutoff(format!(
                    "{cutoff} Hz outside (0, {nyquist}) Hz"
                )))
            }
        };

        let sections = match kind {
            FilterKind::PassThrough => Vec::new(),
            FilterKind::Lowpass { cutoff } => {
                check(cutoff)?;
                butterworth_sections(Response::Low, cutoff, order, rate)
            }
            FilterKind::Highpass { cutoff } => {
                check(cutoff)?;
                butterworth_sections(Response::High, cutoff, order, rate)
            }
            FilterKind::Bandpass { low, high } => {
                check(low)?;
                check(high)?;
                if low >= high {
                    return Err(Error::InvalidCutoff(format!(
                        "band edges {low} Hz >= {high} Hz"
                    )));
                }
                let mut sections = butterworth_sections(Response::High, low, order, rate);
                sections.extend(butterworth_sections(Response::Low, high, order, rate));
                sections
            }
        };

        Ok(Self { kind, sections })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn is_identity(&self) -> bool {
        self.sections.is_empty()
    }

    /// Edge padding used by zero-phase filtering.
    pub fn padlen(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Magnitude response at `freq` Hz.
    pub fn gain_at(&self, freq: f64, rate: f64) -> f64 {
        let w = 2.0 * PI * freq / rate;
        let z_inv = Complex64::from_polar(1.0, -w);
        self.sections
            .iter()
            .map(|s| s.response_at(z_inv))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    /// Per-section state that makes the cascade start settled on a unit
    /// step; scale by the first input sample.
    pub(crate) fn steady_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|section| {
                let [z1, z2] = section.step_state();
                let state = [z1 * scale, z2 * scale];
                scale *= section.dc_gain();
                state
            })
            .collect()
    }

    /// Run every section over `data` in place, starting from
    /// `initial[i] * scale`.
    pub(crate) fn run(&self, data: &mut [f64], initial: &[[f64; 2]], scale: f64) {
        for (section, init) in self.sections.iter().zip(initial) {
            let [b0, b1, b2] = section.b;
            let [_, a1, a2] = section.a;
            let mut z1 = init[0] * scale;
            let mut z2 = init[1] * scale;
            for x in data.iter_mut() {
                let input = *x;
                let y = b0 * input + z1;
                z1 = b1 * input - a1 * y + z2;
                z2 = b2 * input - a2 * y;
                *x = y;
            }
        }
    }
}

fn butterworth_sections(response: Response, cutoff: f64, order: usize, rate: f64) -> Vec<Biquad> {
    let mut sections: Vec<Biquad> = (0..order / 2)
        .map(|k| {
            let q = 1.0 / (2.0 * ((2 * k + 1) as f64 * PI / (2 * order) as f64).sin());
            Biquad::second_order(response, cutoff, q, rate)
        })
        .collect();
    if order % 2 == 1 {
        sections.push(Biquad::first_order(response, cutoff, rate));
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: f64 = 44100.0;

    #[test]
    fn test_mode_selection() {
        assert_eq!(
            FilterKind::from_cutoffs(0.0, RATE / 2.0, RATE).unwrap(),
            FilterKind::PassThrough
        );
        assert_eq!(
            FilterKind::from_cutoffs(0.0, 1000.0, RATE).unwrap(),
            FilterKind::Lowpass { cutoff: 1000.0 }
        );
        assert_eq!(
            FilterKind::from_cutoffs(300.0, 30000.0, RATE).unwrap(),
            FilterKind::Highpass { cutoff: 300.0 }
        );
        assert_eq!(
            FilterKind::from_cutoffs(500.0, 2000.0, RATE).unwrap(),
            FilterKind::Bandpass {
                low: 500.0,
                high: 2000.0
            }
        );
    }

    #[test]
    fn test_invalid_cutoffs() {
        assert!(FilterKind::from_cutoffs(2000.0, 500.0, RATE).is_err());
        assert!(FilterKind::from_cutoffs(1000.0, 1000.0, RATE).is_err());
        assert!(FilterKind::from_cutoffs(-1.0, 1000.0, RATE).is_err());
        assert!(FilterKind::from_cutoffs(0.0, 0.0, RATE).is_err());
        assert!(FilterKind::from_cutoffs(f64::NAN, 1000.0, RATE).is_err());
        assert!(FilterKind::from_cutoffs(RATE, RATE, RATE).is_err());
    }

    #[test]
    fn test_butterworth_cutoff_is_minus_3db() {
        for order in 1..=6 {
            let lp = SosFilter::butterworth(FilterKind::Lowpass { cutoff: 1000.0 }, order, RATE)
                .unwrap();
            assert_abs_diff_eq!(lp.gain_at(1000.0, RATE), 1.0 / 2f64.sqrt(), epsilon = 1e-9);
            assert_abs_diff_eq!(lp.gain_at(0.0, RATE), 1.0, epsilon = 1e-9);

            let hp = SosFilter::butterworth(FilterKind::Highpass { cutoff: 1000.0 }, order, RATE)
                .unwrap();
            assert_abs_diff_eq!(hp.gain_at(1000.0, RATE), 1.0 / 2f64.sqrt(), epsilon = 1e-9);
            assert_abs_diff_eq!(hp.gain_at(0.0, RATE), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_section_count() {
        let f = SosFilter::butterworth(FilterKind::Lowpass { cutoff: 100.0 }, 5, RATE).unwrap();
        assert_eq!(f.sections().len(), 3);
        let f = SosFilter::butterworth(
            FilterKind::Bandpass {
                low: 100.0,
                high: 200.0,
            },
            2,
            RATE,
        )
        .unwrap();
        assert_eq!(f.sections().len(), 2);
    }

    #[test]
    fn test_bandpass_rejects_outside() {
        let bp = SosFilter::butterworth(
            FilterKind::Bandpass {
                low: 2000.0,
                high: 4000.0,
            },
            2,
            RATE,
        )
        .unwrap();
        assert!(bp.gain_at(3000.0, RATE) > 0.8);
        assert!(bp.gain_at(100.0, RATE) < 0.01);
        assert!(bp.gain_at(18000.0, RATE) < 0.05);
    }

    #[test]
    fn test_rejects_bad_order_and_cutoff() {
        let kind = FilterKind::Lowpass { cutoff: 100.0 };
        assert!(SosFilter::butterworth(kind, 0, RATE).is_err());
        assert!(SosFilter::butterworth(kind, MAX_ORDER + 1, RATE).is_err());
        assert!(SosFilter::butterworth(FilterKind::Lowpass { cutoff: RATE }, 2, RATE).is_err());
    }

    #[test]
    fn test_pass_through_is_identity() {
        let filter = SosFilter::pass_through();
        assert!(filter.is_identity());
        assert_eq!(filter.gain_at(1000.0, RATE), 1.0);
    }

    #[test]
    fn test_steady_state_holds_dc() {
        let lp = SosFilter::butterworth(FilterKind::Lowpass { cutoff: 50.0 }, 4, RATE).unwrap();
        let mut data = vec![0.7f64; 256];
        lp.run(&mut data, &lp.steady_state(), 0.7);
        for v in data {
            assert_abs_diff_eq!(v, 0.7, epsilon = 1e-9);
        }
    }
}
