// Rate Deriver (C1): converts raw season counts into normalized per-PA
// event probabilities. See spec §4.1.
//
// Pure, side-effect-free. Stored values are float32; intermediate
// accumulation is permitted in float64 for precision and is used here.

use crate::error::{OptimizerError, Result};
use crate::hitter::HitterCounts;

/// Tolerance for the "sum of rates <= 1" invariant, per spec §3/§4.1.
pub const RATE_SUM_EPSILON: f64 = 1e-6;

/// Seven per-PA event probabilities, in the fixed order the BDNRP engine's
/// transition model depends on: 1B, 2B, 3B, HR, BB, HBP, IBB. The implicit
/// out-probability is `1.0 - sum(these)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRates {
    pub single: f32,
    pub double: f32,
    pub triple: f32,
    pub home_run: f32,
    pub walk: f32,
    pub hit_by_pitch: f32,
    pub intentional_walk: f32,
}

impl EventRates {
    /// The eight-way event distribution used by the BDNRP transition model:
    /// `[1B, 2B, 3B, HR, BB, HBP, IBB, OUT]`. If floating-point drift has
    /// pushed the implied out-probability slightly negative, it is clamped
    /// to zero and the full eight-vector renormalized to sum to exactly
    /// 1.0; the second element of the return tuple reports whether that
    /// recovery fired, so the caller can log the spec-mandated once-per-
    /// request warning.
    pub fn as_transition_probs(&self) -> ([f32; 8], bool) {
        let sum7 = self.single
            + self.double
            + self.triple
            + self.home_run
            + self.walk
            + self.hit_by_pitch
            + self.intentional_walk;
        let out = 1.0 - sum7;
        if out >= 0.0 {
            return (
                [
                    self.single,
                    self.double,
                    self.triple,
                    self.home_run,
                    self.walk,
                    self.hit_by_pitch,
                    self.intentional_walk,
                    out,
                ],
                false,
            );
        }
        // Drift pushed the implied out-probability below zero: clamp and
        // renormalize the whole vector so it sums to exactly 1.0.
        let mut v = [
            self.single,
            self.double,
            self.triple,
            self.home_run,
            self.walk,
            self.hit_by_pitch,
            self.intentional_walk,
            0.0,
        ];
        let total: f32 = v.iter().sum();
        if total > 0.0 {
            for p in v.iter_mut() {
                *p /= total;
            }
        }
        (v, true)
    }
}

/// Derive a hitter's per-PA event rates from their raw season counts.
///
/// Fails with `InvalidStats` if `pa <= 0` or any count is negative (counts
/// are unsigned so "negative" reduces to overflow-on-subtraction, handled
/// below). Fails with `RateOverflow` if the seven rates sum to more than
/// `1.0 + RATE_SUM_EPSILON`.
pub fn derive_rates(name: &str, counts: &HitterCounts) -> Result<EventRates> {
    if counts.pa == 0 {
        return Err(OptimizerError::InvalidStats {
            name: name.to_string(),
            reason: "plate appearances (pa) must be > 0".to_string(),
        });
    }

    // Singles are recomputed whenever the provided count is absent or
    // inconsistent with h - 2b - 3b - hr.
    let computed_singles = (counts.h as i64) - (counts.doubles as i64) - (counts.triples as i64)
        - (counts.hr as i64);
    let singles = match counts.singles {
        Some(provided) if provided as i64 == computed_singles => provided,
        _ => {
            if computed_singles < 0 {
                return Err(OptimizerError::InvalidStats {
                    name: name.to_string(),
                    reason: format!(
                        "h - 2b - 3b - hr is negative ({computed_singles}); stats are inconsistent"
                    ),
                });
            }
            computed_singles as u32
        }
    };

    let pa = counts.pa as f64;
    let sum7_f64 = (singles as f64
        + counts.doubles as f64
        + counts.triples as f64
        + counts.hr as f64
        + counts.bb as f64
        + counts.hbp as f64
        + counts.ibb as f64)
        / pa;

    if sum7_f64 > 1.0 + RATE_SUM_EPSILON {
        return Err(OptimizerError::RateOverflow {
            name: name.to_string(),
            sum: sum7_f64,
        });
    }

    Ok(EventRates {
        single: (singles as f64 / pa) as f32,
        double: (counts.doubles as f64 / pa) as f32,
        triple: (counts.triples as f64 / pa) as f32,
        home_run: (counts.hr as f64 / pa) as f32,
        walk: (counts.bb as f64 / pa) as f32,
        hit_by_pitch: (counts.hbp as f64 / pa) as f32,
        intentional_walk: (counts.ibb as f64 / pa) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pa: u32, h: u32, singles: Option<u32>, d: u32, t: u32, hr: u32, bb: u32, hbp: u32, ibb: u32) -> HitterCounts {
        HitterCounts {
            pa,
            h,
            singles,
            doubles: d,
            triples: t,
            hr,
            bb,
            hbp,
            ibb,
        }
    }

    #[test]
    fn zero_pa_is_invalid_stats() {
        let c = counts(0, 0, None, 0, 0, 0, 0, 0, 0);
        let err = derive_rates("x", &c).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidStats { .. }));
    }

    #[test]
    fn singles_recomputed_when_absent() {
        let c = counts(600, 143, None, 30, 3, 20, 60, 6, 2);
        let rates = derive_rates("x", &c).unwrap();
        // h - 2b - 3b - hr = 143 - 30 - 3 - 20 = 90
        assert!((rates.single - (90.0_f32 / 600.0)).abs() < 1e-6);
    }

    #[test]
    fn singles_recomputed_when_inconsistent_with_provided() {
        let c = counts(600, 143, Some(999), 30, 3, 20, 60, 6, 2);
        let rates = derive_rates("x", &c).unwrap();
        assert!((rates.single - (90.0_f32 / 600.0)).abs() < 1e-6);
    }

    #[test]
    fn rate_overflow_when_sum_exceeds_one() {
        // All counts equal pa several times over.
        let c = counts(10, 50, Some(50), 0, 0, 0, 0, 0, 0);
        let err = derive_rates("x", &c).unwrap_err();
        assert!(matches!(err, OptimizerError::RateOverflow { .. }));
    }

    #[test]
    fn rates_sum_within_epsilon_of_one_or_less() {
        let c = counts(600, 180, None, 30, 3, 20, 60, 6, 2);
        let rates = derive_rates("x", &c).unwrap();
        let sum = rates.single as f64
            + rates.double as f64
            + rates.triple as f64
            + rates.home_run as f64
            + rates.walk as f64
            + rates.hit_by_pitch as f64
            + rates.intentional_walk as f64;
        assert!(sum <= 1.0 + RATE_SUM_EPSILON);
    }

    #[test]
    fn transition_probs_sum_to_one() {
        let c = counts(600, 180, None, 30, 3, 20, 60, 6, 2);
        let rates = derive_rates("x", &c).unwrap();
        let (probs, clamped) = rates.as_transition_probs();
        assert!(!clamped);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn transition_probs_clamp_when_drift_pushes_out_negative() {
        let rates = EventRates {
            single: 0.4,
            double: 0.2,
            triple: 0.1,
            home_run: 0.1,
            walk: 0.1,
            hit_by_pitch: 0.05,
            intentional_walk: 0.1_0001,
        };
        let (probs, clamped) = rates.as_transition_probs();
        assert!(clamped);
        assert_eq!(probs[7], 0.0);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
}
