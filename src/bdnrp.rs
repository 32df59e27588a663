// BDNRP Engine (C2): for every ordered quadruple of distinct hitters,
// derives the expected runs the fourth hitter contributes given the
// preceding three batted, via a closed-form half-inning Markov model.
// See spec §4.2.
//
// The state space is base-occupancy (8 configurations) x outs (0, 1, 2),
// plus an absorbing terminal state for "3 outs, inning over". The
// baserunner advancement policy and event ordering below are the
// contract: reimplementers must match them bit-for-bit (see DESIGN.md).

use tracing::warn;

use crate::error::{OptimizerError, Result};
use crate::hitter::Hitter;
use crate::rates::EventRates;

const N_BASE_CONFIGS: usize = 8;
const N_OUTS: usize = 3;
const N_STATES: usize = N_BASE_CONFIGS * N_OUTS + 1;
const TERMINAL: usize = N_STATES - 1;

const ON_1B: u8 = 0b001;
const ON_2B: u8 = 0b010;
const ON_3B: u8 = 0b100;

#[inline]
fn state_index(bases: u8, outs: u8) -> usize {
    bases as usize * N_OUTS + outs as usize
}

/// Deterministic baserunner advancement for one of the seven non-out
/// plate-appearance events. Returns `(new_base_config, runs_scored)`.
///
/// This is the one specific convention spec.md's baserunner-advancement
/// Open Question commits to (see DESIGN.md): on a single, runners on 2B
/// and 3B score and a runner on 1B takes 2nd; on a double, all runners
/// score except a runner on 1B, who takes 3rd; triples and home runs
/// score every runner; walks/HBP/IBB force advance only.
fn advance_bases(bases: u8, event_index: usize) -> (u8, u8) {
    let on1 = bases & ON_1B != 0;
    let on2 = bases & ON_2B != 0;
    let on3 = bases & ON_3B != 0;

    match event_index {
        // Single: batter to 1st, runner on 1st to 2nd, runners on 2nd/3rd score.
        0 => {
            let runs = on2 as u8 + on3 as u8;
            let new_bases = ON_1B | if on1 { ON_2B } else { 0 };
            (new_bases, runs)
        }
        // Double: batter to 2nd, runner on 1st to 3rd, runners on 2nd/3rd score.
        1 => {
            let runs = on2 as u8 + on3 as u8;
            let new_bases = ON_2B | if on1 { ON_3B } else { 0 };
            (new_bases, runs)
        }
        // Triple: batter to 3rd, every runner scores.
        2 => {
            let runs = on1 as u8 + on2 as u8 + on3 as u8;
            (ON_3B, runs)
        }
        // Home run: batter and every runner score.
        3 => {
            let runs = 1 + on1 as u8 + on2 as u8 + on3 as u8;
            (0, runs)
        }
        // Walk / HBP / IBB: forced advance only.
        4 | 5 | 6 => {
            if on1 {
                if on2 {
                    let runs = on3 as u8;
                    (ON_1B | ON_2B | ON_3B, runs)
                } else {
                    let new_bases = ON_1B | ON_2B | if on3 { ON_3B } else { 0 };
                    (new_bases, 0)
                }
            } else {
                let new_bases = ON_1B | if on2 { ON_2B } else { 0 } | if on3 { ON_3B } else { 0 };
                (new_bases, 0)
            }
        }
        _ => unreachable!("event index out of range"),
    }
}

/// Apply one plate appearance to a half-inning state distribution.
///
/// `probs` is the eight-way event distribution `[1B, 2B, 3B, HR, BB, HBP,
/// IBB, OUT]` from `EventRates::as_transition_probs`. Returns the updated
/// distribution and the expected runs scored during this plate appearance.
/// Iteration order (bases, then outs, then event index 0..=7) is fixed so
/// that the float32 summation order - and therefore the result - is the
/// same on every run and thread count.
fn apply_plate_appearance(dist: &[f32; N_STATES], probs: &[f32; 8]) -> ([f32; N_STATES], f32) {
    let mut new_dist = [0.0f32; N_STATES];
    let mut runs = 0.0f32;

    for bases in 0u8..N_BASE_CONFIGS as u8 {
        for outs in 0u8..N_OUTS as u8 {
            let w = dist[state_index(bases, outs)];
            if w == 0.0 {
                continue;
            }
            for (event_index, &p) in probs.iter().enumerate() {
                if p == 0.0 {
                    continue;
                }
                if event_index == 7 {
                    let new_outs = outs + 1;
                    let target = if new_outs == 3 {
                        TERMINAL
                    } else {
                        state_index(bases, new_outs)
                    };
                    new_dist[target] += w * p;
                } else {
                    let (new_bases, event_runs) = advance_bases(bases, event_index);
                    new_dist[state_index(new_bases, outs)] += w * p;
                    runs += w * p * event_runs as f32;
                }
            }
        }
    }

    // A half-inning already over stays over; no further runs accrue.
    new_dist[TERMINAL] += dist[TERMINAL];

    (new_dist, runs)
}

fn initial_distribution() -> [f32; N_STATES] {
    let mut dist = [0.0f32; N_STATES];
    dist[state_index(0, 0)] = 1.0;
    dist
}

/// BDNRP(i, j, k, l): expected runs contributed by the hitter batting
/// fourth, given the three preceding hitters' transition probabilities.
fn bdnrp_value(
    probs_i: &[f32; 8],
    probs_j: &[f32; 8],
    probs_k: &[f32; 8],
    probs_l: &[f32; 8],
) -> f32 {
    let dist = initial_distribution();
    let (dist, _) = apply_plate_appearance(&dist, probs_i);
    let (dist, _) = apply_plate_appearance(&dist, probs_j);
    let (dist, _) = apply_plate_appearance(&dist, probs_k);
    let (_, runs) = apply_plate_appearance(&dist, probs_l);
    runs
}

/// Dense 9x9x9x9 BDNRP tensor. Entries with a repeated axis index are zero
/// by convention; the dense layout is kept (instead of exploiting that
/// sparsity) because lookup is already O(1) and a sparse layout would only
/// complicate the hot path (spec §9).
#[derive(Debug, Clone)]
pub struct BdnrpTensor {
    data: Vec<f32>,
}

impl BdnrpTensor {
    #[inline]
    fn flat_index(i: usize, j: usize, k: usize, l: usize) -> usize {
        ((i * 9 + j) * 9 + k) * 9 + l
    }

    /// Look up `T[i, j, k, l]`. Returns 0.0 whenever the indices are not
    /// pairwise distinct, regardless of what is stored at that slot.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f32 {
        if i == j || i == k || i == l || j == k || j == l || k == l {
            return 0.0;
        }
        self.data[Self::flat_index(i, j, k, l)]
    }
}

/// Build the BDNRP tensor for exactly nine hitters (indices 0..8, in
/// request order). Enumerates the 9*8*7*6 = 3,024 distinct ordered
/// quadruples; diagonal-adjacent entries are left at 0.0.
///
/// Returns `NumericInstability` only if a hitter's transition-probability
/// renormalization is itself unrecoverable (the renormalization divisor is
/// non-positive) - in every other case the clamp-and-renormalize recovery
/// described in spec §4.2/§7 is applied silently and reported via the
/// returned `bool` (true if any hitter needed it), so the caller can log
/// the single per-request warning.
pub fn build_tensor(hitters: &[Hitter]) -> Result<(BdnrpTensor, bool)> {
    debug_assert_eq!(hitters.len(), 9);

    let mut probs: Vec<[f32; 8]> = Vec::with_capacity(9);
    let mut any_clamped = false;
    for h in hitters {
        let (p, clamped) = h.rates.as_transition_probs();
        let sum: f32 = p.iter().sum();
        if !(0.99..=1.01).contains(&sum) {
            return Err(OptimizerError::NumericInstability(format!(
                "hitter `{}` has an unrecoverable event-probability distribution (sum = {sum})",
                h.name
            )));
        }
        any_clamped |= clamped;
        probs.push(p);
    }

    if any_clamped {
        warn!("BDNRP engine clamped and renormalized a hitter's event probabilities due to floating-point drift");
    }

    let mut data = vec![0.0f32; 9 * 9 * 9 * 9];
    for i in 0..9 {
        for j in 0..9 {
            if j == i {
                continue;
            }
            for k in 0..9 {
                if k == i || k == j {
                    continue;
                }
                for l in 0..9 {
                    if l == i || l == j || l == k {
                        continue;
                    }
                    let value = bdnrp_value(&probs[i], &probs[j], &probs[k], &probs[l]);
                    data[BdnrpTensor::flat_index(i, j, k, l)] = value;
                }
            }
        }
    }

    Ok((BdnrpTensor { data }, any_clamped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitter::{Handedness, HitterCounts};

    fn make_hitter(name: &str, rates: EventRates) -> Hitter {
        Hitter {
            name: name.to_string(),
            counts: HitterCounts {
                pa: 600,
                h: 150,
                singles: Some(100),
                doubles: 30,
                triples: 3,
                hr: 17,
                bb: 60,
                hbp: 6,
                ibb: 2,
            },
            handedness: Handedness::Right,
            rates,
        }
    }

    fn average_rates() -> EventRates {
        EventRates {
            single: 0.150,
            double: 0.050,
            triple: 0.005,
            home_run: 0.030,
            walk: 0.080,
            hit_by_pitch: 0.010,
            intentional_walk: 0.003,
        }
    }

    #[test]
    fn diagonal_entries_are_zero() {
        let hitters: Vec<Hitter> = (0..9)
            .map(|i| make_hitter(&format!("h{i}"), average_rates()))
            .collect();
        let (tensor, _) = build_tensor(&hitters).unwrap();
        assert_eq!(tensor.get(0, 0, 1, 2), 0.0);
        assert_eq!(tensor.get(0, 1, 0, 2), 0.0);
        assert_eq!(tensor.get(0, 1, 2, 0), 0.0);
        assert_eq!(tensor.get(0, 1, 2, 1), 0.0);
    }

    #[test]
    fn distinct_quadruple_is_nonzero_for_productive_hitters() {
        let hitters: Vec<Hitter> = (0..9)
            .map(|i| make_hitter(&format!("h{i}"), average_rates()))
            .collect();
        let (tensor, _) = build_tensor(&hitters).unwrap();
        assert!(tensor.get(0, 1, 2, 3) > 0.0);
    }

    #[test]
    fn single_advances_runner_from_second_and_third_home() {
        // bases loaded (1,2,3), single should score the runners on 2nd/3rd
        // and send the runner from 1st to 2nd.
        let (new_bases, runs) = advance_bases(ON_1B | ON_2B | ON_3B, 0);
        assert_eq!(runs, 2);
        assert_eq!(new_bases, ON_1B | ON_2B);
    }

    #[test]
    fn home_run_clears_bases_and_scores_everyone() {
        let (new_bases, runs) = advance_bases(ON_1B | ON_2B | ON_3B, 3);
        assert_eq!(runs, 4);
        assert_eq!(new_bases, 0);
    }

    #[test]
    fn walk_with_bases_loaded_forces_in_a_run() {
        let (new_bases, runs) = advance_bases(ON_1B | ON_2B | ON_3B, 4);
        assert_eq!(runs, 1);
        assert_eq!(new_bases, ON_1B | ON_2B | ON_3B);
    }

    #[test]
    fn walk_with_runner_on_first_only_forces_to_second() {
        let (new_bases, runs) = advance_bases(ON_1B, 4);
        assert_eq!(runs, 0);
        assert_eq!(new_bases, ON_1B | ON_2B);
    }

    #[test]
    fn walk_with_no_runner_on_first_does_not_force_anyone() {
        let (new_bases, runs) = advance_bases(ON_2B | ON_3B, 4);
        assert_eq!(runs, 0);
        assert_eq!(new_bases, ON_1B | ON_2B | ON_3B);
    }

    #[test]
    fn plate_appearance_distribution_sums_to_one() {
        let dist = initial_distribution();
        let probs = average_rates().as_transition_probs().0;
        let (new_dist, _) = apply_plate_appearance(&dist, &probs);
        let sum: f32 = new_dist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn identical_hitters_give_identical_tensor_entries_for_any_quadruple() {
        let hitters: Vec<Hitter> = (0..9)
            .map(|i| make_hitter(&format!("h{i}"), average_rates()))
            .collect();
        let (tensor, clamped) = build_tensor(&hitters).unwrap();
        assert!(!clamped);
        let v1 = tensor.get(0, 1, 2, 3);
        let v2 = tensor.get(4, 5, 6, 7);
        assert_eq!(v1, v2);
    }
}
