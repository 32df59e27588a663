// Search Engine (C4): enumerates the reduced permutation space, scores
// each candidate against the BDNRP tensor, and returns the top-N lineups
// by score. Parallel over permutations via rayon. See spec §4.4, §5.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use rayon::prelude::*;

use crate::bdnrp::BdnrpTensor;
use crate::constraints::CompiledConstraints;
use crate::error::{OptimizerError, Result};
use crate::hitter::Handedness;
use crate::lineup::{Lineup, ScoredLineup};
use crate::weights::POSITIONAL_WEIGHTS;

/// Permutations are visited in batches of this size; the shared
/// cancellation flag and deadline are only checked between batches
/// (spec §5).
pub const BATCH_SIZE: u64 = 4096;

pub const DEFAULT_TOP_N: usize = 5;
pub const MIN_TOP_N: usize = 1;
pub const MAX_TOP_N: usize = 100;

/// Worst-case wall-clock cap on a single search, regardless of the
/// caller's requested deadline (spec §5).
pub const HARD_WALL_CLOCK_CAP_MS: u64 = 30_000;

pub fn clamp_top_n(n: usize) -> usize {
    n.clamp(MIN_TOP_N, MAX_TOP_N)
}

fn factorial(n: u64) -> u64 {
    (1..=n).product::<u64>().max(1)
}

/// The `rank`-th permutation (0-indexed, lexicographic order) of `elems`,
/// computed directly via the factorial number system rather than
/// generated by iterating every earlier permutation. `elems` is assumed
/// sorted ascending.
fn permutation_at(rank: u64, elems: &[usize]) -> Vec<usize> {
    let mut available: Vec<usize> = elems.to_vec();
    let n = available.len();
    let mut result = Vec::with_capacity(n);
    let mut r = rank;
    for i in (1..=n).rev() {
        let f = factorial((i - 1) as u64);
        let idx = (r / f) as usize;
        r %= f;
        result.push(available.remove(idx));
    }
    result
}

fn assemble_lineup(compiled: &CompiledConstraints, free_perm: &[usize]) -> Lineup {
    let mut lineup: Lineup = [0; 9];
    for (&slot, &hitter) in &compiled.fixed {
        lineup[slot] = hitter;
    }
    for (i, &slot) in compiled.free_slots.iter().enumerate() {
        lineup[slot] = free_perm[i];
    }
    lineup
}

/// `score(L) = sum over slots p of W[p] * T[L[(p-3)%9], L[(p-2)%9], L[(p-1)%9], L[p]]`,
/// accumulated in fixed slot order 0..8 so the float32 sum is
/// bitwise-reproducible regardless of visitation order (spec §5).
fn score_lineup(tensor: &BdnrpTensor, lineup: &Lineup) -> f32 {
    let mut total = 0.0f32;
    for p in 0..9 {
        let i = lineup[(p + 6) % 9];
        let j = lineup[(p + 7) % 9];
        let k = lineup[(p + 8) % 9];
        let l = lineup[p];
        total += POSITIONAL_WEIGHTS[p] * tensor.get(i, j, k, l);
    }
    total
}

fn push_bounded(heap: &mut BinaryHeap<Reverse<ScoredLineup>>, candidate: ScoredLineup, cap: usize) {
    if heap.len() < cap {
        heap.push(Reverse(candidate));
        return;
    }
    if let Some(Reverse(worst)) = heap.peek() {
        if candidate > *worst {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }
}

struct Deadline {
    start: Instant,
    limit_ms: u64,
}

impl Deadline {
    fn new(requested_ms: Option<u64>) -> Self {
        let limit_ms = requested_ms
            .map(|ms| ms.min(HARD_WALL_CLOCK_CAP_MS))
            .unwrap_or(HARD_WALL_CLOCK_CAP_MS);
        Deadline {
            start: Instant::now(),
            limit_ms,
        }
    }

    fn expired(&self) -> bool {
        self.start.elapsed().as_millis() as u64 >= self.limit_ms
    }
}

/// Exhaustively search the reduced permutation domain and return the
/// top-N lineups, descending by score, ties broken by lexicographic
/// lineup-index order (spec §4.4).
///
/// `deadline_ms` is the caller's optional deadline; it is clamped to
/// `HARD_WALL_CLOCK_CAP_MS` regardless. Workers cooperatively check a
/// shared atomic cancellation flag every `BATCH_SIZE` candidates; on
/// cancellation, `Cancelled` is returned with no partial results.
pub fn search(
    tensor: &BdnrpTensor,
    handedness: &[Handedness; 9],
    compiled: &CompiledConstraints,
    top_n: usize,
    deadline_ms: Option<u64>,
) -> Result<Vec<ScoredLineup>> {
    search_with_batch_size(tensor, handedness, compiled, top_n, deadline_ms, BATCH_SIZE)
}

/// Like [`search`], but with the cancellation-check batch size overridable
/// (spec §5's "~4,096" is a default, not a hard constant).
pub fn search_with_batch_size(
    tensor: &BdnrpTensor,
    handedness: &[Handedness; 9],
    compiled: &CompiledConstraints,
    top_n: usize,
    deadline_ms: Option<u64>,
    batch_size: u64,
) -> Result<Vec<ScoredLineup>> {
    let batch_size = batch_size.max(1);
    let top_n = clamp_top_n(top_n);
    let domain_size = compiled.domain_size();
    let n_batches = domain_size.div_ceil(batch_size).max(1);

    let cancelled = AtomicBool::new(false);
    let deadline = Deadline::new(deadline_ms);

    let folded: std::result::Result<BinaryHeap<Reverse<ScoredLineup>>, ()> = (0..n_batches)
        .into_par_iter()
        .try_fold(BinaryHeap::new, |mut heap, batch_idx| {
            if cancelled.load(AtomicOrdering::Relaxed) || deadline.expired() {
                cancelled.store(true, AtomicOrdering::Relaxed);
                return Err(());
            }
            let start = batch_idx * batch_size;
            let end = ((batch_idx + 1) * batch_size).min(domain_size);
            for rank in start..end {
                let free_perm = permutation_at(rank, &compiled.free_hitters);
                let lineup = assemble_lineup(compiled, &free_perm);
                if !compiled.accepts(&lineup, handedness) {
                    continue;
                }
                let score = score_lineup(tensor, &lineup);
                push_bounded(&mut heap, ScoredLineup { lineup, score }, top_n);
            }
            Ok(heap)
        })
        .try_reduce(BinaryHeap::new, |mut a, b| {
            if cancelled.load(AtomicOrdering::Relaxed) {
                return Err(());
            }
            for Reverse(entry) in b {
                push_bounded(&mut a, entry, top_n);
            }
            Ok(a)
        });

    let heap = folded.map_err(|()| OptimizerError::Cancelled)?;
    let mut lineups: Vec<ScoredLineup> = heap.into_iter().map(|Reverse(s)| s).collect();
    lineups.sort_by(|a, b| b.cmp(a));

    if lineups.is_empty() {
        return Err(OptimizerError::NoFeasibleLineup);
    }
    Ok(lineups)
}
