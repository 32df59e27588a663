// Constraint Compiler (C3): translates fixed positions and handedness
// caps into a reduced search domain and a handedness predicate. See
// spec §4.3.

use std::collections::HashMap;

use crate::error::{OptimizerError, Result};
use crate::hitter::Handedness;

/// High-level constraint set as the caller expresses it: a partial
/// slot -> hitter-index map, plus two handedness caps (0 = no cap).
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    pub fixed: HashMap<usize, usize>,
    pub max_consecutive_left: u32,
    pub max_consecutive_right: u32,
}

/// Compiled, ready-to-search form of a `ConstraintSet`.
#[derive(Debug, Clone)]
pub struct CompiledConstraints {
    pub fixed: HashMap<usize, usize>,
    pub free_slots: Vec<usize>,
    pub free_hitters: Vec<usize>,
    max_left: u32,
    max_right: u32,
}

impl CompiledConstraints {
    /// Size of the reduced search domain: (9 - k)! where k is the number
    /// of fixed slots.
    pub fn domain_size(&self) -> u64 {
        factorial(self.free_slots.len() as u64)
    }

    /// Whether a full lineup (hitter indices per slot) satisfies the
    /// cyclic handedness-run caps.
    pub fn accepts(&self, lineup: &[usize; 9], handedness: &[Handedness; 9]) -> bool {
        let seq: [Handedness; 9] = std::array::from_fn(|p| handedness[lineup[p]]);
        satisfies_caps(&seq, self.max_left, self.max_right)
    }
}

fn factorial(n: u64) -> u64 {
    (1..=n).product::<u64>().max(1)
}

/// Count of free (non-fixed) hitters by handedness, used by the
/// feasibility pre-check DFS.
#[derive(Debug, Clone, Copy, Default)]
struct HandCounts {
    left: u32,
    right: u32,
    switch: u32,
}

impl HandCounts {
    fn get(&self, h: Handedness) -> u32 {
        match h {
            Handedness::Left => self.left,
            Handedness::Right => self.right,
            Handedness::Switch => self.switch,
        }
    }

    fn dec(&mut self, h: Handedness) {
        match h {
            Handedness::Left => self.left -= 1,
            Handedness::Right => self.right -= 1,
            Handedness::Switch => self.switch -= 1,
        }
    }

    fn inc(&mut self, h: Handedness) {
        match h {
            Handedness::Left => self.left += 1,
            Handedness::Right => self.right += 1,
            Handedness::Switch => self.switch += 1,
        }
    }
}

/// Cyclic handedness-run check: walks the lineup twice around the 9-slot
/// cycle, tracking the current run's handedness and length. A `Switch`
/// hitter resets both counters to zero (spec §4.3). A cap of 0 means "no
/// cap" for that side.
fn satisfies_caps(sequence: &[Handedness; 9], max_left: u32, max_right: u32) -> bool {
    let mut run_type: Option<Handedness> = None;
    let mut run_len: u32 = 0;

    for step in 0..18 {
        let h = sequence[step % 9];
        match h {
            Handedness::Switch => {
                run_type = None;
                run_len = 0;
                continue;
            }
            _ => {
                if run_type == Some(h) {
                    run_len = (run_len + 1).min(9);
                } else {
                    run_type = Some(h);
                    run_len = 1;
                }
            }
        }

        let cap = match h {
            Handedness::Left => max_left,
            Handedness::Right => max_right,
            Handedness::Switch => unreachable!(),
        };
        if cap > 0 && run_len > cap {
            return false;
        }
    }

    true
}

/// Depth-first search over the free slots, trying each remaining
/// handedness token (by type, not by individual hitter identity - only
/// the counts matter) to find at least one arrangement that satisfies the
/// caps. `fixed_handedness` holds the handedness already pinned at fixed
/// slots.
fn dfs_feasible(
    placed: &mut [Option<Handedness>; 9],
    free_slots: &[usize],
    pos: usize,
    counts: &mut HandCounts,
    max_left: u32,
    max_right: u32,
) -> bool {
    if pos == free_slots.len() {
        let full: [Handedness; 9] = std::array::from_fn(|i| placed[i].expect("all slots filled"));
        return satisfies_caps(&full, max_left, max_right);
    }

    let slot = free_slots[pos];
    for candidate in [Handedness::Left, Handedness::Right, Handedness::Switch] {
        if counts.get(candidate) == 0 {
            continue;
        }
        counts.dec(candidate);
        placed[slot] = Some(candidate);
        if dfs_feasible(placed, free_slots, pos + 1, counts, max_left, max_right) {
            counts.inc(candidate);
            return true;
        }
        counts.inc(candidate);
        placed[slot] = None;
    }
    false
}

/// Compile a constraint set against a lineup of nine hitters' handedness.
///
/// Fails with `MalformedConstraints` if a slot or hitter index is out of
/// `0..9`, or a hitter is referenced by more than one fixed slot. Fails
/// with `InfeasibleConstraints` if the feasibility pre-check finds no
/// arrangement (fixed + free) satisfying the handedness caps.
pub fn compile(
    constraints: Option<&ConstraintSet>,
    handedness: &[Handedness; 9],
) -> Result<CompiledConstraints> {
    let empty = ConstraintSet::default();
    let constraints = constraints.unwrap_or(&empty);

    for (&slot, &hitter) in &constraints.fixed {
        if slot >= 9 {
            return Err(OptimizerError::MalformedConstraints(format!(
                "fixed slot index {slot} out of range 0..9"
            )));
        }
        if hitter >= 9 {
            return Err(OptimizerError::MalformedConstraints(format!(
                "fixed hitter index {hitter} out of range 0..9"
            )));
        }
    }

    let mut seen_hitters = std::collections::HashSet::new();
    for &hitter in constraints.fixed.values() {
        if !seen_hitters.insert(hitter) {
            return Err(OptimizerError::MalformedConstraints(format!(
                "hitter index {hitter} is referenced by more than one fixed slot"
            )));
        }
    }

    let free_slots: Vec<usize> = (0..9).filter(|s| !constraints.fixed.contains_key(s)).collect();
    let fixed_hitters: std::collections::HashSet<usize> =
        constraints.fixed.values().copied().collect();
    let free_hitters: Vec<usize> = (0..9).filter(|h| !fixed_hitters.contains(h)).collect();

    let mut placed: [Option<Handedness>; 9] = [None; 9];
    for (&slot, &hitter) in &constraints.fixed {
        placed[slot] = Some(handedness[hitter]);
    }
    let mut free_counts = HandCounts::default();
    for &hitter in &free_hitters {
        free_counts.inc(handedness[hitter]);
    }

    let feasible = dfs_feasible(
        &mut placed,
        &free_slots,
        0,
        &mut free_counts,
        constraints.max_consecutive_left,
        constraints.max_consecutive_right,
    );
    if !feasible {
        return Err(OptimizerError::InfeasibleConstraints);
    }

    Ok(CompiledConstraints {
        fixed: constraints.fixed.clone(),
        free_slots,
        free_hitters,
        max_left: constraints.max_consecutive_left,
        max_right: constraints.max_consecutive_right,
    })
}
