// Request Surface (C5): the wire-format request/response types and the
// orchestration of C1 -> C2 -> C3 -> C4. See spec §4.5, §6.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bdnrp::build_tensor;
use crate::config::Config;
use crate::constraints::{self, ConstraintSet};
use crate::error::{OptimizerError, Result};
use crate::hitter::{Handedness, Hitter, HitterCounts};
use crate::rates::derive_rates;
use crate::search::{self, DEFAULT_TOP_N};

/// One entry in the request's `players` map. `data: null` (an absent
/// `data` field) is rejected at orchestration time, not here, so the
/// specific offending slot can be named in the error.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub data: Option<HitterCounts>,
    #[serde(default)]
    pub handedness: Option<Handedness>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstraintsInput {
    #[serde(default)]
    pub fixed: HashMap<String, String>,
    #[serde(default)]
    pub max_consecutive_left: u32,
    #[serde(default)]
    pub max_consecutive_right: u32,
}

/// Request slots are keyed `"0"`..`"8"` (0-based; see SPEC_FULL.md §3).
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationRequest {
    pub players: HashMap<String, PlayerEntry>,
    #[serde(default)]
    pub constraints: Option<ConstraintsInput>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineupResponse {
    pub order: [String; 9],
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResponse {
    pub expected_runs: f32,
    pub lineups: Vec<LineupResponse>,
}

/// Resolve the dense, index-addressed hitter array from the request's
/// string-keyed slot map (spec §9: dynamic shapes are converted once, at
/// the boundary). Returns the hitters in slot order plus a name -> index
/// map for resolving constraint references.
fn resolve_hitters(request: &OptimizationRequest) -> Result<(Vec<Hitter>, HashMap<String, usize>)> {
    if request.players.len() != 9 {
        return Err(OptimizerError::MalformedRequest(format!(
            "expected exactly 9 players, got {}",
            request.players.len()
        )));
    }

    let mut hitters: Vec<Hitter> = Vec::with_capacity(9);
    let mut name_to_index = HashMap::with_capacity(9);

    for slot in 0..9 {
        let key = slot.to_string();
        let entry = request.players.get(&key).ok_or_else(|| {
            OptimizerError::MalformedRequest(format!("missing player slot \"{key}\""))
        })?;
        let counts = entry.data.as_ref().ok_or_else(|| {
            OptimizerError::MalformedRequest(format!(
                "player slot \"{key}\" (`{}`) has no stats (data: null)",
                entry.name
            ))
        })?;
        let rates = derive_rates(&entry.name, counts)?;
        let hitter = Hitter {
            name: entry.name.clone(),
            counts: *counts,
            handedness: entry.handedness.unwrap_or_default(),
            rates,
        };
        if name_to_index.insert(hitter.name.clone(), slot).is_some() {
            return Err(OptimizerError::MalformedRequest(format!(
                "duplicate hitter name `{}`",
                hitter.name
            )));
        }
        hitters.push(hitter);
    }

    Ok((hitters, name_to_index))
}

fn resolve_constraints(
    input: &ConstraintsInput,
    name_to_index: &HashMap<String, usize>,
) -> Result<ConstraintSet> {
    let mut fixed = HashMap::with_capacity(input.fixed.len());
    for (slot_str, hitter_name) in &input.fixed {
        let slot: usize = slot_str.parse().map_err(|_| {
            OptimizerError::MalformedConstraints(format!(
                "fixed slot key `{slot_str}` is not an integer"
            ))
        })?;
        let hitter_index = *name_to_index.get(hitter_name).ok_or_else(|| {
            OptimizerError::MalformedConstraints(format!(
                "fixed constraint references unknown hitter `{hitter_name}`"
            ))
        })?;
        fixed.insert(slot, hitter_index);
    }
    Ok(ConstraintSet {
        fixed,
        max_consecutive_left: input.max_consecutive_left,
        max_consecutive_right: input.max_consecutive_right,
    })
}

/// Run the full pipeline with the default ambient configuration. See
/// `optimize_with_config` for the version that honors `optimizer.toml`.
pub fn optimize(request: OptimizationRequest) -> Result<OptimizationResponse> {
    optimize_with_config(request, &Config::default())
}

/// Run the full pipeline: validate the request, derive rates (C1), build
/// the BDNRP tensor (C2), compile constraints (C3), search (C4), and
/// assemble the response. `config` supplies the operational tunables
/// (cancellation batch size, wall-clock cap) that bound every search
/// regardless of what the request itself asks for.
pub fn optimize_with_config(
    request: OptimizationRequest,
    config: &Config,
) -> Result<OptimizationResponse> {
    let (hitters, name_to_index) = resolve_hitters(&request)?;
    let handedness: [Handedness; 9] = std::array::from_fn(|i| hitters[i].handedness);

    let constraint_set = request
        .constraints
        .as_ref()
        .map(|c| resolve_constraints(c, &name_to_index))
        .transpose()?;

    let (tensor, _clamped) = build_tensor(&hitters)?;
    let compiled = constraints::compile(constraint_set.as_ref(), &handedness)?;

    let top_n = request.top_n.unwrap_or(DEFAULT_TOP_N);
    let deadline_ms = Some(
        request
            .deadline_ms
            .map_or(config.wall_clock_cap_ms, |ms| ms.min(config.wall_clock_cap_ms)),
    );
    // A fully-fixed lineup (domain size 1) still flows through `search`:
    // the single candidate is scored directly with no enumeration
    // overhead, which is functionally the same as C3 bypassing C4.
    let scored = search::search_with_batch_size(
        &tensor,
        &handedness,
        &compiled,
        top_n,
        deadline_ms,
        config.cancellation_batch_size,
    )?;

    let lineups: Vec<LineupResponse> = scored
        .into_iter()
        .map(|s| LineupResponse {
            order: std::array::from_fn(|i| hitters[s.lineup[i]].name.clone()),
            score: s.score,
        })
        .collect();

    let expected_runs = lineups[0].score;
    Ok(OptimizationResponse {
        expected_runs,
        lineups,
    })
}
