// Hitter data model: raw season counts, handedness, and the derived
// per-PA event rates cached alongside them. See spec §3.

use serde::{Deserialize, Serialize};

use crate::rates::EventRates;

/// Batting handedness. `Switch` hitters are a "reset" token for the
/// cyclic handedness-run accounting in the constraint compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Handedness {
    Left,
    Right,
    Switch,
}

impl Default for Handedness {
    /// A hitter with no reported handedness is treated as right-handed
    /// for run-counting purposes (see SPEC_FULL.md §3).
    fn default() -> Self {
        Handedness::Right
    }
}

/// Raw season counts for one hitter, as reported by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitterCounts {
    pub pa: u32,
    pub h: u32,
    /// Singles count as provided by the caller. May be absent/inconsistent;
    /// the rate deriver recomputes it from `h - 2b - 3b - hr` in that case.
    #[serde(rename = "1b")]
    pub singles: Option<u32>,
    #[serde(rename = "2b")]
    pub doubles: u32,
    #[serde(rename = "3b")]
    pub triples: u32,
    pub hr: u32,
    pub bb: u32,
    pub hbp: u32,
    pub ibb: u32,
}

/// One hitter, addressed by index 0..8 everywhere in C2-C4. The name ↔
/// index mapping lives only in the request surface (C5).
#[derive(Debug, Clone)]
pub struct Hitter {
    pub name: String,
    pub counts: HitterCounts,
    pub handedness: Handedness,
    pub rates: EventRates,
}
