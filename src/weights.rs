// Positional weight vector W (spec §4.4, §9). Treated as a calibration
// input to the scoring model: a fixed constant of the domain, shipped as
// data rather than derived at runtime, so scores are bitwise-reproducible
// across runs.
//
// W[p] = 1 + max(0, (9 - p) / 9 - 0.5), for slot p in 0..=8, as tabulated
// in spec.md §4.4. Early slots in the order get more plate-appearance
// trips per game than late slots, so they carry more weight.

/// Nine-element positional weight vector, indexed by batting slot 0..8.
pub const POSITIONAL_WEIGHTS: [f32; 9] = [
    1.5, // slot 0: (9-0)/9 - 0.5 = 0.5       -> 1 + 0.5
    1.388_888_9, // slot 1: (9-1)/9 - 0.5 = 0.3888...
    1.277_777_7, // slot 2
    1.166_666_7, // slot 3
    1.055_555_6, // slot 4
    1.0, // slot 5: (9-5)/9 - 0.5 = -0.0555... -> max(0, ...) = 0
    1.0, // slot 6
    1.0, // slot 7
    1.0, // slot 8
];

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(p: usize) -> f32 {
        1.0 + ((9.0 - p as f32) / 9.0 - 0.5).max(0.0)
    }

    #[test]
    fn matches_tabulated_formula() {
        for p in 0..9 {
            assert!(
                (POSITIONAL_WEIGHTS[p] - expected(p)).abs() < 1e-5,
                "slot {p}: {} != {}",
                POSITIONAL_WEIGHTS[p],
                expected(p)
            );
        }
    }

    #[test]
    fn is_request_independent_constant() {
        // W has no runtime inputs; two reads are always identical.
        let a = POSITIONAL_WEIGHTS;
        let b = POSITIONAL_WEIGHTS;
        assert_eq!(a, b);
    }
}
