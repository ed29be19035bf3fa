//! Weight calculation and one-rep-max formulas.

/// Fraction of a one-rep max used as the training max.
pub const TRAINING_MAX_FRACTION: f64 = 0.9;

/// Calculates the prescribed weight for a percentage of the training max,
/// rounded to the nearest increment.
///
/// Returns 0 when the training max or the percentage is missing (zero,
/// negative or not finite), so a malformed profile still produces a workout.
/// A non-positive increment leaves the weight unrounded.
///
/// # Arguments
/// * `training_max` - Working max the percentages are taken from
/// * `percent` - Fraction of the training max (0.85 for 85%)
/// * `increment` - Rounding increment (5 lbs, 2.5 kg, ...)
pub fn calculate_weight(training_max: f64, percent: f64, increment: f64) -> f64 {
    if !is_present(training_max) || !is_present(percent) {
        return 0.0;
    }

    let raw = training_max * percent;
    if !is_present(increment) {
        return raw;
    }

    (raw / increment).round() * increment
}

/// Estimates a one-rep max with the Epley formula, rounded to the nearest
/// whole number.
///
/// Epley: w × (1 + r/30)
///
/// Returns 0 for a non-positive weight or zero reps.
pub fn estimate_one_rep_max(weight: f64, reps: u32) -> f64 {
    if !is_present(weight) || reps == 0 {
        return 0.0;
    }

    (weight * (1.0 + f64::from(reps) / 30.0)).round()
}

/// Seeds a training max from a known one-rep max.
pub fn training_max_from_one_rep_max(one_rep_max: f64, increment: f64) -> f64 {
    calculate_weight(one_rep_max, TRAINING_MAX_FRACTION, increment)
}

/// Seeds a training max from a rep test ("I can do `reps` at `weight`").
pub fn training_max_from_rep_test(weight: f64, reps: u32, increment: f64) -> f64 {
    training_max_from_one_rep_max(estimate_one_rep_max(weight, reps), increment)
}

/// Knocks a training max back by 10%, the manual reset after a stalled cycle.
pub fn deload_training_max(training_max: f64, increment: f64) -> f64 {
    calculate_weight(training_max, TRAINING_MAX_FRACTION, increment)
}

fn is_present(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_weight_rounds_to_increment() {
        assert_eq!(calculate_weight(300.0, 0.5, 5.0), 150.0);
        assert_eq!(calculate_weight(300.0, 0.65, 5.0), 195.0);
        // 210 × 0.85 = 178.5 -> 180
        assert_eq!(calculate_weight(210.0, 0.85, 5.0), 180.0);
        // 100 × 0.65 = 65 on a 2.5 grid
        assert_eq!(calculate_weight(100.0, 0.65, 2.5), 65.0);
    }

    #[test]
    fn test_calculate_weight_zero_guard() {
        assert_eq!(calculate_weight(0.0, 0.85, 5.0), 0.0);
        assert_eq!(calculate_weight(300.0, 0.0, 5.0), 0.0);
        assert_eq!(calculate_weight(f64::NAN, 0.85, 5.0), 0.0);
        assert_eq!(calculate_weight(-100.0, 0.85, 5.0), 0.0);
    }

    #[test]
    fn test_calculate_weight_without_increment() {
        assert_eq!(calculate_weight(200.0, 0.5, 0.0), 100.0);
    }

    #[test]
    fn test_calculate_weight_is_multiple_of_increment() {
        let increments = [1.0, 2.5, 5.0, 10.0];
        for tm in (0..=600).step_by(7) {
            for pct in (0..=100).step_by(5) {
                for inc in increments {
                    let w = calculate_weight(tm as f64, pct as f64 / 100.0, inc);
                    let steps = w / inc;
                    assert_eq!(steps, steps.round(), "tm={tm} pct={pct} inc={inc}");
                }
            }
        }
    }

    #[test]
    fn test_epley_five_reps() {
        // 225 × (1 + 5/30) = 262.5 -> 263
        assert_eq!(estimate_one_rep_max(225.0, 5), 263.0);
    }

    #[test]
    fn test_epley_single_rep() {
        // 1 rep still carries the 1/30 bump
        assert_eq!(estimate_one_rep_max(300.0, 1), 310.0);
    }

    #[test]
    fn test_epley_degenerate_inputs() {
        assert_eq!(estimate_one_rep_max(0.0, 5), 0.0);
        assert_eq!(estimate_one_rep_max(-10.0, 5), 0.0);
        assert_eq!(estimate_one_rep_max(200.0, 0), 0.0);
    }

    #[test]
    fn test_training_max_seeding() {
        assert_eq!(training_max_from_one_rep_max(300.0, 5.0), 270.0);
        // 225x5 -> 263 -> 236.7 -> 235
        assert_eq!(training_max_from_rep_test(225.0, 5, 5.0), 235.0);
    }

    #[test]
    fn test_deload_training_max() {
        assert_eq!(deload_training_max(300.0, 5.0), 270.0);
        assert_eq!(deload_training_max(0.0, 5.0), 0.0);
    }
}
