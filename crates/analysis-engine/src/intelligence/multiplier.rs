//! Sign-aware evaluation multipliers

/// Share of a multiplier's effect kept in critical positions
pub const CRITICAL_DAMPING: f64 = 0.3;

/// Scale `eval` by `multiplier`.
///
/// Positive evaluations are multiplied and negative ones divided, so a
/// multiplier above 1.0 always favours the move. In critical positions the
/// change is cut to [`CRITICAL_DAMPING`] of what it would otherwise be.
pub fn apply_multiplier(eval: f64, multiplier: f64, critical: bool) -> f64 {
    if multiplier == 1.0 || eval == 0.0 || multiplier <= 0.0 {
        return eval;
    }

    let factor = if eval > 0.0 {
        multiplier
    } else {
        1.0 / multiplier
    };

    let factor = if critical {
        1.0 + (factor - 1.0) * CRITICAL_DAMPING
    } else {
        factor
    };

    eval * factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_neutral_inputs_are_noops() {
        assert_eq!(apply_multiplier(0.8, 1.0, false), 0.8);
        assert_eq!(apply_multiplier(0.0, 2.0, false), 0.0);
    }

    #[test]
    fn test_negative_evals_move_toward_zero() {
        assert!((apply_multiplier(-1.0, 2.0, false) - -0.5).abs() < EPS);
        assert!((apply_multiplier(1.0, 2.0, false) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_inverse_multiplier_restores_eval() {
        for eval in [1.7, -0.9, 3.25, -4.0] {
            for m in [0.5, 1.3, 2.0] {
                let there = apply_multiplier(eval, m, false);
                let back = apply_multiplier(there, 1.0 / m, false);
                assert!((back - eval).abs() < EPS, "{eval} via {m}");
            }
        }
    }

    #[test]
    fn test_critical_deviation_is_damped() {
        for eval in [1.5, -1.5] {
            for m in [0.5, 1.5, 3.0] {
                let normal = apply_multiplier(eval, m, false) - eval;
                let critical = apply_multiplier(eval, m, true) - eval;
                assert!(critical.abs() <= normal.abs() * CRITICAL_DAMPING + EPS);
                assert_eq!(critical.signum(), normal.signum());
            }
        }
    }
}
