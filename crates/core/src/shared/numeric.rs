//! Numeric helpers shared by classifier postprocessing and report assembly.

/// Numerically stable softmax: the maximum logit is subtracted before
/// exponentiation so large inputs cannot overflow.
///
/// Returns an empty vector for empty input.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest element. Ties resolve to the first index.
///
/// Returns `None` for empty input or when any value is NaN.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}

/// Clamps a score into `[0, 1]`.
pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Rounds to three decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::small(vec![1.0, 2.0, 3.0])]
    #[case::negative(vec![-4.0, -1.5, -9.0, 0.0])]
    #[case::large(vec![1000.0, 999.0, 1001.0])]
    #[case::uniform(vec![0.5; 8])]
    fn test_softmax_sums_to_one(#[case] logits: Vec<f32>) {
        let probs = softmax(&logits);
        assert_eq!(probs.len(), logits.len());
        assert_relative_eq!(probs.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        assert!(probs.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let logits = [0.3, -1.2, 2.5, 0.0, 1.1, -0.7, 0.9, 0.2];
        let shifted: Vec<f32> = logits.iter().map(|x| x + 42.0).collect();
        let a = softmax(&logits);
        let b = softmax(&shifted);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softmax_preserves_order() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!(probs[2] > probs[1]);
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_ties_resolve_to_first() {
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    }

    #[test]
    fn test_argmax_rejects_empty_and_nan() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.2, f32::NAN]), None);
    }

    #[rstest]
    #[case(-0.5, 0.0)]
    #[case(0.25, 0.25)]
    #[case(1.5, 1.0)]
    fn test_clamp_unit(#[case] input: f32, #[case] expected: f32) {
        assert_relative_eq!(clamp_unit(input), expected);
    }

    #[test]
    fn test_round3() {
        assert_relative_eq!(round3(0.123456), 0.123);
        assert_relative_eq!(round3(0.9996), 1.0);
        assert_relative_eq!(round3(0.0), 0.0);
    }
}
