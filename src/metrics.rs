/// Fraction of positions where `actual` and `predicted` agree.
///
/// # Panics
/// If the slices differ in length or are empty.
pub fn accuracy(actual: &[f64], predicted: &[f64]) -> f64 {
    assert_eq!(actual.len(), predicted.len(), "prediction length mismatch");
    assert!(!actual.is_empty(), "no predictions to score");
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    correct as f64 / actual.len() as f64
}

/// The l2 norm of a weight slice.
pub fn l2_norm(w: &[f64]) -> f64 {
    w.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// The l-infinity norm of a weight slice.
pub fn inf_norm(w: &[f64]) -> f64 {
    w.iter().map(|x| x.abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn accuracy_counts_agreements() {
        let actual = [1.0, -1.0, 1.0, -1.0];
        let predicted = [1.0, 1.0, 1.0, -1.0];
        assert_relative_eq!(accuracy(&actual, &predicted), 0.75);
    }

    #[test]
    #[should_panic(expected = "prediction length mismatch")]
    fn length_mismatch_is_fatal() {
        accuracy(&[1.0], &[1.0, -1.0]);
    }

    #[test]
    fn norms() {
        assert_relative_eq!(l2_norm(&[3.0, 4.0]), 5.0);
        assert_relative_eq!(inf_norm(&[-3.0, 2.0]), 3.0);
        assert_relative_eq!(l2_norm(&[]), 0.0);
    }
}
