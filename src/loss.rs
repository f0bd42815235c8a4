use serde::Serialize;

/// Binary-classification loss functions over the margin `z = y * haty`.
///
/// Each variant is a pure `loss`/`dloss` pair; `dloss` is the derivative
/// with respect to the prediction `haty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    Hinge,
    Square,
    Ramp,
    Logistic,
}

impl Loss {
    pub fn loss(self, y: f64, haty: f64) -> f64 {
        match self {
            Loss::Hinge => {
                let z = y * haty;
                if z > 1.0 {
                    0.0
                } else {
                    1.0 - z
                }
            }
            Loss::Square => {
                let diff = y - haty;
                0.5 * diff * diff
            }
            Loss::Ramp => {
                let z = y * haty;
                if z > 1.0 {
                    0.0
                } else if z < -1.0 {
                    2.0
                } else {
                    1.0 - z
                }
            }
            Loss::Logistic => {
                let z = y * haty;
                // ln(1 + e^-z), kept finite for large |z|
                if z < 0.0 {
                    -z + z.exp().ln_1p()
                } else {
                    (-z).exp().ln_1p()
                }
            }
        }
    }

    pub fn dloss(self, y: f64, haty: f64) -> f64 {
        match self {
            Loss::Hinge => {
                let z = y * haty;
                if z > 1.0 {
                    0.0
                } else {
                    -y
                }
            }
            Loss::Square => haty - y,
            Loss::Ramp => {
                let z = y * haty;
                if !(-1.0..=1.0).contains(&z) {
                    0.0
                } else {
                    -y
                }
            }
            Loss::Logistic => {
                let z = y * haty;
                -y / (1.0 + z.exp())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hinge_is_zero_past_the_margin() {
        assert_eq!(Loss::Hinge.loss(1.0, 2.0), 0.0);
        assert_eq!(Loss::Hinge.dloss(1.0, 2.0), 0.0);
        assert_relative_eq!(Loss::Hinge.loss(1.0, 0.5), 0.5);
        assert_eq!(Loss::Hinge.dloss(1.0, 0.5), -1.0);
        assert_eq!(Loss::Hinge.dloss(-1.0, 0.5), 1.0);
    }

    #[test]
    fn square_matches_half_squared_error() {
        assert_relative_eq!(Loss::Square.loss(1.0, -1.0), 2.0);
        assert_relative_eq!(Loss::Square.dloss(1.0, -1.0), -2.0);
        assert_eq!(Loss::Square.dloss(1.0, 1.0), 0.0);
    }

    #[test]
    fn ramp_saturates_below_minus_one() {
        assert_eq!(Loss::Ramp.loss(1.0, -5.0), 2.0);
        assert_eq!(Loss::Ramp.dloss(1.0, -5.0), 0.0);
        assert_relative_eq!(Loss::Ramp.loss(1.0, 0.0), 1.0);
        assert_eq!(Loss::Ramp.dloss(1.0, 0.0), -1.0);
    }

    #[test]
    fn logistic_gradient_matches_finite_difference() {
        const EPS: f64 = 1e-6;
        for &(y, haty) in &[(1.0, 0.3), (-1.0, 2.0), (1.0, -4.0)] {
            let num =
                (Loss::Logistic.loss(y, haty + EPS) - Loss::Logistic.loss(y, haty - EPS)) / (2.0 * EPS);
            assert_relative_eq!(Loss::Logistic.dloss(y, haty), num, max_relative = 1e-4);
        }
    }

    #[test]
    fn logistic_stays_finite_for_large_margins() {
        assert!(Loss::Logistic.loss(1.0, 1e4).is_finite());
        assert!(Loss::Logistic.loss(1.0, -1e4).is_finite());
        assert_relative_eq!(Loss::Logistic.dloss(1.0, -1e4), -1.0);
    }
}
