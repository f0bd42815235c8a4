mod kernel;

pub use kernel::{KernelModel, RbfKernel};

use rayon::prelude::*;
use serde_json::json;

use crate::dataset::Dataset;
use crate::loss::Loss;

fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// A regularized linear predictor: weights, a loss, and the feature
/// transform under which the weights live.
///
/// Risk, gradient, and prediction are provided over any [`Dataset`]; they
/// transform the rows first, so a kernelized model scores raw inputs
/// transparently. Row loops fan out over rayon and reduce serially.
pub trait Model: Send + Sync {
    fn lambda(&self) -> f64;

    fn loss(&self) -> Loss;

    fn weights(&self) -> &[f64];

    fn set_weights(&mut self, w: Vec<f64>);

    /// Lifts a dataset into this model's feature space. Identity for the
    /// plain linear model.
    fn transform(&self, d: &Dataset) -> Dataset;

    /// Model parameters for the run report.
    fn config(&self) -> serde_json::Value;

    /// `F(w) = (1/n) sum loss(y_i, <w, x_i>) + (lambda/2) ||w||^2`.
    fn empirical_risk(&self, d: &Dataset) -> f64 {
        let t = self.transform(d);
        let w = self.weights();
        let loss = self.loss();
        let n = t.len();

        let sum_loss: f64 = (0..n)
            .into_par_iter()
            .map(|i| loss.loss(t.label(i), t.x_at(i).dot_slice(w)))
            .sum();

        let sq_norm: f64 = w.iter().map(|x| x * x).sum();
        sum_loss / n as f64 + self.lambda() / 2.0 * sq_norm
    }

    /// Full gradient of the empirical risk at the current weights.
    fn grad_empirical_risk(&self, d: &Dataset) -> Vec<f64> {
        let t = self.transform(d);
        let w = self.weights();
        let loss = self.loss();
        let n = t.len();
        let dim = w.len();

        let mut grad = (0..n)
            .into_par_iter()
            .fold(
                || vec![0.0; dim],
                |mut acc, i| {
                    let x = t.x_at(i);
                    let g = loss.dloss(t.label(i), x.dot_slice(w));
                    for (j, v) in x.iter() {
                        acc[j] += v * g;
                    }
                    acc
                },
            )
            .reduce(
                || vec![0.0; dim],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(&b) {
                        *x += y;
                    }
                    a
                },
            );

        let lambda = self.lambda();
        for (gj, wj) in grad.iter_mut().zip(w) {
            *gj = *gj / n as f64 + lambda * wj;
        }
        grad
    }

    fn norm_grad_empirical_risk(&self, d: &Dataset) -> f64 {
        self.grad_empirical_risk(d)
            .iter()
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt()
    }

    /// Predicted labels `sign(<w, x_i>)` in {-1, +1}.
    fn predict(&self, d: &Dataset) -> Vec<f64> {
        let t = self.transform(d);
        let w = self.weights();
        (0..t.len())
            .into_par_iter()
            .map(|i| sign(t.x_at(i).dot_slice(w)))
            .collect()
    }
}

/// Plain linear model: the feature transform is the identity.
#[derive(Debug, Clone)]
pub struct LinearModel {
    lambda: f64,
    w: Vec<f64>,
    loss: Loss,
}

impl LinearModel {
    /// # Panics
    /// If `lambda` is not strictly positive.
    pub fn new(lambda: f64, loss: Loss) -> Self {
        assert!(lambda > 0.0, "lambda must be > 0");
        Self {
            lambda,
            w: Vec::new(),
            loss,
        }
    }
}

impl Model for LinearModel {
    fn lambda(&self) -> f64 {
        self.lambda
    }

    fn loss(&self) -> Loss {
        self.loss
    }

    fn weights(&self) -> &[f64] {
        &self.w
    }

    fn set_weights(&mut self, w: Vec<f64>) {
        self.w = w;
    }

    fn transform(&self, d: &Dataset) -> Dataset {
        d.clone()
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "model_type": "linear",
            "model_lambda": self.lambda,
            "model_loss": self.loss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;
    use approx::assert_relative_eq;

    fn two_points() -> Dataset {
        Dataset::new(
            vec![
                Vector::from_dense(vec![1.0, 0.0]),
                Vector::from_dense(vec![0.0, 1.0]),
            ],
            vec![1.0, -1.0],
        )
    }

    #[test]
    fn risk_matches_hand_computation() {
        let mut m = LinearModel::new(0.5, Loss::Hinge);
        m.set_weights(vec![2.0, -2.0]);
        // Both rows predict past the margin, so only the regularizer remains.
        let d = two_points();
        assert_relative_eq!(m.empirical_risk(&d), 0.25 * 8.0);
    }

    #[test]
    fn gradient_matches_hand_computation() {
        let mut m = LinearModel::new(1.0, Loss::Square);
        m.set_weights(vec![0.0, 0.0]);
        let d = two_points();
        // dloss = haty - y = -y, so g_j = (1/2) * (-y_j) per one-hot row.
        let g = m.grad_empirical_risk(&d);
        assert_relative_eq!(g[0], -0.5);
        assert_relative_eq!(g[1], 0.5);
    }

    #[test]
    fn predict_takes_the_sign() {
        let mut m = LinearModel::new(1.0, Loss::Hinge);
        m.set_weights(vec![1.0, -1.0]);
        let d = two_points();
        assert_eq!(m.predict(&d), vec![1.0, -1.0]);
    }

    #[test]
    #[should_panic(expected = "lambda must be > 0")]
    fn non_positive_lambda_is_fatal() {
        LinearModel::new(0.0, Loss::Hinge);
    }
}
