use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde_json::json;

use super::{LinearModel, Model};
use crate::dataset::{Dataset, FeatureMap};
use crate::loss::Loss;
use crate::vector::Vector;

/// Gaussian RBF kernel `k(x, y) = exp(-gamma * ||x - y||^2)`.
///
/// Translation invariant, so it admits the random-Fourier-feature
/// construction of Rahimi & Recht (NIPS 2007): frequencies are drawn from
/// the kernel's Fourier transform, `Normal(0, sqrt(2 * gamma))` per
/// coordinate.
#[derive(Debug, Clone, Copy)]
pub struct RbfKernel {
    gamma: f64,
}

impl RbfKernel {
    /// # Panics
    /// If `gamma` is not strictly positive and finite.
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0 && gamma.is_finite(), "gamma must be > 0");
        Self { gamma }
    }

    /// Draws one frequency vector of dimension `dim`.
    pub fn sample_fourier<R: Rng>(&self, dim: usize, rng: &mut R) -> Vec<f64> {
        let gauss = Normal::new(0.0, (2.0 * self.gamma).sqrt())
            .expect("std dev is positive and finite");
        (0..dim).map(|_| gauss.sample(rng)).collect()
    }
}

/// The explicit lift `x -> sqrt(2/k) * cos(<omega_j, x> + b_j)`.
struct FourierMap {
    samples: Vec<Vec<f64>>,
    phases: Vec<f64>,
    scale: f64,
}

impl FeatureMap for FourierMap {
    fn apply(&self, x: &Vector) -> Vector {
        let out: Vec<f64> = self
            .samples
            .iter()
            .zip(&self.phases)
            .map(|(omega, b)| (x.dot_slice(omega) + b).cos() * self.scale)
            .collect();
        Vector::from_dense(out)
    }

    fn output_dim(&self) -> usize {
        self.samples.len()
    }
}

/// A linear model trained in an explicit random-Fourier feature space.
///
/// The basis vectors and phase offsets are drawn once at construction and
/// immutable afterwards; weights live in the lifted `kdim`-dimensional
/// space.
pub struct KernelModel {
    base: LinearModel,
    kernel: RbfKernel,
    map: Arc<FourierMap>,
}

impl KernelModel {
    /// Samples a `kdim`-dimensional Fourier basis over `xdim`-dimensional
    /// inputs and wraps a fresh linear model in it.
    ///
    /// # Panics
    /// If `xdim` or `kdim` is zero, or `lambda` is not strictly positive.
    pub fn new<R: Rng>(
        lambda: f64,
        loss: Loss,
        kernel: RbfKernel,
        xdim: usize,
        kdim: usize,
        rng: &mut R,
    ) -> Self {
        assert!(xdim > 0, "input dimension must be positive");
        assert!(kdim > 0, "feature-space dimension must be positive");

        let samples: Vec<Vec<f64>> = (0..kdim).map(|_| kernel.sample_fourier(xdim, rng)).collect();
        let unif = Uniform::new(0.0, 2.0 * PI).expect("phase range is valid");
        let phases: Vec<f64> = (0..kdim).map(|_| unif.sample(rng)).collect();

        Self {
            base: LinearModel::new(lambda, loss),
            kernel,
            map: Arc::new(FourierMap {
                samples,
                phases,
                scale: (2.0 / kdim as f64).sqrt(),
            }),
        }
    }

    /// Dimension of the lifted feature space.
    pub fn kdim(&self) -> usize {
        self.map.samples.len()
    }
}

impl Model for KernelModel {
    fn lambda(&self) -> f64 {
        self.base.lambda()
    }

    fn loss(&self) -> Loss {
        self.base.loss()
    }

    fn weights(&self) -> &[f64] {
        self.base.weights()
    }

    fn set_weights(&mut self, w: Vec<f64>) {
        self.base.set_weights(w);
    }

    fn transform(&self, d: &Dataset) -> Dataset {
        d.with_map(Arc::clone(&self.map) as Arc<dyn FeatureMap>)
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "model_type": "kernelized_linear",
            "model_lambda": self.lambda(),
            "model_loss": self.loss(),
            "model_gamma": self.kernel.gamma,
            "model_kdim": self.kdim(),
        })
    }
}
