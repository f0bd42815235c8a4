//! Parallel stochastic gradient descent for regularized linear
//! classifiers.
//!
//! The crate trains binary classifiers (labels in {-1, +1}) by minimizing
//! `F(w) = (1/n) * sum_i loss(y_i, <w, x_i>) + (lambda/2) * ||w||^2` over
//! sparse or dense feature vectors. Worker threads update one shared
//! weight vector, either under per-cell locks or entirely race-tolerant
//! (Hogwild); a full-gradient batch trainer serves as the deterministic
//! reference.
//!
//! The main pieces:
//!
//! * [`vector::Vector`] — tagged dense/sparse feature vectors
//! * [`weights::SharedWeights`] — the concurrent weight-cell substrate
//! * [`dataset::Dataset`] — owned or lazily transformed rows, with
//!   parallel materialization
//! * [`model`] — linear and random-Fourier-feature kernelized models
//! * [`engine`] — the parallel SGD and batch GD trainers
//! * [`files`] — binary, ASCII, and sparse-index feature files

pub mod dataset;
pub mod engine;
pub mod executor;
pub mod files;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod vector;
pub mod weights;

pub use dataset::{Dataset, FeatureMap, Permutation};
pub use engine::{BatchGd, Classifier, GdConfig, HistoryEntry, ParSgd, SgdConfig};
pub use loss::Loss;
pub use model::{KernelModel, LinearModel, Model, RbfKernel};
pub use vector::Vector;
pub use weights::SharedWeights;
