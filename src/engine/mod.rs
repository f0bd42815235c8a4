mod gd;
mod sgd;

pub use gd::{BatchGd, GdConfig};
pub use sgd::{ParSgd, SgdConfig};

use crate::dataset::Dataset;
use crate::model::Model;

/// One retained snapshot of the weight state, taken at an epoch barrier.
///
/// `elapsed_usec` is measured from the start of the training wall clock,
/// so timestamps are non-decreasing across a run. Under the unlocked SGD
/// regime the snapshot reflects some interleaving of committed writes, not
/// a linearizable cut.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub round: u64,
    pub elapsed_usec: u64,
    pub weights: Vec<f64>,
}

/// An iterative trainer around a [`Model`].
pub trait Classifier {
    type M: Model;

    /// Trains on `d` to completion. All-or-nothing: precondition
    /// violations panic and there are no retries.
    fn fit(&mut self, d: &Dataset, keep_histories: bool);

    fn model(&self) -> &Self::M;

    /// Epoch snapshots from the last `fit` with `keep_histories` set.
    fn history(&self) -> &[HistoryEntry];

    fn name(&self) -> &'static str;

    /// Trainer and model parameters for the run report.
    fn config(&self) -> serde_json::Value;
}
