use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use serde_json::json;

use super::{Classifier, HistoryEntry};
use crate::dataset::Dataset;
use crate::executor::TaskExecutor;
use crate::loss::Loss;
use crate::model::Model;
use crate::weights::SharedWeights;

/// Parallel SGD settings.
#[derive(Debug, Clone, Copy)]
pub struct SgdConfig {
    /// Epochs over the training set.
    pub nrounds: u64,
    /// Worker pool size; clamped to the training-set size at fit time.
    pub nworkers: usize,
    /// Per-cell locking on every weight access, versus race-tolerant
    /// relaxed reads and writes.
    pub locking: bool,
    /// Added to the global step index, shifting the step-size schedule.
    pub t_offset: u64,
    /// Step-size numerator: `eta_t = c0 / (lambda * t_eff)`.
    pub c0: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            nrounds: 1,
            nworkers: 1,
            locking: false,
            t_offset: 0,
            c0: 1.0,
        }
    }
}

/// Parallel stochastic gradient descent over shared weight state.
///
/// Each epoch shuffles the training set, splits the permutation into one
/// contiguous chunk per worker, and fans the chunks out to a fixed pool of
/// [`TaskExecutor`] threads that update a common [`SharedWeights`]. The
/// await of all chunk futures is the epoch barrier, the only cross-worker
/// ordering the engine promises.
pub struct ParSgd<M> {
    model: M,
    cfg: SgdConfig,
    rng: StdRng,
    history: Vec<HistoryEntry>,
    training_len: usize,
}

impl<M: Model> ParSgd<M> {
    /// # Panics
    /// If `nrounds` or `nworkers` is zero, or `c0` is not strictly
    /// positive.
    pub fn new(model: M, cfg: SgdConfig, rng: StdRng) -> Self {
        assert!(cfg.nrounds >= 1, "need at least one round");
        assert!(cfg.nworkers >= 1, "need at least one worker");
        assert!(cfg.c0 > 0.0, "c0 must be > 0");
        Self {
            model,
            cfg,
            rng,
            history: Vec::new(),
            training_len: 0,
        }
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

impl<M: Model> Classifier for ParSgd<M> {
    type M = M;

    fn fit(&mut self, d: &Dataset, keep_histories: bool) {
        let mut transformed = self.model.transform(d);
        info!("fitting x_shape: {:?}", transformed.shape());

        let watch = Instant::now();
        transformed.materialize();
        debug!(
            "materializing took {:.3} ms",
            watch.elapsed().as_secs_f64() * 1e3
        );
        debug!("max transformed norm is {}", transformed.max_x_norm());

        let (n, dim) = transformed.shape();
        assert!(n > 0, "cannot fit an empty dataset");
        self.training_len = n;

        let counts: Arc<[usize]> = transformed.feature_counts().into();
        let state = Arc::new(SharedWeights::new(dim));

        self.history.clear();
        if keep_histories {
            self.history.reserve(self.cfg.nrounds as usize);
        }

        let nworkers = if n < self.cfg.nworkers {
            1
        } else {
            self.cfg.nworkers
        };
        let chunk = n / nworkers;
        info!("actual_nworkers: {nworkers}");
        info!(
            "starting eta_t: {}",
            self.cfg.c0 / (self.model.lambda() * (1 + self.cfg.t_offset) as f64)
        );

        let mut workers: Vec<TaskExecutor> = (0..nworkers).map(|_| TaskExecutor::new()).collect();

        let clock = Instant::now();
        for round in 1..=self.cfg.nrounds {
            let pi = transformed.permute(&mut self.rng);
            let lap = Instant::now();

            let handles: Vec<_> = workers
                .iter()
                .enumerate()
                .map(|(w, executor)| {
                    let begin = w * chunk;
                    let end = if w + 1 == nworkers { n } else { (w + 1) * chunk };
                    let indices = pi.indices()[begin..end].to_vec();
                    let task = UpdateTask {
                        dataset: transformed.clone(),
                        state: Arc::clone(&state),
                        counts: Arc::clone(&counts),
                        loss: self.model.loss(),
                        lambda: self.model.lambda(),
                        c0: self.cfg.c0,
                        t_offset: self.cfg.t_offset,
                        round,
                        n,
                        locking: self.cfg.locking,
                    };
                    executor.submit(move || task.run(&indices))
                })
                .collect();

            // Epoch barrier: every write of this round happens-before any
            // read of the next.
            for handle in handles {
                handle.wait();
            }

            if keep_histories {
                self.history.push(HistoryEntry {
                    round,
                    elapsed_usec: clock.elapsed().as_micros() as u64,
                    weights: state.snapshot(),
                });
            }
            debug!(
                "finished round {round} in {:.3} ms",
                lap.elapsed().as_secs_f64() * 1e3
            );
        }

        self.model.set_weights(state.snapshot());
        for worker in &mut workers {
            worker.shutdown();
        }
    }

    fn model(&self) -> &M {
        &self.model
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn name(&self) -> &'static str {
        if self.cfg.locking {
            "sgd-lock"
        } else {
            "sgd-nolock"
        }
    }

    fn config(&self) -> serde_json::Value {
        let mut m = self.model.config();
        m["clf_name"] = json!(self.name());
        m["clf_nrounds"] = json!(self.cfg.nrounds);
        m["clf_nworkers"] = json!(self.cfg.nworkers);
        m["clf_do_locking"] = json!(self.cfg.locking);
        m["clf_t_offset"] = json!(self.cfg.t_offset);
        m["clf_c0"] = json!(self.cfg.c0);
        m["clf_training_sz"] = json!(self.training_len);
        m
    }
}

/// One worker's share of an epoch: the state shared with every other
/// worker plus the scalars of the update rule.
struct UpdateTask {
    dataset: Dataset,
    state: Arc<SharedWeights>,
    counts: Arc<[usize]>,
    loss: Loss,
    lambda: f64,
    c0: f64,
    t_offset: u64,
    round: u64,
    n: usize,
    locking: bool,
}

impl UpdateTask {
    fn run(&self, indices: &[usize]) {
        if self.locking {
            self.run_updates::<true>(indices);
        } else {
            self.run_updates::<false>(indices);
        }
    }

    fn run_updates<const LOCKING: bool>(&self, indices: &[usize]) {
        let nf = self.n as f64;
        for (i, &idx) in indices.iter().enumerate() {
            // Step index is 1-based within this worker's chunk.
            let t_eff = (self.round - 1) * self.n as u64 + (i as u64 + 1) + self.t_offset;
            let eta = self.c0 / (self.lambda * t_eff as f64);

            let x = self.dataset.x_at(idx);
            let y = self.dataset.label(idx);

            let mut haty = 0.0;
            for (j, xj) in x.iter() {
                let wj = if LOCKING {
                    self.state.read_locked(j)
                } else {
                    self.state.read_relaxed(j)
                };
                haty += xj * wj;
            }
            let g = self.loss.dloss(y, haty);

            for (j, xj) in x.iter() {
                debug_assert!(self.counts[j] > 0, "updated feature never counted");
                // The whole-model regularizer is apportioned to the
                // features present on this example via n / c[j], so one
                // epoch sums to the full lambda penalty.
                let decay = 1.0 - eta * self.lambda * nf / self.counts[j] as f64;
                if LOCKING {
                    self.state.lock(j);
                    let wold = self.state.read_relaxed(j);
                    self.state.write_relaxed(j, decay * wold - eta * g * xj);
                    self.state.unlock(j);
                } else {
                    let wold = self.state.read_relaxed(j);
                    self.state.write_relaxed(j, decay * wold - eta * g * xj);
                }
            }
        }
    }
}
