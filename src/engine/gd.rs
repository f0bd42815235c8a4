use std::time::Instant;

use log::debug;
use serde_json::json;

use super::{Classifier, HistoryEntry};
use crate::dataset::Dataset;
use crate::model::Model;

/// Batch gradient descent settings.
#[derive(Debug, Clone, Copy)]
pub struct GdConfig {
    pub nrounds: u64,
    pub t_offset: u64,
    pub c0: f64,
}

impl Default for GdConfig {
    fn default() -> Self {
        Self {
            nrounds: 1,
            t_offset: 0,
            c0: 1.0,
        }
    }
}

/// Full-gradient reference trainer.
///
/// Single-threaded and deterministic; exists to validate the parallel SGD
/// engine. Each round applies
/// `w <- (1 - eta_t * lambda) * w - (eta_t / n) * sum_i dloss_i * x_i`
/// with `eta_t = c0 / (lambda * (round + t_offset))`.
pub struct BatchGd<M> {
    model: M,
    cfg: GdConfig,
    history: Vec<HistoryEntry>,
    training_len: usize,
}

impl<M: Model> BatchGd<M> {
    /// # Panics
    /// If `nrounds` is zero or `c0` is not strictly positive.
    pub fn new(model: M, cfg: GdConfig) -> Self {
        assert!(cfg.nrounds >= 1, "need at least one round");
        assert!(cfg.c0 > 0.0, "c0 must be > 0");
        Self {
            model,
            cfg,
            history: Vec::new(),
            training_len: 0,
        }
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

impl<M: Model> Classifier for BatchGd<M> {
    type M = M;

    fn fit(&mut self, d: &Dataset, keep_histories: bool) {
        let mut transformed = self.model.transform(d);
        transformed.materialize();

        let (n, dim) = transformed.shape();
        assert!(n > 0, "cannot fit an empty dataset");
        self.training_len = n;

        let lambda = self.model.lambda();
        let loss = self.model.loss();
        let mut w = self.model.weights().to_vec();
        w.resize(dim, 0.0);

        self.history.clear();
        let clock = Instant::now();

        let mut accum = vec![0.0; dim];
        for round in 1..=self.cfg.nrounds {
            let t_eff = round + self.cfg.t_offset;
            let eta = self.cfg.c0 / (lambda * t_eff as f64);

            accum.iter_mut().for_each(|a| *a = 0.0);
            for (x, y) in transformed.rows() {
                let g = loss.dloss(y, x.dot_slice(&w));
                for (j, xj) in x.iter() {
                    accum[j] += xj * g;
                }
            }

            let decay = 1.0 - eta * lambda;
            let step = eta / n as f64;
            for (wj, aj) in w.iter_mut().zip(&accum) {
                *wj = decay * *wj - step * aj;
            }

            if keep_histories {
                self.history.push(HistoryEntry {
                    round,
                    elapsed_usec: clock.elapsed().as_micros() as u64,
                    weights: w.clone(),
                });
            }
            debug!("finished round {round}, step size {eta}");
        }

        self.model.set_weights(w);
    }

    fn model(&self) -> &M {
        &self.model
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn name(&self) -> &'static str {
        "gd"
    }

    fn config(&self) -> serde_json::Value {
        let mut m = self.model.config();
        m["clf_name"] = json!(self.name());
        m["clf_nrounds"] = json!(self.cfg.nrounds);
        m["clf_t_offset"] = json!(self.cfg.t_offset);
        m["clf_c0"] = json!(self.cfg.c0);
        m["clf_training_sz"] = json!(self.training_len);
        m
    }
}
