use std::borrow::Cow;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

use crate::vector::Vector;

/// A pure, index-independent feature transform applied lazily to rows.
pub trait FeatureMap: Send + Sync {
    /// Maps one input row to its transformed counterpart.
    fn apply(&self, x: &Vector) -> Vector;

    /// Dimensionality of the transformed rows.
    fn output_dim(&self) -> usize;
}

enum Storage {
    Owned { x: Vec<Vector>, y: Vec<f64> },
    Mapped { base: Arc<Storage>, map: Arc<dyn FeatureMap> },
}

impl Storage {
    fn len(&self) -> usize {
        match self {
            Storage::Owned { y, .. } => y.len(),
            Storage::Mapped { base, .. } => base.len(),
        }
    }

    fn labels(&self) -> &[f64] {
        match self {
            Storage::Owned { y, .. } => y,
            Storage::Mapped { base, .. } => base.labels(),
        }
    }

    fn x_at(&self, idx: usize) -> Cow<'_, Vector> {
        match self {
            Storage::Owned { x, .. } => Cow::Borrowed(&x[idx]),
            Storage::Mapped { base, map } => Cow::Owned(map.apply(&base.x_at(idx))),
        }
    }
}

/// A labeled dataset of (x, y) rows with y in {-1, +1}.
///
/// The handle is cheap to clone: row storage sits behind an `Arc` and is
/// either owned outright or a lazy [`FeatureMap`] over another storage.
/// Lazy row access materializes the transformed row into an owned value,
/// so callers never share scratch buffers across threads.
#[derive(Clone)]
pub struct Dataset {
    storage: Arc<Storage>,
    shape: (usize, usize),
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset").field("shape", &self.shape).finish()
    }
}

impl Dataset {
    /// Builds a dataset owning its rows and labels.
    ///
    /// # Panics
    /// If row and label counts differ, or any label is not -1 or +1.
    pub fn new(x: Vec<Vector>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "row/label count mismatch");
        assert!(
            y.iter().all(|&l| l == -1.0 || l == 1.0),
            "labels must be -1 or +1"
        );
        let d = x.iter().map(Vector::highest_nonzero_dim).max().unwrap_or(0);
        let shape = (x.len(), d);
        Self {
            storage: Arc::new(Storage::Owned { x, y }),
            shape,
        }
    }

    /// Wraps this dataset in a lazy feature transform. Rows are recomputed
    /// on access until [`materialize`](Self::materialize) is called.
    pub fn with_map(&self, map: Arc<dyn FeatureMap>) -> Self {
        let shape = (self.len(), map.output_dim());
        Self {
            storage: Arc::new(Storage::Mapped {
                base: Arc::clone(&self.storage),
                map,
            }),
            shape,
        }
    }

    /// `(n, d)`: row count and feature dimension.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.shape.0
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0 == 0
    }

    pub fn dim(&self) -> usize {
        self.shape.1
    }

    /// Row `idx`; borrowed when owned, computed when the storage is lazy.
    pub fn x_at(&self, idx: usize) -> Cow<'_, Vector> {
        self.storage.x_at(idx)
    }

    pub fn label(&self, idx: usize) -> f64 {
        self.storage.labels()[idx]
    }

    pub fn labels(&self) -> &[f64] {
        self.storage.labels()
    }

    /// Iterates `(x, y)` rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = (Cow<'_, Vector>, f64)> + '_ {
        (0..self.len()).map(|i| (self.x_at(i), self.label(i)))
    }

    pub fn is_materialized(&self) -> bool {
        matches!(*self.storage, Storage::Owned { .. })
    }

    /// Forces a lazy storage into owned rows with a parallel copy pass.
    ///
    /// Per-row transforms are costly and SGD revisits every row each epoch,
    /// so the transform is paid once here. Owned storage is left untouched.
    pub fn materialize(&mut self) {
        if self.is_materialized() {
            return;
        }
        let x: Vec<Vector> = (0..self.len())
            .into_par_iter()
            .map(|i| self.storage.x_at(i).into_owned())
            .collect();
        let y = self.storage.labels().to_vec();
        self.storage = Arc::new(Storage::Owned { x, y });
    }

    /// `c[j]`: how many rows have a nonzero value at feature `j`.
    pub fn feature_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.dim()];
        for i in 0..self.len() {
            for (j, v) in self.x_at(i).iter() {
                if v != 0.0 {
                    counts[j] += 1;
                }
            }
        }
        counts
    }

    /// Largest row l2 norm; logged at load time as a conditioning hint.
    pub fn max_x_norm(&self) -> f64 {
        (0..self.len())
            .map(|i| self.x_at(i).norm())
            .fold(0.0, f64::max)
    }

    /// Draws a uniform random permutation view over this dataset.
    pub fn permute<R: Rng>(&self, rng: &mut R) -> Permutation<'_> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        Permutation {
            dataset: self,
            indices,
        }
    }
}

/// A shuffled view over a dataset: iteration yields `(x[pi[i]], y[pi[i]])`.
pub struct Permutation<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl Permutation<'_> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cow<'_, Vector>, f64)> + '_ {
        self.indices
            .iter()
            .map(|&i| (self.dataset.x_at(i), self.dataset.label(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Doubler {
        dim: usize,
    }

    impl FeatureMap for Doubler {
        fn apply(&self, x: &Vector) -> Vector {
            let mut out = Vector::dense(self.dim);
            for (j, v) in x.iter() {
                *out.ensure(j) = 2.0 * v;
            }
            out
        }

        fn output_dim(&self) -> usize {
            self.dim
        }
    }

    fn small() -> Dataset {
        Dataset::new(
            vec![
                Vector::from_dense(vec![1.0, 0.0]),
                Vector::from_pairs(vec![(1, 3.0)]),
                Vector::from_dense(vec![-1.0, 2.0]),
            ],
            vec![1.0, -1.0, 1.0],
        )
    }

    #[test]
    fn shape_tracks_highest_dimension() {
        let d = small();
        assert_eq!(d.shape(), (3, 2));
        assert_eq!(d.label(1), -1.0);
    }

    #[test]
    #[should_panic(expected = "row/label count mismatch")]
    fn mismatched_lengths_are_fatal() {
        Dataset::new(vec![Vector::dense(1)], vec![1.0, -1.0]);
    }

    #[test]
    #[should_panic(expected = "labels must be")]
    fn bad_label_is_fatal() {
        Dataset::new(vec![Vector::dense(1)], vec![0.5]);
    }

    #[test]
    fn mapped_dataset_reports_transform_dimension() {
        let d = small();
        let t = d.with_map(Arc::new(Doubler { dim: 5 }));
        assert_eq!(t.shape(), (3, 5));
        assert!(!t.is_materialized());
        assert_relative_eq!(t.x_at(1).get(1), 6.0);
        // Underlying labels pass through untouched.
        assert_eq!(t.labels(), d.labels());
    }

    #[test]
    fn materialize_preserves_rows() {
        let d = small();
        let mut t = d.with_map(Arc::new(Doubler { dim: 2 }));
        let lazy: Vec<(Vector, f64)> = t.rows().map(|(x, y)| (x.into_owned(), y)).collect();

        t.materialize();
        assert!(t.is_materialized());
        let owned: Vec<(Vector, f64)> = t.rows().map(|(x, y)| (x.into_owned(), y)).collect();
        assert_eq!(lazy, owned);
        assert_eq!(t.shape(), (3, 2));
    }

    #[test]
    fn feature_counts_skip_stored_zeros() {
        let d = small();
        assert_eq!(d.feature_counts(), vec![2, 2]);
    }

    #[test]
    fn permutation_covers_every_row_once() {
        let d = small();
        let mut rng = StdRng::seed_from_u64(7);
        let pi = d.permute(&mut rng);
        let mut seen = pi.indices().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(pi.iter().count(), 3);
    }

    #[test]
    fn max_norm_over_rows() {
        let d = small();
        assert_relative_eq!(d.max_x_norm(), 5.0_f64.sqrt());
    }
}
