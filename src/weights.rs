use std::sync::atomic::{AtomicU64, Ordering};

const LOCK_MASK: u64 = 0x1;

/// Shared mutable weight state for multi-worker SGD.
///
/// Each cell pairs an `f64` value with a version word whose low bit is a
/// per-cell spinlock. Two update regimes are supported on the same storage:
///
/// * *locked* — `lock`/`unlock` serialize read-modify-write per cell and
///   bump the logical version on release;
/// * *unlocked* — `read_relaxed`/`write_relaxed` race freely. Concurrent
///   updates may be lost; the SGD algorithm tolerates that by design
///   (Hogwild).
///
/// Values and versions live in two parallel atomic arrays, so every access
/// is tear-free at word granularity regardless of regime.
pub struct SharedWeights {
    versions: Box<[AtomicU64]>,
    values: Box<[AtomicU64]>,
}

impl SharedWeights {
    /// Creates `d` zero-initialized, unlocked cells.
    pub fn new(d: usize) -> Self {
        Self {
            versions: (0..d).map(|_| AtomicU64::new(0)).collect(),
            values: (0..d).map(|_| AtomicU64::new(0.0_f64.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Single relaxed load of cell `i`. No coherence with concurrent
    /// writers beyond tear-freedom.
    #[inline]
    pub fn read_relaxed(&self, i: usize) -> f64 {
        f64::from_bits(self.values[i].load(Ordering::Relaxed))
    }

    /// Single relaxed store to cell `i`.
    #[inline]
    pub fn write_relaxed(&self, i: usize, x: f64) {
        self.values[i].store(x.to_bits(), Ordering::Relaxed);
    }

    /// Spins until cell `i`'s lock bit is acquired.
    #[inline]
    pub fn lock(&self, i: usize) {
        loop {
            let v = self.versions[i].load(Ordering::Relaxed);
            if v & LOCK_MASK == 0
                && self.versions[i]
                    .compare_exchange_weak(v, v | LOCK_MASK, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            std::hint::spin_loop();
        }
    }

    /// Releases cell `i` and increments its logical version.
    ///
    /// Only the thread that acquired the lock may call this.
    #[inline]
    pub fn unlock(&self, i: usize) {
        let v = self.versions[i].load(Ordering::Relaxed);
        debug_assert!(v & LOCK_MASK != 0, "unlock of an unlocked cell");
        self.versions[i].store(((v >> 1) + 1) << 1, Ordering::Release);
    }

    /// Reads cell `i` under its lock. Sees the latest committed write.
    #[inline]
    pub fn read_locked(&self, i: usize) -> f64 {
        self.lock(i);
        let x = self.read_relaxed(i);
        self.unlock(i);
        x
    }

    /// Reads a value that was coherent at some instant, along with the
    /// version witnessing it.
    ///
    /// Spins while the cell is locked, takes the value, then re-checks the
    /// version; a mismatch means a writer committed in between and the read
    /// retries.
    pub fn read_stable(&self, i: usize) -> (f64, u64) {
        loop {
            let v0 = self.stable_version(i);
            let x = self.read_relaxed(i);
            if self.versions[i].load(Ordering::Acquire) == v0 {
                return (x, v0);
            }
            std::hint::spin_loop();
        }
    }

    /// Current version word of cell `i`, lock bit included.
    #[inline]
    pub fn raw_version(&self, i: usize) -> u64 {
        self.versions[i].load(Ordering::Acquire)
    }

    /// Copies every value into `out`, resizing it to match.
    ///
    /// Not linearizable with concurrent writers: the result reflects some
    /// interleaving of committed writes.
    pub fn snapshot_into(&self, out: &mut Vec<f64>) {
        out.resize(self.values.len(), 0.0);
        for (slot, cell) in out.iter_mut().zip(self.values.iter()) {
            *slot = f64::from_bits(cell.load(Ordering::Relaxed));
        }
    }

    /// Convenience snapshot into a fresh vector.
    pub fn snapshot(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.snapshot_into(&mut out);
        out
    }

    /// Opens a buffered read/write batch over these cells.
    pub fn txn(&self) -> Txn<'_> {
        Txn {
            weights: self,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn stable_version(&self, i: usize) -> u64 {
        loop {
            let v = self.versions[i].load(Ordering::Acquire);
            if v & LOCK_MASK == 0 {
                return v;
            }
            std::hint::spin_loop();
        }
    }
}

/// A buffered transaction over [`SharedWeights`].
///
/// Reads record the witnessing version; writes are buffered until commit.
/// There are no read-own-write semantics: a `read` after a buffered `write`
/// to the same cell still observes the shared state.
pub struct Txn<'a> {
    weights: &'a SharedWeights,
    reads: Vec<(usize, u64)>,
    writes: Vec<(usize, f64)>,
}

impl Txn<'_> {
    /// Stable-reads cell `i` and records the observed version.
    pub fn read(&mut self, i: usize) -> f64 {
        let (x, v) = self.weights.read_stable(i);
        self.reads.push((i, v));
        x
    }

    /// Buffers a write of `x` to cell `i`.
    pub fn write(&mut self, i: usize, x: f64) {
        self.writes.push((i, x));
    }

    /// Validates every recorded read and, if all still hold, applies the
    /// buffered writes in ascending cell order under per-cell locks.
    ///
    /// Returns whether the transaction committed. On validation failure
    /// nothing is written.
    pub fn commit(mut self) -> bool {
        for &(i, v) in &self.reads {
            if self.weights.raw_version(i) != v {
                return false;
            }
        }
        self.writes.sort_by_key(|&(i, _)| i);
        for &(i, x) in &self.writes {
            self.weights.lock(i);
            self.weights.write_relaxed(i, x);
            self.weights.unlock(i);
        }
        true
    }
}
