use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    running: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// A single worker thread fed through a FIFO of closures.
///
/// Each submission returns a [`TaskHandle`] fulfilled when the closure
/// finishes on the worker. One producer and one consumer; the SGD engine
/// owns one executor per worker slot and submits one chunk per epoch.
pub struct TaskExecutor {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl TaskExecutor {
    /// Spawns the worker thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || loop {
            let job = {
                let mut q = worker.queue.lock();
                loop {
                    if let Some(job) = q.jobs.pop_front() {
                        break Some(job);
                    }
                    if !q.running {
                        break None;
                    }
                    worker.available.wait(&mut q);
                }
            };
            match job {
                Some(job) => job(),
                None => return,
            }
        });
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Enqueues `f` and returns a handle to its eventual result.
    ///
    /// # Panics
    /// If called after [`shutdown`](Self::shutdown).
    pub fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let slot = Arc::new(Slot {
            result: Mutex::new(None),
            done: Condvar::new(),
        });
        let fulfil = Arc::clone(&slot);
        let job: Job = Box::new(move || {
            let out = f();
            *fulfil.result.lock() = Some(out);
            fulfil.done.notify_all();
        });

        let mut q = self.shared.queue.lock();
        assert!(q.running, "submit after shutdown");
        q.jobs.push_back(job);
        self.shared.available.notify_one();
        drop(q);

        TaskHandle { slot }
    }

    /// Stops accepting work, lets the queue drain, and joins the thread.
    pub fn shutdown(&mut self) {
        {
            let mut q = self.shared.queue.lock();
            q.running = false;
            self.shared.available.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Slot<T> {
    result: Mutex<Option<T>>,
    done: Condvar,
}

/// The receiving end of one submitted task.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task completes and yields its result.
    pub fn wait(self) -> T {
        let mut slot = self.slot.result.lock();
        loop {
            if let Some(out) = slot.take() {
                return out;
            }
            self.slot.done.wait(&mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_closure_result() {
        let ex = TaskExecutor::new();
        let h = ex.submit(|| 40 + 2);
        assert_eq!(h.wait(), 42);
    }

    #[test]
    fn runs_jobs_in_submission_order() {
        let ex = TaskExecutor::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                ex.submit(move || log.lock().push(i))
            })
            .collect();
        for h in handles {
            h.wait();
        }
        assert_eq!(*log.lock(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn shutdown_drains_pending_work() {
        let mut ex = TaskExecutor::new();
        let h = ex.submit(|| 7);
        ex.shutdown();
        assert_eq!(h.wait(), 7);
    }

    #[test]
    #[should_panic(expected = "submit after shutdown")]
    fn submit_after_shutdown_is_fatal() {
        let mut ex = TaskExecutor::new();
        ex.shutdown();
        let _ = ex.submit(|| ());
    }
}
