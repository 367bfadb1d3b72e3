//! Priority-ordered job execution on a worker thread pool.
//!
//! The [`JobSystem`] is independent of the ECS: any caller may submit a
//! [`Job`] (a closure plus a [`Priority`]) and worker threads run the
//! highest-priority pending job first. An atomic completion counter tracks
//! every kicked-but-unfinished job, so callers can block on
//! [`JobSystem::wait_for_counter`] (or poll [`JobSystem::jobs_completed`])
//! until all outstanding work is done — the engine's texture loader kicks its
//! decode jobs this way and waits before building GPU-side objects.
//!
//! Ordering guarantees are deliberately narrow: whenever a worker frees, it
//! picks a pending job of the highest priority present, but among jobs of
//! equal priority the order is whatever the binary heap yields — arbitrary,
//! and not FIFO. A running job is never preempted, and there is no
//! cancellation: once kicked, a job runs to completion.
//!
//! Shutdown drains before it stops: the pool first waits for the completion
//! counter to reach zero (a job may kick further jobs, so draining the queue
//! alone is not enough), then raises the stop flag, wakes every worker, and
//! joins them.

use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, trace};

/// Allowable priority levels for jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// A unit of work: an entry-point closure plus a scheduling priority. The
/// closure owns whatever context it needs; the job system never inspects it.
pub struct Job {
    priority: Priority,
    task: Box<dyn FnOnce() + Send + 'static>,
}

impl Job {
    /// Declare a job with the given priority.
    pub fn new(priority: Priority, task: impl FnOnce() + Send + 'static) -> Self {
        Self {
            priority,
            task: Box::new(task),
        }
    }

    /// The job's scheduling priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// Heap entry ordered by priority alone. Jobs of equal priority compare equal,
/// so their relative order is heap order — arbitrary by design.
struct Pending {
    priority: Priority,
    task: Box<dyn FnOnce() + Send + 'static>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority.cmp(&other.priority)
    }
}

impl From<Job> for Pending {
    fn from(job: Job) -> Self {
        Self {
            priority: job.priority,
            task: job.task,
        }
    }
}

/// The pending-job queue and the stop flag, guarded by one mutex.
struct Queue {
    heap: BinaryHeap<Pending>,
    stop: bool,
}

/// Outstanding-job accounting: incremented on kick, decremented when a job's
/// entry point returns. Waiters block on the condvar until it reaches zero.
struct Counter {
    count: AtomicI64,
    lock: Mutex<()>,
    done: Condvar,
}

impl Counter {
    fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            lock: Mutex::new(()),
            done: Condvar::new(),
        }
    }

    fn add(&self, n: i64) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Decrement after a job finishes, waking waiters on the last one. The
    /// counter can only go negative through a bookkeeping bug, so underflow is
    /// asserted rather than tolerated.
    fn finish_one(&self) {
        let previous = self.count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "job counter underflow");
        if previous == 1 {
            // Take the lock before notifying so a waiter cannot check the
            // count and then miss the wakeup.
            let _guard = self.lock.lock().unwrap();
            self.done.notify_all();
        }
    }

    fn is_done(&self) -> bool {
        self.count.load(Ordering::SeqCst) <= 0
    }

    fn wait(&self) {
        let mut guard = self.lock.lock().unwrap();
        while !self.is_done() {
            guard = self.done.wait(guard).unwrap();
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock().unwrap();
        while !self.is_done() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self.done.wait_timeout(guard, deadline - now).unwrap();
            guard = next;
        }
        true
    }
}

/// State shared between the pool, its workers, and any [`Handle`]s.
struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    counter: Counter,
}

impl Shared {
    fn kick(&self, job: Job) {
        self.counter.add(1);
        self.enqueue(job.into());
    }

    fn kick_all(&self, jobs: impl IntoIterator<Item = Job>) {
        let pending: Vec<Pending> = jobs.into_iter().map(Pending::from).collect();
        self.counter.add(pending.len() as i64);
        for job in pending {
            self.enqueue(job);
        }
    }

    fn enqueue(&self, job: Pending) {
        let mut queue = self.queue.lock().unwrap();
        assert!(!queue.stop, "job kicked after the job system shut down");
        queue.heap.push(job);
        self.available.notify_one();
    }
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, shared: Arc<Shared>) -> Self {
        let handle = thread::spawn(move || {
            loop {
                let job = {
                    let mut queue = shared.queue.lock().unwrap();
                    loop {
                        if let Some(job) = queue.heap.pop() {
                            break job;
                        }
                        if queue.stop {
                            trace!("worker {id} stopped");
                            return;
                        }
                        queue = shared.available.wait(queue).unwrap();
                    }
                };

                // Run outside the lock. A panicking job must not take the
                // worker down with it, or the pool would shrink one bad job
                // at a time.
                let result = panic::catch_unwind(AssertUnwindSafe(job.task));
                if result.is_err() {
                    error!("job panicked; worker {id} continuing");
                }

                shared.counter.finish_one();
            }
        });

        Self {
            id,
            handle: Some(handle),
        }
    }
}

/// A priority thread pool with counter-based completion tracking.
///
/// Owns its workers, queue, and counter outright: construct one where the
/// application can own it, and dropping it shuts it down (draining all
/// outstanding jobs first). There are no process-wide globals.
pub struct JobSystem {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

impl JobSystem {
    /// Spin up a pool with the given number of worker threads.
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads > 0, "job system needs at least one worker");

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                stop: false,
            }),
            available: Condvar::new(),
            counter: Counter::new(),
        });

        let workers = (0..num_threads)
            .map(|id| Worker::new(id, Arc::clone(&shared)))
            .collect();

        info!("job system initialized with {num_threads} worker threads");
        Self { shared, workers }
    }

    /// Spin up a pool sized to the machine's available parallelism.
    pub fn with_default_parallelism() -> Self {
        let num_threads = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(num_threads)
    }

    /// Number of worker threads in the pool.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// A cloneable handle for submitting jobs from other threads — including
    /// from inside a running job.
    pub fn handle(&self) -> Handle {
        Handle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Submit a job: the completion counter is incremented before the job is
    /// queued, so waiters can never observe the gap between the two.
    pub fn kick(&self, job: Job) {
        self.shared.kick(job);
    }

    /// Submit a batch of jobs, incrementing the counter by the batch size up
    /// front.
    pub fn kick_all(&self, jobs: impl IntoIterator<Item = Job>) {
        self.shared.kick_all(jobs);
    }

    /// Kick a job and block until *all* outstanding jobs (not just this one)
    /// have completed.
    pub fn kick_and_wait(&self, job: Job) {
        self.kick(job);
        trace!("job away, waiting for completion");
        self.wait_for_counter();
    }

    /// Kick a batch of jobs and block until all outstanding jobs complete.
    pub fn kick_all_and_wait(&self, jobs: impl IntoIterator<Item = Job>) {
        self.kick_all(jobs);
        trace!("jobs away, waiting for completion");
        self.wait_for_counter();
    }

    /// Non-blocking check: have all kicked jobs finished?
    pub fn jobs_completed(&self) -> bool {
        self.shared.counter.is_done()
    }

    /// Block the calling thread until the completion counter reaches zero.
    pub fn wait_for_counter(&self) {
        self.shared.counter.wait();
    }

    /// Bounded wait: returns whether the counter reached zero before the
    /// deadline. On expiry this returns `false` with the counter untouched;
    /// the caller is free to poll again or give up.
    pub fn wait_for_counter_timeout(&self, timeout: Duration) -> bool {
        self.shared.counter.wait_timeout(timeout)
    }

    /// Drain all outstanding jobs, then stop and join every worker.
    /// Idempotent; also invoked by `Drop`.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        // Drain the counter, not just the queue: a running job may kick more
        // jobs, and those must finish before the stop flag goes up.
        self.wait_for_counter();

        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.stop = true;
            trace!("notifying all workers to stop");
            self.shared.available.notify_all();
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                trace!("joining worker {}", worker.id);
                handle.join().unwrap();
            }
        }
        self.workers.clear();

        info!("all workers joined, job system shut down");
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A handle for submitting jobs to a [`JobSystem`] from other threads. Clone
/// it freely; a job closure can carry one to kick follow-up jobs.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl Handle {
    /// Submit a job. Same counter semantics as [`JobSystem::kick`].
    pub fn kick(&self, job: Job) {
        self.shared.kick(job);
    }

    /// Submit a batch of jobs. Same counter semantics as
    /// [`JobSystem::kick_all`].
    pub fn kick_all(&self, jobs: impl IntoIterator<Item = Job>) {
        self.shared.kick_all(jobs);
    }

    /// Non-blocking check: have all kicked jobs finished?
    pub fn jobs_completed(&self) -> bool {
        self.shared.counter.is_done()
    }
}
