//! Update scheduler - deduplicated, identity-ordered job queue.
//!
//! Reactive invalidations do not re-run render effects directly; they enqueue
//! the owning instance's update job here. Jobs execute at an explicit flush
//! point ([`flush_jobs`]), in ascending identity order, at most once per
//! flush no matter how many invalidations requested them. Identities are
//! assigned at instance creation and increase monotonically, so a parent
//! (created first) always flushes before a child invalidated by the parent's
//! own update in the same batch.
//!
//! The flush point is owned by the host: a run-loop tick calls `flush_jobs`,
//! and tests drain explicitly. Enqueuing never runs a job.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Numeric job identity; doubles as the queue ordering key.
pub type JobId = u64;

/// A pending unit of update work.
#[derive(Clone)]
pub struct Job {
    id: JobId,
    run: Rc<dyn Fn()>,
}

impl Job {
    pub fn new(id: JobId, run: impl Fn() + 'static) -> Self {
        Job {
            id,
            run: Rc::new(run),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }
}

thread_local! {
    /// Pending jobs, sorted by ascending id.
    static QUEUE: RefCell<Vec<Job>> = const { RefCell::new(Vec::new()) };

    /// Index of the job currently executing (valid while flushing).
    static FLUSH_INDEX: Cell<usize> = const { Cell::new(0) };

    static IS_FLUSHING: Cell<bool> = const { Cell::new(false) };
}

/// Enqueue a job for the next flush.
///
/// Deduplicated: if a job with the same id is already pending (including the
/// one currently executing), this is a no-op. Jobs queued while a flush is in
/// progress join the current flush at their sorted position behind the
/// running job, so an update invalidated by an earlier job in the same batch
/// still runs this tick, and a smaller id queued by the running job runs
/// next rather than displacing it.
pub fn queue_job(job: Job) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        // Dedup against the unflushed tail including the running job;
        // insertion must stay behind the running job's slot.
        let (dedup_start, insert_start) = if IS_FLUSHING.with(Cell::get) {
            let index = FLUSH_INDEX.with(Cell::get);
            (index, index + 1)
        } else {
            (0, 0)
        };
        if queue[dedup_start..].iter().any(|pending| pending.id == job.id) {
            return;
        }
        let pos = queue[insert_start..]
            .iter()
            .position(|pending| pending.id > job.id)
            .map(|offset| insert_start + offset)
            .unwrap_or(queue.len());
        queue.insert(pos, job);
    });
}

/// Drop a pending job, if one with this id is queued and not yet running.
///
/// Used when an update is about to be performed synchronously through the
/// same job body, so the queued duplicate must not fire a second render.
pub fn invalidate_job(id: JobId) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        let start = if IS_FLUSHING.with(Cell::get) {
            FLUSH_INDEX.with(Cell::get) + 1
        } else {
            0
        };
        if let Some(offset) = queue[start..].iter().position(|pending| pending.id == id) {
            queue.remove(start + offset);
        }
    });
}

/// Number of jobs waiting for the next flush.
pub fn pending_count() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Run all pending jobs in ascending identity order.
///
/// Reentrant calls are no-ops (a job cannot re-enter the flush it runs in).
/// If a job panics, the queue is reset before the panic propagates.
pub fn flush_jobs() {
    if IS_FLUSHING.with(Cell::get) {
        return;
    }
    IS_FLUSHING.with(|f| f.set(true));

    struct FlushGuard;
    impl Drop for FlushGuard {
        fn drop(&mut self) {
            QUEUE.with(|queue| queue.borrow_mut().clear());
            FLUSH_INDEX.with(|i| i.set(0));
            IS_FLUSHING.with(|f| f.set(false));
        }
    }
    let _guard = FlushGuard;

    loop {
        let next = QUEUE.with(|queue| {
            queue
                .borrow()
                .get(FLUSH_INDEX.with(Cell::get))
                .map(|job| job.run.clone())
        });
        let Some(run) = next else { break };
        run();
        FLUSH_INDEX.with(|i| i.set(i.get() + 1));
    }
}

// =============================================================================
// Tests
// =============================================================================
