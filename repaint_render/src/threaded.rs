// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A draw unit backed by a pool of worker threads.
//!
//! ```text
//!   dispatch (pipeline locked)          worker threads
//!   ──────────────────────────          ──────────────
//!   next_available ──► job ──channel──► kernel::execute
//!        ▲                                   │ locks released
//!        └── signal ◄── TaskJob::finish ◄────┘
//! ```
//!
//! The pipeline only offers tasks that do not overlap an unfinished earlier
//! task of the same layer, so workers never race on a pixel. Workers
//! drawing into the same layer still take turns on its buffer lock.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use repaint_core::draw::{DispatchOutcome, DrawUnit, TaskJob, TaskQueue};

use crate::kernel;

/// Draws tasks on worker threads.
///
/// At most one task per worker is taken at a time; while every worker is
/// busy the unit reports [`DispatchOutcome::Idle`] so later units may take
/// work. Dropping the unit waits for the workers to finish their jobs.
#[derive(Debug)]
pub struct ThreadedUnit {
    jobs: Option<Sender<TaskJob>>,
    workers: Vec<JoinHandle<()>>,
    busy: Arc<AtomicUsize>,
}

impl ThreadedUnit {
    /// Spawns `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns the error of the first thread that failed to spawn. Workers
    /// spawned before it are shut down.
    pub fn new(threads: usize) -> io::Result<Self> {
        let (tx, rx) = unbounded();
        let busy = Arc::new(AtomicUsize::new(0));
        let mut unit = Self {
            jobs: Some(tx),
            workers: Vec::with_capacity(threads.max(1)),
            busy,
        };
        for i in 0..threads.max(1) {
            let rx = rx.clone();
            let busy = unit.busy.clone();
            let handle = thread::Builder::new()
                .name(format!("repaint-draw-{i}"))
                .spawn(move || work(&rx, &busy))?;
            unit.workers.push(handle);
        }
        log::debug!("spawned {} draw workers", unit.workers.len());
        Ok(unit)
    }

    /// Number of worker threads.
    #[inline]
    #[must_use]
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Number of jobs handed out and not yet finished.
    #[must_use]
    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::Acquire)
    }
}

fn work(jobs: &Receiver<TaskJob>, busy: &AtomicUsize) {
    for job in jobs {
        kernel::execute(&job);
        // Before `finish`, so the round it triggers sees a free worker.
        busy.fetch_sub(1, Ordering::AcqRel);
        job.finish();
    }
}

impl DrawUnit for ThreadedUnit {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn dispatch(&mut self, queue: &mut TaskQueue<'_>) -> DispatchOutcome {
        let Some(jobs) = &self.jobs else {
            return DispatchOutcome::Refused;
        };
        let mut taken = 0;
        while self.busy.load(Ordering::Acquire) < self.workers.len() {
            let Some(job) = queue.next_available() else {
                break;
            };
            self.busy.fetch_add(1, Ordering::AcqRel);
            if let Err(err) = jobs.send(job) {
                log::error!("draw workers are gone; drawing inline");
                self.busy.fetch_sub(1, Ordering::AcqRel);
                let job = err.into_inner();
                kernel::execute(&job);
                queue.complete(job);
            }
            taken += 1;
        }
        if taken == 0 {
            DispatchOutcome::Idle
        } else {
            DispatchOutcome::Taken(taken)
        }
    }
}

impl Drop for ThreadedUnit {
    fn drop(&mut self) {
        // Workers exit once the channel is drained and closed.
        self.jobs = None;
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            // The last pipeline handle may be released by a worker, which
            // then drops the unit on its own thread.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("a draw worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_worker_is_spawned() {
        let unit = ThreadedUnit::new(0).unwrap();
        assert_eq!(unit.threads(), 1);
        assert_eq!(unit.busy(), 0);
    }

    #[test]
    fn dropping_an_idle_unit_joins_its_workers() {
        let unit = ThreadedUnit::new(3).unwrap();
        assert_eq!(unit.threads(), 3);
        drop(unit);
    }
}
