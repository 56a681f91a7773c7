// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A draw unit running tasks on the dispatching thread.

use repaint_core::draw::{DispatchOutcome, DrawUnit, TaskQueue};

use crate::kernel;

/// Runs tasks inline, during dispatch.
///
/// Without a budget every available task of the offered layer is drawn in
/// one round. With one, at most that many are drawn and the rest wait for
/// the next round, leaving room for units added after this one.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareUnit {
    budget: Option<usize>,
}

impl SoftwareUnit {
    /// A unit with no per-round budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A unit drawing at most `tasks` tasks per round (at least one).
    #[must_use]
    pub fn with_budget(tasks: usize) -> Self {
        Self {
            budget: Some(tasks.max(1)),
        }
    }

    /// The per-round budget, if any.
    #[inline]
    #[must_use]
    pub fn budget(&self) -> Option<usize> {
        self.budget
    }
}

impl DrawUnit for SoftwareUnit {
    fn name(&self) -> &'static str {
        "software"
    }

    fn dispatch(&mut self, queue: &mut TaskQueue<'_>) -> DispatchOutcome {
        let mut taken = 0;
        while self.budget.is_none_or(|b| taken < b) {
            let Some(job) = queue.next_available() else {
                break;
            };
            kernel::execute(&job);
            queue.complete(job);
            taken += 1;
        }
        if taken == 0 {
            DispatchOutcome::Idle
        } else {
            DispatchOutcome::Taken(taken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_at_least_one_task() {
        assert_eq!(SoftwareUnit::with_budget(0).budget(), Some(1));
        assert_eq!(SoftwareUnit::new().budget(), None);
    }
}
