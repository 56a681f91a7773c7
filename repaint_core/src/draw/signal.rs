// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch request signal.
//!
//! A one-slot channel: any number of requests made before the next wait
//! collapse into one wake-up. Requests may come from any thread, including
//! draw unit workers finishing a task.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

/// Wakes the thread waiting for draw tasks to finish.
#[derive(Debug)]
pub(crate) struct DispatchSignal {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl DispatchSignal {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self { sender, receiver }
    }

    /// Asks for another dispatch round.
    pub(crate) fn request(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                log::error!("dispatch signal disconnected");
            }
        }
    }

    /// Blocks until a dispatch was requested, then consumes the request.
    pub(crate) fn wait(&self) {
        // Cannot fail: `self` holds the sender.
        _ = self.receiver.recv();
    }

    /// Consumes a pending request without blocking.
    #[cfg(test)]
    pub(crate) fn try_take(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_coalesce() {
        let s = DispatchSignal::new();
        s.request();
        s.request();
        assert!(s.try_take());
        assert!(!s.try_take());
    }

    #[test]
    fn wait_wakes_on_request_from_another_thread() {
        let s = std::sync::Arc::new(DispatchSignal::new());
        let s2 = s.clone();
        let h = std::thread::spawn(move || s2.request());
        s.wait();
        h.join().unwrap();
    }
}
