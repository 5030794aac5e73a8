// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot, deadline-bounded broadcast wait.
//!
//! Hosts use the barrier to hold startup until the first synchronisation
//! attempt has happened, without ever waiting past a configured bound.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};

/// How a [`Barrier::wait_once`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The barrier was already lifted when the call started.
    Pass,
    /// The barrier was lifted while waiting.
    Lift,
    /// The per-call timeout elapsed first.
    Timeout,
    /// The barrier's own deadline has elapsed.
    Expired,
}

/// Gate that host startup can wait on until the first poll attempt is done.
///
/// Once lifted it stays lifted. Past its own deadline it never blocks again,
/// lifted or not.
#[derive(Debug)]
pub struct Barrier {
    lifted: watch::Sender<bool>,
    deadline: Option<Instant>,
}

impl Barrier {
    /// Creates a barrier that stops blocking anyone `timeout` from now.
    pub fn new(timeout: Option<Duration>) -> Self {
        let (lifted, _) = watch::channel(false);
        Self {
            lifted,
            deadline: timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    /// Lifts the barrier and wakes every waiter. Irreversible.
    pub fn lift(&self) {
        self.lifted.send_if_modified(|lifted| !std::mem::replace(lifted, true));
    }

    /// Whether [`Barrier::lift`] has been called.
    pub fn is_lifted(&self) -> bool {
        *self.lifted.borrow()
    }

    /// Waits until the barrier is lifted or a deadline elapses.
    ///
    /// The effective deadline is the earliest of `now + timeout` and the
    /// construction deadline. Without either, waits until lifted.
    pub async fn wait_once(&self, timeout: Option<Duration>) -> WaitResult {
        if self.is_lifted() {
            return WaitResult::Pass;
        }

        let now = Instant::now();
        if self.deadline_elapsed(now) {
            return WaitResult::Expired;
        }
        let call_deadline = timeout.map(|timeout| now + timeout);
        if call_deadline.is_some_and(|deadline| deadline <= now) {
            return WaitResult::Timeout;
        }

        let mut rx = self.lifted.subscribe();
        let lifted = rx.wait_for(|lifted| *lifted);
        let deadline = match (call_deadline, self.deadline) {
            (Some(call), Some(own)) => Some(call.min(own)),
            (call, own) => call.or(own),
        };
        let Some(deadline) = deadline else {
            // The sender lives in `self`, so the channel cannot close under us.
            let _ = lifted.await;
            return WaitResult::Lift;
        };

        let woken = timeout_at(deadline, lifted).await.is_ok();
        if woken || self.is_lifted() {
            WaitResult::Lift
        } else if self.deadline_elapsed(Instant::now()) {
            WaitResult::Expired
        } else {
            WaitResult::Timeout
        }
    }

    fn deadline_elapsed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// Lifts the barrier when dropped, whatever way the holder's scope ends.
pub(crate) struct LiftOnDrop<'a>(pub(crate) &'a Barrier);

impl Drop for LiftOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lift();
    }
}
