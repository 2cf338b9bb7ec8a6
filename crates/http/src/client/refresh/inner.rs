//! Refresh-in-progress flag and pending request queue

use std::collections::VecDeque;

/// What the coordinator should do with a newly admitted waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No refresh was running; the caller must start one
    Start,
    /// A refresh is running; the waiter was queued behind it
    Queued,
}

/// Waiters released when a refresh settles
#[derive(Debug)]
pub struct Settlement<W> {
    /// Queued waiters in arrival order
    pub pending: Vec<W>,
    /// The waiter whose 401 started the refresh
    pub initiator: Option<W>,
}

/// Single-flight state: at most one refresh, everyone else waits in line
#[derive(Debug)]
pub struct RefreshQueue<W> {
    initiator: Option<W>,
    in_progress: bool,
    pending: VecDeque<W>,
}

impl<W> Default for RefreshQueue<W> {
    fn default() -> Self {
        Self {
            initiator: None,
            in_progress: false,
            pending: VecDeque::new(),
        }
    }
}

impl<W> RefreshQueue<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_progress
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Admit a waiter, starting a refresh if none is running
    pub fn admit(&mut self, waiter: W) -> Admission {
        if self.in_progress {
            self.pending.push_back(waiter);
            Admission::Queued
        } else {
            self.in_progress = true;
            self.initiator = Some(waiter);
            Admission::Start
        }
    }

    /// Clear the flag and hand back every waiter
    pub fn settle(&mut self) -> Settlement<W> {
        self.in_progress = false;
        Settlement {
            pending: self.pending.drain(..).collect(),
            initiator: self.initiator.take(),
        }
    }
}
