//! Fair single-flight admission for script runs.
//!
//! Callers line up in FIFO order and exactly one of them holds a [`Ticket`]
//! at any time. Dropping the ticket hands the execution right directly to
//! the next live waiter, so release happens on every exit path, including
//! `?` returns and panics.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::error::QueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketId(u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    active: Option<TicketId>,
    waiters: VecDeque<Waiter>,
}

struct Waiter {
    id: TicketId,
    enqueued_at: DateTime<Utc>,
    tx: oneshot::Sender<Ticket>,
}

type Shared = Arc<Mutex<QueueState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, QueueState> {
    // No critical section below can panic, so a poisoned lock still holds
    // consistent state.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── ExecutionQueue ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ExecutionQueue {
    state: Shared,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until this caller is at the head of the line.
    ///
    /// Dropping the returned future before it resolves withdraws the caller;
    /// the slot is skipped at the next hand-off.
    pub async fn acquire(&self) -> Result<Ticket, QueueError> {
        let rx = {
            let mut state = lock(&self.state);
            state.next_id += 1;
            let id = TicketId(state.next_id);
            let enqueued_at = Utc::now();

            if state.active.is_none() && state.waiters.is_empty() {
                state.active = Some(id);
                return Ok(Ticket::admit(id, enqueued_at, Arc::clone(&self.state)));
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(Waiter {
                id,
                enqueued_at,
                tx,
            });
            rx
        };
        rx.await.map_err(|_| QueueError::Closed)
    }

    /// Bounded-wait variant of [`ExecutionQueue::acquire`].
    pub async fn acquire_timeout(&self, limit: Duration) -> Result<Ticket, QueueError> {
        tokio::time::timeout(limit, self.acquire())
            .await
            .map_err(|_| QueueError::Timeout)?
    }

    /// Give up the execution right. Equivalent to dropping the ticket.
    pub fn release(ticket: Ticket) {
        drop(ticket);
    }

    /// Callers still waiting for their turn.
    pub fn waiting(&self) -> usize {
        lock(&self.state)
            .waiters
            .iter()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).active.is_some()
    }
}

// ─── Ticket ───────────────────────────────────────────────────────────────

/// The right to run exactly one script. Released on drop.
pub struct Ticket {
    id: TicketId,
    enqueued_at: DateTime<Utc>,
    admitted_at: DateTime<Utc>,
    state: Shared,
    armed: bool,
}

impl Ticket {
    fn admit(id: TicketId, enqueued_at: DateTime<Utc>, state: Shared) -> Self {
        Self {
            id,
            enqueued_at,
            admitted_at: Utc::now(),
            state,
            armed: true,
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn admitted_at(&self) -> DateTime<Utc> {
        self.admitted_at
    }

    /// Time spent in line before admission.
    pub fn waited(&self) -> chrono::Duration {
        self.admitted_at - self.enqueued_at
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .field("admitted_at", &self.admitted_at)
            .finish()
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock(&self.state);
        while let Some(waiter) = state.waiters.pop_front() {
            state.active = Some(waiter.id);
            let ticket = Ticket::admit(waiter.id, waiter.enqueued_at, Arc::clone(&self.state));
            match waiter.tx.send(ticket) {
                Ok(()) => return,
                Err(mut unclaimed) => {
                    // The waiter went away; dropping this copy must not
                    // re-enter the lock we are holding.
                    unclaimed.armed = false;
                }
            }
        }
        state.active = None;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
