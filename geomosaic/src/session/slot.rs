//! Superseding fetch slots.
//!
//! Every asynchronous fetch runs under a [`FetchTicket`] issued by the
//! [`FetchSlot`] for its logical purpose. The ticket carries a generation
//! number and a cancellation token. When the result comes back, the slot
//! decides whether it may still be applied.

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// How a slot treats concurrent fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMode {
    /// A new fetch cancels and supersedes the previous one.
    Latest,
    /// Fetches accumulate; only [`FetchSlot::cancel`] invalidates them.
    All,
}

/// Authorization to apply one fetch result.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    slot: &'static str,
    generation: u64,
    token: CancellationToken,
}

impl FetchTicket {
    pub fn slot(&self) -> &'static str {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token the fetch must observe.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug)]
pub struct FetchSlot {
    name: &'static str,
    mode: SlotMode,
    parent: CancellationToken,
    scope: CancellationToken,
    issued: u64,
    /// Tickets below this generation are stale.
    floor: u64,
}

impl FetchSlot {
    /// Creates a slot whose tokens are children of `parent`.
    pub fn new(name: &'static str, mode: SlotMode, parent: &CancellationToken) -> Self {
        Self {
            name,
            mode,
            parent: parent.clone(),
            scope: parent.child_token(),
            issued: 0,
            floor: 1,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Generation of the most recently issued ticket (0 before any).
    pub fn generation(&self) -> u64 {
        self.issued
    }

    /// Issues a ticket for a new fetch. In [`SlotMode::Latest`] the
    /// previous fetch is cancelled first.
    pub fn begin(&mut self) -> FetchTicket {
        if self.mode == SlotMode::Latest {
            self.reset_scope();
        }
        self.issued += 1;
        if self.mode == SlotMode::Latest {
            self.floor = self.issued;
        }
        trace!(slot = self.name, generation = self.issued, "Fetch ticket issued");

        FetchTicket {
            slot: self.name,
            generation: self.issued,
            token: self.scope.child_token(),
        }
    }

    /// True when a result carried by `ticket` may still be applied.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.slot == self.name
            && ticket.generation >= self.floor
            && ticket.generation <= self.issued
            && !ticket.token.is_cancelled()
    }

    /// Passes `value` through if `ticket` is current.
    pub fn accept<T>(&self, ticket: &FetchTicket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }

    /// Cancels every outstanding fetch and makes their tickets stale.
    pub fn cancel(&mut self) {
        self.reset_scope();
        self.floor = self.issued + 1;
    }

    fn reset_scope(&mut self) {
        self.scope.cancel();
        self.scope = self.parent.child_token();
    }
}
