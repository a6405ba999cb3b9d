//! Shared state container.
//!
//! Holds the current [`ViewState`] in a `watch` channel so renderers can
//! observe every change, and hands out request-sequence tokens.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::trace;

use crate::state::{Action, ErrorPolicy, RequestId, ViewState};

#[derive(Debug)]
pub struct Store {
    tx: watch::Sender<ViewState>,
    next_request: AtomicU64,
    policy: ErrorPolicy,
}

impl Store {
    #[must_use]
    pub fn new(initial: ViewState, policy: ErrorPolicy) -> Self {
        let next = initial.latest_request.0 + 1;
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            next_request: AtomicU64::new(next),
            policy,
        }
    }

    /// Reduce `action` into the current state.
    ///
    /// Returns `true` if the state changed; observers are only woken then.
    pub fn dispatch(&self, action: Action) -> bool {
        trace!(?action, "dispatch");
        self.tx.send_if_modified(|state| {
            let next = state.clone().reduce(action, self.policy);
            if next == *state {
                false
            } else {
                *state = next;
                true
            }
        })
    }

    /// Issue the next request token. Tokens strictly increase.
    pub fn next_request(&self) -> RequestId {
        RequestId(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    /// Observe state changes. The receiver starts with the current state seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }
}
