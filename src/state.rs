//! View state and its reducer.
//!
//! State is never mutated in place: every event becomes an [`Action`] and
//! [`ViewState::reduce`] returns the next state.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Coordinate, Imagery};

/// Monotonic tag for one fetch. Zero means "no fetch issued yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happens to the last found scene when a fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Leave the previous scene displayed next to the error
    #[default]
    KeepImagery,
    /// Clear the scene, matching the empty-result path
    ClearImagery,
}

impl ErrorPolicy {
    #[must_use]
    pub fn from_clear_flag(clear: bool) -> Self {
        if clear {
            Self::ClearImagery
        } else {
            Self::KeepImagery
        }
    }
}

/// One state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CursorMoved(Coordinate),
    DateSelected(NaiveDate),
    FetchStarted(RequestId),
    /// `None` means the catalog had no scene for the query
    FetchSucceeded(RequestId, Option<Imagery>),
    FetchFailed(RequestId, String),
    /// The fetch ended without a result (task cancelled or panicked)
    FetchAbandoned(RequestId),
}

/// Everything the widget renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub cursor: Coordinate,
    pub imagery: Option<Imagery>,
    pub selected_date: NaiveDate,
    pub loading: bool,
    pub error: Option<String>,
    pub latest_request: RequestId,
}

impl ViewState {
    #[must_use]
    pub fn new(cursor: Coordinate, selected_date: NaiveDate) -> Self {
        Self {
            cursor,
            imagery: None,
            selected_date,
            loading: false,
            error: None,
            latest_request: RequestId::default(),
        }
    }

    /// True while `request` is the newest fetch and has not finished.
    #[must_use]
    pub fn is_pending(&self, request: RequestId) -> bool {
        self.loading && request == self.latest_request
    }

    /// Apply one action.
    ///
    /// Completions for anything but the newest pending request are dropped,
    /// so a slow earlier response never overwrites a newer one.
    #[must_use]
    pub fn reduce(self, action: Action, policy: ErrorPolicy) -> Self {
        match action {
            Action::CursorMoved(cursor) => Self { cursor, ..self },
            Action::DateSelected(selected_date) => Self {
                selected_date,
                ..self
            },
            Action::FetchStarted(request) if request > self.latest_request => Self {
                latest_request: request,
                loading: true,
                error: None,
                ..self
            },
            Action::FetchSucceeded(request, imagery) if self.is_pending(request) => Self {
                imagery,
                loading: false,
                ..self
            },
            Action::FetchFailed(request, message) if self.is_pending(request) => {
                let imagery = match policy {
                    ErrorPolicy::KeepImagery => self.imagery,
                    ErrorPolicy::ClearImagery => None,
                };
                Self {
                    imagery,
                    loading: false,
                    error: Some(message),
                    ..self
                }
            }
            Action::FetchAbandoned(request) if self.is_pending(request) => Self {
                loading: false,
                ..self
            },
            // Stale or duplicate request tags
            Action::FetchStarted(_)
            | Action::FetchSucceeded(..)
            | Action::FetchFailed(..)
            | Action::FetchAbandoned(_) => self,
        }
    }
}
