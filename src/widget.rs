//! The scene-tracking widget.
//!
//! Binds a stream of map and date-picker events to the store: every pointer
//! move or date pick updates the view state and starts a fetch. Fetches run
//! concurrently; the store keeps only the newest result.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::client::ImageryCatalog;
use crate::config::WidgetConfig;
use crate::errors::ScenetrackError;
use crate::fetcher::ImageryFetcher;
use crate::models::Coordinate;
use crate::state::{Action, ErrorPolicy, ViewState};
use crate::store::Store;

/// Input from the map surface or the date selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    PointerMoved(Coordinate),
    DateSelected(NaiveDate),
}

impl UiEvent {
    /// Parse one line of textual input.
    ///
    /// Accepts `lat,lng` for a pointer move and `date YYYY-MM-DD` for a date
    /// pick. Blank lines and `#` comments yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is neither form.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ScenetrackError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        if let Some(date) = line.strip_prefix("date") {
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
                ScenetrackError::InvalidDate(format!("'{}': {e}", date.trim()))
            })?;
            return Ok(Some(Self::DateSelected(date)));
        }

        line.parse::<Coordinate>().map(|c| Some(Self::PointerMoved(c)))
    }
}

/// Feed textual events from `reader` into `events` until input ends.
///
/// Lines that parse to nothing are skipped; malformed lines are logged and
/// skipped. Stops early if the receiving side has gone away.
pub async fn forward_lines<R>(reader: R, events: mpsc::Sender<UiEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match UiEvent::parse_line(&line) {
                Ok(Some(event)) => {
                    if events.send(event).await.is_err() {
                        debug!("widget detached, stopping input");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("skipping input line: {}", e),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("input read failed: {}", e);
                break;
            }
        }
    }
}

#[derive(Clone)]
pub struct Widget {
    store: Arc<Store>,
    fetcher: ImageryFetcher,
}

impl Widget {
    #[must_use]
    pub fn new(config: &WidgetConfig, catalog: Arc<dyn ImageryCatalog>) -> Self {
        Self::with_state(
            ViewState::new(config.initial_cursor, chrono::Utc::now().date_naive()),
            ErrorPolicy::from_clear_flag(config.clear_imagery_on_error),
            catalog,
            config.bbox_padding,
        )
    }

    #[must_use]
    pub fn with_state(
        initial: ViewState,
        policy: ErrorPolicy,
        catalog: Arc<dyn ImageryCatalog>,
        padding: f64,
    ) -> Self {
        Self {
            store: Arc::new(Store::new(initial, policy)),
            fetcher: ImageryFetcher::new(catalog, padding),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Apply an event and start the fetch it triggers.
    ///
    /// The state update and request token are issued before this returns, so
    /// tokens follow event order even if the fetches complete out of order.
    pub fn apply(&self, event: UiEvent) -> impl Future<Output = ()> + Send + use<> {
        match event {
            UiEvent::PointerMoved(cursor) => {
                self.store.dispatch(Action::CursorMoved(cursor));
            }
            UiEvent::DateSelected(date) => {
                info!("date selected: {date}");
                self.store.dispatch(Action::DateSelected(date));
            }
        }
        self.refresh()
    }

    /// Start a fetch for the current state without changing it.
    pub fn refresh(&self) -> impl Future<Output = ()> + Send + use<> {
        self.fetcher.begin(&self.store)
    }

    /// Subscribe to an event stream.
    ///
    /// Fetches once for the starting state, then once per event. The returned
    /// [`Subscription`] ends handling when detached or dropped.
    pub fn attach<S>(&self, mut events: S) -> Subscription
    where
        S: Stream<Item = UiEvent> + Send + Unpin + 'static,
    {
        let widget = self.clone();
        let task = tokio::spawn(async move {
            let mut fetches = JoinSet::new();
            fetches.spawn(widget.refresh());

            while let Some(event) = events.next().await {
                fetches.spawn(widget.apply(event));
                while let Some(done) = fetches.try_join_next() {
                    log_join(done);
                }
            }

            debug!("event stream closed, waiting for {} fetches", fetches.len());
            while let Some(done) = fetches.join_next().await {
                log_join(done);
            }
        });

        info!("widget attached");
        Subscription { task: Some(task) }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if !e.is_cancelled() {
            warn!("fetch task failed: {e}");
        }
    }
}

/// Handle on an attached widget.
///
/// Dropping it detaches the widget and abandons in-flight fetches.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop handling events now.
    pub fn detach(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("widget detached");
        }
    }

    /// Wait until the event stream ends and every fetch has completed.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log_join(Err(e));
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
