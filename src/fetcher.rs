//! Imagery fetcher.
//!
//! Turns the current cursor and date into one catalog search and reports the
//! outcome back to the store under a request token.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::client::ImageryCatalog;
use crate::errors::ScenetrackError;
use crate::models::{Coordinate, Imagery};
use crate::query::SearchQuery;
use crate::state::{Action, RequestId};
use crate::store::Store;

/// User-facing message for every kind of fetch failure.
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching Landsat data";

/// Search the catalog for the first scene around `center` on `date`.
///
/// Returns `Ok(None)` when the catalog has no scene for the query.
///
/// # Errors
///
/// Returns an error if the search fails or the first feature has no position.
pub async fn fetch_imagery(
    catalog: &dyn ImageryCatalog,
    date: NaiveDate,
    center: Coordinate,
    padding: f64,
) -> Result<Option<Imagery>, ScenetrackError> {
    let query = SearchQuery::new(date, center, padding);
    let collection = catalog.search(&query).await?;

    let Some(feature) = collection.features.into_iter().next() else {
        return Ok(None);
    };

    let imagery = Imagery::try_from(feature)?;
    if !query.bbox.contains(imagery.coordinate) {
        debug!(
            "scene footprint starts outside the search box at {}",
            imagery.coordinate
        );
    }
    Ok(Some(imagery))
}

/// Marks the store as loading for as long as it lives.
///
/// Finish it with [`LoadingGuard::succeed`] or [`LoadingGuard::fail`];
/// dropping it unfinished reports the request as abandoned.
#[derive(Debug)]
pub struct LoadingGuard {
    store: Arc<Store>,
    request: RequestId,
    finished: bool,
}

impl LoadingGuard {
    /// Issue a new request token and start loading.
    #[must_use]
    pub fn acquire(store: Arc<Store>) -> Self {
        let request = store.next_request();
        store.dispatch(Action::FetchStarted(request));
        Self {
            store,
            request,
            finished: false,
        }
    }

    #[must_use]
    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn succeed(mut self, imagery: Option<Imagery>) {
        self.finished = true;
        self.store
            .dispatch(Action::FetchSucceeded(self.request, imagery));
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.finished = true;
        self.store
            .dispatch(Action::FetchFailed(self.request, message.into()));
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!(request = %self.request, "fetch abandoned");
            self.store.dispatch(Action::FetchAbandoned(self.request));
        }
    }
}

/// Issues fetches against one catalog.
#[derive(Clone)]
pub struct ImageryFetcher {
    catalog: Arc<dyn ImageryCatalog>,
    padding: f64,
}

impl ImageryFetcher {
    #[must_use]
    pub fn new(catalog: Arc<dyn ImageryCatalog>, padding: f64) -> Self {
        Self { catalog, padding }
    }

    /// Start a fetch for the store's current cursor and date.
    ///
    /// The request token and query inputs are taken now; the returned future
    /// performs the search and reports the result.
    pub fn begin(&self, store: &Arc<Store>) -> impl Future<Output = ()> + Send + use<> {
        let guard = LoadingGuard::acquire(Arc::clone(store));
        let state = store.snapshot();
        let catalog = Arc::clone(&self.catalog);
        let padding = self.padding;

        debug!(
            request = %guard.request(),
            "fetching scene near {} on {}",
            state.cursor,
            state.selected_date
        );

        async move {
            match fetch_imagery(catalog.as_ref(), state.selected_date, state.cursor, padding).await {
                Ok(imagery) => guard.succeed(imagery),
                Err(e) => {
                    error!(request = %guard.request(), "{FETCH_ERROR_MESSAGE}: {e}");
                    guard.fail(FETCH_ERROR_MESSAGE);
                }
            }
        }
    }
}
