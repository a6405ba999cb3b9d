//! STAC imagery catalog client.
//!
//! Provides async HTTP access to a STAC item search endpoint.
//! Uses reqwest with rustls for TLS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::WidgetConfig;
use crate::errors::ScenetrackError;
use crate::models::ItemCollection;
use crate::query::SearchQuery;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("scenetrack/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an `Api` error.
const MAX_ERROR_BODY: usize = 512;

/// Anything that can answer an imagery search.
#[async_trait]
pub trait ImageryCatalog: Send + Sync {
    /// Run one search and return the raw response.
    async fn search(&self, query: &SearchQuery) -> Result<ItemCollection, ScenetrackError>;
}

/// Client for a STAC `/items` search endpoint.
#[derive(Debug, Clone)]
pub struct StacClient {
    client: Client,
    endpoint: String,
}

impl StacClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ScenetrackError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client for the configured endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_config(config: &WidgetConfig) -> Result<Self, ScenetrackError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl ImageryCatalog for StacClient {
    #[instrument(skip(self), fields(bbox = %query.bbox, datetime = %query.datetime))]
    async fn search(&self, query: &SearchQuery) -> Result<ItemCollection, ScenetrackError> {
        debug!("searching {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .send()
            .await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ScenetrackError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        let collection: ItemCollection = serde_json::from_slice(&bytes)?;

        // Validate response structure
        collection.validate()?;

        debug!("catalog returned {} features", collection.features.len());
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use super::*;
    use crate::models::Coordinate;
    use crate::query::DEFAULT_PADDING_DEG;

    type Seen = Arc<Mutex<Option<HashMap<String, String>>>>;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/items")
    }

    fn query() -> SearchQuery {
        SearchQuery::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            Coordinate::new(37.77, -122.42).unwrap(),
            DEFAULT_PADDING_DEG,
        )
    }

    #[tokio::test]
    async fn test_search_sends_stac_params() {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route(
                "/items",
                get(
                    |State(seen): State<Seen>, Query(params): Query<HashMap<String, String>>| async move {
                        *seen.lock().unwrap() = Some(params);
                        Json(json!({
                            "type": "FeatureCollection",
                            "features": [{
                                "id": "scene-1",
                                "geometry": {"type": "Point", "coordinates": [-122.0, 37.0]},
                                "properties": {}
                            }]
                        }))
                    },
                ),
            )
            .with_state(seen.clone());

        let client = StacClient::new(serve(router).await, Duration::from_secs(5)).unwrap();
        let collection = client.search(&query()).await.unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].id(), Some("scene-1"));

        let params = seen.lock().unwrap().clone().unwrap();
        assert_eq!(params["datetime"], "2024-03-01T00:00:00Z/2024-03-01T23:59:59Z");
        assert_eq!(params["bbox"], "-123.42,36.77,-121.42,38.77");
        assert_eq!(params["limit"], "1");
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let router = Router::new().route(
            "/items",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );

        let client = StacClient::new(serve(router).await, Duration::from_secs(5)).unwrap();
        let err = client.search(&query()).await.unwrap_err();
        match err {
            ScenetrackError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_parse_error() {
        let router = Router::new().route(
            "/items",
            get(|| async { Json::<Value>(json!({"results": []})) }),
        );

        let client = StacClient::new(serve(router).await, Duration::from_secs(5)).unwrap();
        let err = client.search(&query()).await.unwrap_err();
        assert!(matches!(err, ScenetrackError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            StacClient::new(format!("http://{addr}/items"), Duration::from_secs(2)).unwrap();
        let err = client.search(&query()).await.unwrap_err();
        assert!(matches!(err, ScenetrackError::Http(_)));
    }
}
