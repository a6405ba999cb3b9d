//! Web server for the scenetrack UI.
//!
//! Provides the interactive widget in the browser using:
//! - Axum for HTTP server
//! - Leaflet for the map surface, posting pointer moves back to the server
//! - SSE (Server-Sent Events) pushing every view-state change to the page

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{ReceiverStream, WatchStream};

use crate::client::StacClient;
use crate::config::WidgetConfig;
use crate::models::Coordinate;
use crate::state::ViewState;
use crate::widget::{Subscription, UiEvent, Widget};

/// Pending UI events before handlers wait for the widget.
const EVENT_BUFFER: usize = 256;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub widget: WidgetConfig,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    widget: Widget,
    /// Map and date-picker events for the attached widget
    events: mpsc::Sender<UiEvent>,
    /// Index page with config baked in
    page: Arc<String>,
}

impl AppState {
    /// Attach `widget` to a fresh event channel.
    ///
    /// The widget stops handling events when the returned subscription drops.
    #[must_use]
    pub fn new(widget: Widget, config: &WidgetConfig) -> (Self, Subscription) {
        let page = Arc::new(render_index(config, &widget.store().snapshot()));
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let subscription = widget.attach(ReceiverStream::new(rx));
        (
            Self {
                widget,
                events,
                page,
            },
            subscription,
        )
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/state", get(state_handler))
        .route("/cursor", post(cursor_handler))
        .route("/date", post(date_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let catalog = Arc::new(StacClient::from_config(&config.widget)?);
    let widget = Widget::new(&config.widget, catalog);
    let (state, subscription) = AppState::new(widget, &config.widget);

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🛰 scenetrack UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    subscription.detach();
    Ok(())
}

/// Fill the page template with the map settings and starting state.
fn render_index(config: &WidgetConfig, initial: &ViewState) -> String {
    // Inserted as a JS string literal; `<` escaped so it cannot close the script
    let tile_url = serde_json::Value::from(config.tile_url.as_str())
        .to_string()
        .replace('<', "\\u003c");
    INDEX_HTML
        .replace("__TILE_URL__", &tile_url)
        .replace("__LAT__", &initial.cursor.latitude.to_string())
        .replace("__LNG__", &initial.cursor.longitude.to_string())
        .replace("__ZOOM__", &config.zoom.to_string())
        .replace("__DATE__", &initial.selected_date.to_string())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the widget.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_ref().clone())
}

/// SSE stream handler; sends the current state, then every change.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.widget.store().subscribe();
    let stream = WatchStream::new(rx).filter_map(|snapshot| {
        match Event::default().event("state").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("failed to encode state event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Current view state as JSON.
async fn state_handler(State(state): State<AppState>) -> Json<ViewState> {
    Json(state.widget.store().snapshot())
}

/// Pointer moved over the map.
async fn cursor_handler(
    State(state): State<AppState>,
    Json(cursor): Json<Coordinate>,
) -> StatusCode {
    if let Err(e) = cursor.validate() {
        tracing::warn!("rejected cursor: {}", e);
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    forward(&state, UiEvent::PointerMoved(cursor)).await
}

#[derive(Debug, Deserialize)]
struct DateRequest {
    date: NaiveDate,
}

/// Date picked in the date selector.
async fn date_handler(State(state): State<AppState>, Json(body): Json<DateRequest>) -> StatusCode {
    forward(&state, UiEvent::DateSelected(body.date)).await
}

async fn forward(state: &AppState, event: UiEvent) -> StatusCode {
    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => {
            tracing::warn!("widget detached, dropping {:?}", event);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>scenetrack — Landsat 9 Data Viewer</title>

    <!-- Leaflet -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>

    <style>
        :root {
            --font: -apple-system, BlinkMacSystemFont, 'Inter', sans-serif;
            --bg-primary: #09090b;
            --bg-elevated: #1c1c1f;
            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --border: #27272a;
            --accent: #818cf8;
            --warning: #f59e0b;
            --danger: #ef4444;
            --radius-md: 10px;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
        }

        header {
            display: flex;
            align-items: center;
            gap: 24px;
            padding: 12px 20px;
            border-bottom: 1px solid var(--border);
        }

        header h2 { font-size: 18px; font-weight: 600; }

        .date-picker label { color: var(--text-secondary); margin-right: 8px; }

        .date-picker input {
            background: var(--bg-elevated);
            color: var(--text-primary);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 4px 8px;
        }

        #map { height: calc(100vh - 57px); width: 100vw; }

        .panel {
            position: absolute;
            right: 16px;
            bottom: 16px;
            z-index: 1000;
            max-width: 420px;
            max-height: 60vh;
            overflow: auto;
            background: var(--bg-elevated);
            border: 1px solid var(--border);
            border-radius: var(--radius-md);
            padding: 12px 16px;
            font-size: 13px;
        }

        .loading { color: var(--warning); }
        .error { color: var(--danger); }
        .coords { color: var(--text-secondary); font-variant-numeric: tabular-nums; }
        summary { cursor: pointer; color: var(--accent); margin-top: 8px; }
        pre { margin-top: 8px; font-size: 11px; white-space: pre-wrap; word-break: break-all; }
        [hidden] { display: none !important; }
    </style>
</head>
<body>
    <header>
        <h2>Landsat 9 Data Viewer</h2>
        <div class="date-picker">
            <label for="date">Select Date:</label>
            <input type="date" id="date" value="__DATE__">
        </div>
    </header>

    <div id="map"></div>

    <div class="panel">
        <div class="coords" id="cursor"></div>
        <p class="loading" id="loading" hidden>Loading...</p>
        <p class="error" id="error" hidden></p>
        <details id="details" hidden>
            <summary id="details-title"></summary>
            <pre id="details-json"></pre>
        </details>
    </div>

    <script>
    (function() {
        var map = L.map('map').setView([__LAT__, __LNG__], __ZOOM__);
        L.tileLayer(__TILE_URL__).addTo(map);

        var cursorMarker = L.marker([__LAT__, __LNG__]).addTo(map).bindPopup('Mouse Location');
        var sceneMarker = null;

        function post(path, body) {
            fetch(path, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body)
            });
        }

        // Leaflet reports unwrapped longitudes once the map is panned past 180
        map.on('mousemove', function(e) {
            var ll = e.latlng.wrap();
            post('/cursor', { lat: ll.lat, lng: ll.lng });
        });

        document.getElementById('date').addEventListener('change', function(e) {
            if (e.target.value) post('/date', { date: e.target.value });
        });

        function render(state) {
            cursorMarker.setLatLng([state.cursor.lat, state.cursor.lng]);
            document.getElementById('cursor').textContent =
                'Cursor ' + state.cursor.lat.toFixed(4) + ', ' + state.cursor.lng.toFixed(4);

            if (state.imagery) {
                var pos = [state.imagery.coordinate.lat, state.imagery.coordinate.lng];
                if (!sceneMarker) {
                    sceneMarker = L.marker(pos).addTo(map).bindPopup('Landsat Position');
                } else {
                    sceneMarker.setLatLng(pos);
                }
            } else if (sceneMarker) {
                map.removeLayer(sceneMarker);
                sceneMarker = null;
            }

            document.getElementById('loading').hidden = !state.loading;

            var error = document.getElementById('error');
            error.hidden = !state.error;
            error.textContent = state.error || '';

            var details = document.getElementById('details');
            details.hidden = !state.imagery;
            if (state.imagery) {
                var day = new Date(state.selected_date + 'T00:00:00');
                document.getElementById('details-title').textContent =
                    'Landsat Data on ' + day.toDateString();
                document.getElementById('details-json').textContent =
                    JSON.stringify(state.imagery.feature, null, 2);
            }
        }

        var source = new EventSource('/stream');
        source.addEventListener('state', function(e) {
            render(JSON.parse(e.data));
        });
    })();
    </script>
</body>
</html>
"##;
