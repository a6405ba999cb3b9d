//! In-memory catalog for widget and server tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::client::ImageryCatalog;
use crate::errors::ScenetrackError;
use crate::models::{Coordinate, ImageryFeature, ItemCollection};
use crate::query::SearchQuery;

/// Canned answer for queries whose box contains a coordinate.
#[derive(Clone)]
pub enum Reply {
    Scene { lng: f64, lat: f64 },
    Empty,
    Fail,
}

struct Rule {
    near: Coordinate,
    reply: Reply,
    gate: Option<Arc<Notify>>,
}

/// Catalog that answers from rules and records every query.
#[derive(Default)]
pub struct FakeCatalog {
    rules: Mutex<Vec<Rule>>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer queries around `near` with `reply`.
    pub fn on(&self, near: Coordinate, reply: Reply) {
        self.push(near, reply, None);
    }

    /// Like [`FakeCatalog::on`], but hold the answer until the returned gate is notified.
    pub fn on_gated(&self, near: Coordinate, reply: Reply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(near, reply, Some(Arc::clone(&gate)));
        gate
    }

    fn push(&self, near: Coordinate, reply: Reply, gate: Option<Arc<Notify>>) {
        self.rules.lock().unwrap().push(Rule { near, reply, gate });
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn scene_json(lng: f64, lat: f64) -> Value {
    json!({
        "type": "Feature",
        "id": format!("scene-{lat}-{lng}"),
        "geometry": {"type": "Point", "coordinates": [lng, lat]},
        "properties": {"datetime": "2024-03-01T18:42:10Z"}
    })
}

#[async_trait]
impl ImageryCatalog for FakeCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<ItemCollection, ScenetrackError> {
        self.queries.lock().unwrap().push(*query);

        let matched = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| query.bbox.contains(rule.near))
            .map(|rule| (rule.reply.clone(), rule.gate.clone()));
        let (reply, gate) = matched.unwrap_or((Reply::Empty, None));

        if let Some(gate) = gate {
            gate.notified().await;
        }

        match reply {
            Reply::Scene { lng, lat } => Ok(ItemCollection {
                type_: Some("FeatureCollection".into()),
                features: vec![ImageryFeature::new(scene_json(lng, lat))],
            }),
            Reply::Empty => Ok(ItemCollection {
                type_: Some("FeatureCollection".into()),
                features: Vec::new(),
            }),
            Reply::Fail => Err(ScenetrackError::Api {
                status: 503,
                message: "scripted failure".into(),
            }),
        }
    }
}
