//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use submission_core::catalog::FileSchemaCatalog;
use submission_core::memory::MemoryStore;
use submission_core::models::{SchemaProperty, SemanticType};
use submission_core::ports::SearchIndexer;
use submission_core::{CoreConfig, FeatureNodeInput, Stores, SubmissionCore};

/// Indexer that forwards every reindex signal to a channel.
pub struct ChannelIndexer {
    tx: mpsc::UnboundedSender<i64>,
}

impl ChannelIndexer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl SearchIndexer for ChannelIndexer {
    async fn reindex_submission(&self, submission_id: i64) -> submission_core::Result<()> {
        let _ = self.tx.send(submission_id);
        Ok(())
    }
}

pub fn catalog() -> FileSchemaCatalog {
    FileSchemaCatalog::default()
        .with_feature_type(
            "dataset",
            vec![
                SchemaProperty::new("name", SemanticType::String, true),
                SchemaProperty::new("start_date", SemanticType::Datetime, true),
            ],
        )
        .with_feature_type(
            "sample_site",
            vec![SchemaProperty::new("location", SemanticType::Spatial, true)],
        )
        .with_feature_type(
            "observation",
            vec![SchemaProperty::new("count", SemanticType::Number, true)],
        )
}

pub struct Harness {
    pub store: MemoryStore,
    pub core: SubmissionCore,
    pub reindexed: mpsc::UnboundedReceiver<i64>,
}

pub fn harness() -> Harness {
    harness_with(CoreConfig::default())
}

pub fn harness_with(config: CoreConfig) -> Harness {
    let store = MemoryStore::new();
    let (indexer, reindexed) = ChannelIndexer::new();
    let stores = Stores::memory(store.clone(), Arc::new(catalog()), indexer);
    Harness {
        store,
        core: SubmissionCore::new(stores, &config),
        reindexed,
    }
}

pub fn site_location() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [-123.37, 48.42] },
            "properties": {}
        }]
    })
}

/// dataset > sample_site > two observations
pub fn valid_submission() -> FeatureNodeInput {
    FeatureNodeInput::new("ds-1", "dataset")
        .with_property("name", json!("Moose survey 2024"))
        .with_property("start_date", json!("2024-01-15"))
        .with_child(
            FeatureNodeInput::new("site-1", "sample_site")
                .with_property("location", site_location())
                .with_child(
                    FeatureNodeInput::new("obs-1", "observation").with_property("count", json!(3)),
                )
                .with_child(
                    FeatureNodeInput::new("obs-2", "observation").with_property("count", json!(5)),
                ),
        )
}
