//! The services of this crate wired to one set of stores.

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::intake::SubmissionIntakeService;
use crate::memory::MemoryStore;
use crate::ports::{
    ExceptionStore, FeatureStore, ReviewStore, SchemaCatalog, SearchIndexer, SecurityStore,
};
use crate::schema_cache::SchemaCache;
use crate::security::{ExceptionResolver, SecurityClassifier, SecurityRuleService};
use crate::validation::ValidationEngine;

/// Port implementations the services are built from.
pub struct Stores {
    pub catalog: Arc<dyn SchemaCatalog>,
    pub features: Arc<dyn FeatureStore>,
    pub security: Arc<dyn SecurityStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub exceptions: Arc<dyn ExceptionStore>,
    pub indexer: Arc<dyn SearchIndexer>,
}

impl Stores {
    /// Every store backed by one `MemoryStore`.
    pub fn memory(
        store: MemoryStore,
        catalog: Arc<dyn SchemaCatalog>,
        indexer: Arc<dyn SearchIndexer>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            catalog,
            features: store.clone(),
            security: store.clone(),
            reviews: store.clone(),
            exceptions: store,
            indexer,
        }
    }
}

#[derive(Clone)]
pub struct SubmissionCore {
    pub intake: SubmissionIntakeService,
    pub security: SecurityRuleService,
    pub classifier: SecurityClassifier,
    pub exceptions: ExceptionResolver,
}

impl SubmissionCore {
    pub fn new(stores: Stores, config: &CoreConfig) -> Self {
        let validator = ValidationEngine::new(Arc::new(SchemaCache::new(stores.catalog)));

        Self {
            intake: SubmissionIntakeService::new(
                validator,
                stores.features,
                stores.indexer,
                config.reindex_on_ingest,
            ),
            security: SecurityRuleService::new(stores.security, config),
            classifier: SecurityClassifier::new(stores.reviews),
            exceptions: ExceptionResolver::new(stores.exceptions),
        }
    }
}
