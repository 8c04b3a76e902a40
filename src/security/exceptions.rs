//! Per-user persecution/harm exceptions.
//!
//! A user holding an active exception for a rule may see data restricted only
//! by that rule. A node stays redacted for the user while any of its rules is
//! not covered by an exception.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::models::{NodeSecurity, PersecutionHarmRule};
use crate::ports::ExceptionStore;

/// Node ids split by whether a particular user may see them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Visibility {
    pub visible: Vec<i64>,
    pub redacted: Vec<i64>,
}

pub fn is_visible(node_rule_ids: &[i64], exceptions: &BTreeSet<i64>) -> bool {
    node_rule_ids.iter().all(|rule_id| exceptions.contains(rule_id))
}

#[derive(Clone)]
pub struct ExceptionResolver {
    store: Arc<dyn ExceptionStore>,
}

impl ExceptionResolver {
    pub fn new(store: Arc<dyn ExceptionStore>) -> Self {
        Self { store }
    }

    /// Rule ids the user currently holds an exception for.
    pub async fn get_exceptions(&self, system_user_id: i64) -> Result<BTreeSet<i64>> {
        Ok(self
            .store
            .exceptions_for_user(system_user_id)
            .await?
            .into_iter()
            .filter(|exception| exception.is_active())
            .map(|exception| exception.persecution_or_harm_id)
            .collect())
    }

    /// Persecution/harm rules that flag a taxonomic unit as sensitive.
    pub async fn rules_for_taxon(&self, taxonomy_id: i64) -> Result<Vec<PersecutionHarmRule>> {
        self.store.rules_for_taxon(taxonomy_id).await
    }

    pub async fn redact_for_user(
        &self,
        system_user_id: i64,
        nodes: &[NodeSecurity],
    ) -> Result<Visibility> {
        let exceptions = self.get_exceptions(system_user_id).await?;

        let mut visibility = Visibility::default();
        for node in nodes {
            if is_visible(&node.rule_ids, &exceptions) {
                visibility.visible.push(node.node_id);
            } else {
                visibility.redacted.push(node.node_id);
            }
        }

        tracing::debug!(
            system_user_id,
            visible = visibility.visible.len(),
            redacted = visibility.redacted.len(),
            "visibility resolved"
        );
        Ok(visibility)
    }
}
