//! Applying and removing security rules on submission features and artifacts.
//!
//! Removal always end-dates the active assignment; rows are never deleted, so
//! the assignment history of a node stays queryable.

use std::sync::Arc;

use tracing::info;

use crate::config::CoreConfig;
use crate::error::{Result, SubmissionError};
use crate::models::{
    PatchOutcome, SecurityAssignment, SecurityCategory, SecurityRule, SecurityTarget,
};
use crate::ports::SecurityStore;

#[derive(Clone)]
pub struct SecurityRuleService {
    store: Arc<dyn SecurityStore>,
    reject_inactive_rules: bool,
}

impl SecurityRuleService {
    pub fn new(store: Arc<dyn SecurityStore>, config: &CoreConfig) -> Self {
        Self {
            store,
            reject_inactive_rules: config.reject_inactive_rules,
        }
    }

    /// Apply every rule to every node. Already active pairs are skipped and
    /// absent from the result.
    pub async fn apply_rules(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let (node_ids, rule_ids) = (distinct(node_ids), distinct(rule_ids));
        if node_ids.is_empty() || rule_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_rules_active(&rule_ids).await?;

        let applied = self.store.apply(target, &node_ids, &rule_ids).await?;
        info!(
            %target,
            nodes = node_ids.len(),
            rules = rule_ids.len(),
            applied = applied.len(),
            "security rules applied"
        );
        Ok(applied)
    }

    /// Remove the given rules from the nodes, or every rule when `rule_ids` is `None`.
    pub async fn remove_rules(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: Option<&[i64]>,
    ) -> Result<Vec<SecurityAssignment>> {
        match rule_ids {
            None => self.remove_all(target, node_ids).await,
            Some(rule_ids) => self.remove_specific(target, node_ids, rule_ids).await,
        }
    }

    pub async fn remove_all(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let node_ids = distinct(node_ids);
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }

        let removed = self.store.remove_all(target, &node_ids).await?;
        info!(%target, nodes = node_ids.len(), removed = removed.len(), "all security rules removed");
        Ok(removed)
    }

    pub async fn remove_specific(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        rule_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let (node_ids, rule_ids) = (distinct(node_ids), distinct(rule_ids));
        if node_ids.is_empty() || rule_ids.is_empty() {
            return Ok(Vec::new());
        }

        let removed = self.store.remove_specific(target, &node_ids, &rule_ids).await?;
        info!(
            %target,
            nodes = node_ids.len(),
            rules = rule_ids.len(),
            removed = removed.len(),
            "security rules removed"
        );
        Ok(removed)
    }

    /// Apply and remove against the same nodes as one unit of work. A rule
    /// id may not appear in both lists.
    pub async fn patch_rules(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
        apply_rule_ids: &[i64],
        remove_rule_ids: &[i64],
    ) -> Result<PatchOutcome> {
        let node_ids = distinct(node_ids);
        let apply_rule_ids = distinct(apply_rule_ids);
        let remove_rule_ids = distinct(remove_rule_ids);
        if node_ids.is_empty() || (apply_rule_ids.is_empty() && remove_rule_ids.is_empty()) {
            return Ok(PatchOutcome::default());
        }

        let overlap: Vec<i64> = apply_rule_ids
            .iter()
            .copied()
            .filter(|id| remove_rule_ids.binary_search(id).is_ok())
            .collect();
        if !overlap.is_empty() {
            return Err(SubmissionError::OverlappingPatch(overlap));
        }
        self.ensure_rules_active(&apply_rule_ids).await?;

        let outcome = self
            .store
            .patch(target, &node_ids, &apply_rule_ids, &remove_rule_ids)
            .await?;
        info!(
            %target,
            nodes = node_ids.len(),
            applied = outcome.applied.len(),
            removed = outcome.removed.len(),
            "security rules patched"
        );
        Ok(outcome)
    }

    pub async fn active_assignments(
        &self,
        target: SecurityTarget,
        node_ids: &[i64],
    ) -> Result<Vec<SecurityAssignment>> {
        let node_ids = distinct(node_ids);
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.active_assignments(target, &node_ids).await
    }

    pub async fn active_rules(&self) -> Result<Vec<SecurityRule>> {
        let mut rules = self.store.list_rules().await?;
        rules.retain(SecurityRule::is_active);
        Ok(rules)
    }

    pub async fn active_categories(&self) -> Result<Vec<SecurityCategory>> {
        let mut categories = self.store.list_categories().await?;
        categories.retain(SecurityCategory::is_active);
        Ok(categories)
    }

    async fn ensure_rules_active(&self, rule_ids: &[i64]) -> Result<()> {
        if !self.reject_inactive_rules || rule_ids.is_empty() {
            return Ok(());
        }

        let active: Vec<i64> = self
            .active_rules()
            .await?
            .iter()
            .map(|rule| rule.security_rule_id)
            .collect();
        let unknown: Vec<i64> = rule_ids
            .iter()
            .copied()
            .filter(|id| !active.contains(id))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(SubmissionError::UnknownSecurityRule(unknown))
        }
    }
}

fn distinct(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
