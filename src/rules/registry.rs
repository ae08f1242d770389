//! Rule registry: the single owner of rule state.
//!
//! # Responsibilities
//! - Keep the id index and the ordered list in agreement
//! - Apply create/update/delete/reload/save
//! - Auto-persist after admin mutations (non-fatal)
//! - Install the built-in rule set when nothing is persisted
//!
//! Mutations are serialized by an internal lock. Request filtering only
//! reads `ConfigState` snapshots and never takes that lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use uuid::Uuid;

use crate::observability::metrics;
use crate::rules::model::{PersistedConfig, Rule, RuleAction, RulePatch, RuleScope};
use crate::rules::state::ConfigState;
pub use crate::rules::state::RuleSnapshot;
use crate::rules::store::{ConfigSource, RuleStore, StoreError};

/// Priority given to rules created without one.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// Patterns of the built-in rule set, in evaluation order.
pub const DEFAULT_PATTERNS: [&str; 9] = [
    "union", "select", "insert", "delete", "drop", "script", "alert", "../", "..\\",
];

const DEFAULT_BASE_PRIORITY: i32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Built-in rules: block common injection and traversal tokens in the query.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_PATTERNS
        .iter()
        .zip(DEFAULT_BASE_PRIORITY..)
        .map(|(pattern, priority)| {
            Rule::new(new_rule_id(), *pattern, RuleAction::Block, RuleScope::Query, priority)
        })
        .collect()
}

fn new_rule_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug)]
pub struct Registry {
    state: ConfigState,
    index: DashMap<String, Rule>,
    store: Arc<dyn RuleStore>,
    write_lock: Mutex<()>,
}

impl Registry {
    /// Build the registry from the store, falling back to built-in rules.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        let registry = Self {
            state: ConfigState::default(),
            index: DashMap::new(),
            store,
            write_lock: Mutex::new(()),
        };

        let use_defaults = match registry.store.load() {
            Ok(loaded) => {
                let absent = loaded.source != ConfigSource::File && loaded.config.rules.is_empty();
                if absent {
                    Some(loaded.config.enabled)
                } else {
                    tracing::info!(
                        source = ?loaded.source,
                        rules = loaded.config.rules.len(),
                        enabled = loaded.config.enabled,
                        "Rules loaded"
                    );
                    registry.install(loaded.config);
                    None
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load rules, using built-in set");
                Some(true)
            }
        };

        if let Some(enabled) = use_defaults {
            let rules = default_rules();
            tracing::info!(rules = rules.len(), "Installing built-in rule set");
            for rule in &rules {
                registry.index.insert(rule.id.clone(), rule.clone());
            }
            registry.state.replace(enabled, rules);
            metrics::set_active_rules(registry.index.len());
        }

        registry
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Flip the global kill switch and persist it.
    pub fn set_enabled(&self, enabled: bool) {
        let _guard = self.lock();
        self.state.set_enabled(enabled);
        tracing::info!(enabled, "Request filtering toggled");
        self.persist_silently("toggle");
    }

    /// Ordered, read-only rule list.
    pub fn list_rules(&self) -> Arc<Vec<Rule>> {
        self.state.rules()
    }

    pub fn get_rule(&self, id: &str) -> Option<Rule> {
        self.index.get(id).map(|r| r.value().clone())
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        self.state.snapshot()
    }

    /// Insert a rule, filling in a fresh id and the default priority as needed.
    ///
    /// A rule whose id already exists replaces the stored one.
    pub fn create_rule(&self, mut rule: Rule) -> Rule {
        let _guard = self.lock();
        if rule.id.is_empty() {
            rule.id = new_rule_id();
        }
        if rule.priority == 0 {
            rule.priority = DEFAULT_PRIORITY;
        }

        // Single publish: readers never see this id missing.
        self.index.insert(rule.id.clone(), rule.clone());
        self.state.upsert_rule(rule.clone());

        tracing::info!(rule_id = %rule.id, pattern = %rule.pattern, priority = rule.priority, "Rule created");
        metrics::record_rule_mutation("create");
        metrics::set_active_rules(self.index.len());
        self.persist_silently("create");
        rule
    }

    /// Merge `patch` into the rule with `id`. `None` if the id is unknown.
    pub fn update_rule(&self, id: &str, patch: &RulePatch) -> Option<Rule> {
        let _guard = self.lock();
        let updated = {
            let mut entry = self.index.get_mut(id)?;
            entry.apply_patch(patch);
            entry.value().clone()
        };

        let rules = self
            .state
            .rules()
            .iter()
            .map(|r| if r.id == id { updated.clone() } else { r.clone() })
            .collect();
        self.state.replace_rules(rules);

        tracing::info!(rule_id = %id, enabled = updated.enabled, priority = updated.priority, "Rule updated");
        metrics::record_rule_mutation("update");
        self.persist_silently("update");
        Some(updated)
    }

    /// Remove the rule with `id`. Persists only when something was removed.
    pub fn delete_rule(&self, id: &str) -> bool {
        let _guard = self.lock();
        let removed = self.index.remove(id).is_some() && self.state.remove_rule_by_id(id);
        if removed {
            tracing::info!(rule_id = %id, "Rule deleted");
            metrics::record_rule_mutation("delete");
            metrics::set_active_rules(self.index.len());
            self.persist_silently("delete");
        }
        removed
    }

    /// Discard current state and rebuild it from the store.
    pub fn reload_from_file(&self) -> Result<ConfigSource, RegistryError> {
        let _guard = self.lock();
        let loaded = self.store.load()?;
        tracing::info!(source = ?loaded.source, rules = loaded.config.rules.len(), "Rules reloaded");
        self.install(loaded.config);
        metrics::record_rule_mutation("reload");
        Ok(loaded.source)
    }

    /// Write current state to the store.
    pub fn save_to_file(&self) -> Result<(), RegistryError> {
        let _guard = self.lock();
        let snapshot = self.state.snapshot();
        self.store.save(snapshot.enabled, &snapshot.rules)?;
        tracing::info!("Rules saved");
        Ok(())
    }

    /// Replace index and list with `config`. Caller holds the write lock.
    fn install(&self, config: PersistedConfig) {
        let mut rules: Vec<Rule> = Vec::with_capacity(config.rules.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for mut rule in config.rules {
            if rule.id.is_empty() {
                rule.id = new_rule_id();
            }
            // Later duplicates win but keep the first one's position.
            match positions.get(&rule.id) {
                Some(&pos) => rules[pos] = rule,
                None => {
                    positions.insert(rule.id.clone(), rules.len());
                    rules.push(rule);
                }
            }
        }

        for rule in &rules {
            self.index.insert(rule.id.clone(), rule.clone());
        }
        let keep: HashSet<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        self.index.retain(|id, _| keep.contains(id.as_str()));

        self.state.replace(config.enabled, rules);
        metrics::set_active_rules(self.index.len());
    }

    fn persist_silently(&self, op: &'static str) {
        let snapshot = self.state.snapshot();
        if let Err(e) = self.store.save(snapshot.enabled, &snapshot.rules) {
            tracing::warn!(op, error = %e, "Failed to persist rules; change kept in memory");
            metrics::record_persist_failure();
        }
    }
}
