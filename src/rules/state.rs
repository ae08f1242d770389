//! In-memory rule state read on every request.
//!
//! The kill switch and the ordered rule list are published together as one
//! `RuleSnapshot` behind an `ArcSwap`. Writers build the next snapshot and
//! swap it in with a single store; readers never observe a half-replaced
//! list or a flag paired with the wrong list. Writers are expected to be
//! serialized by the owner (see `Registry`).

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::rules::model::Rule;

/// Consistent view handed to the request path.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub enabled: bool,
    pub rules: Arc<Vec<Rule>>,
}

/// Stable sort ascending by priority; equal priorities keep insertion order.
fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by_key(|r| r.priority);
}

/// Global enabled flag plus the priority-ordered rule list.
#[derive(Debug)]
pub struct ConfigState {
    current: ArcSwap<RuleSnapshot>,
}

impl ConfigState {
    pub fn new(enabled: bool) -> Self {
        Self {
            current: ArcSwap::from_pointee(RuleSnapshot {
                enabled,
                rules: Arc::new(Vec::new()),
            }),
        }
    }

    /// Flag and list as of a single publish.
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot::clone(&self.current.load())
    }

    pub fn is_enabled(&self) -> bool {
        self.current.load().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let rules = self.current.load().rules.clone();
        self.publish(enabled, rules);
    }

    /// Read-only snapshot of the ordered rule list.
    pub fn rules(&self) -> Arc<Vec<Rule>> {
        self.current.load().rules.clone()
    }

    /// Replace flag and list together.
    pub fn replace(&self, enabled: bool, new_rules: Vec<Rule>) {
        let mut rules = new_rules;
        sort_by_priority(&mut rules);
        self.publish(enabled, Arc::new(rules));
    }

    /// Replace the whole list, then sort.
    pub fn replace_rules(&self, new_rules: Vec<Rule>) {
        let enabled = self.is_enabled();
        self.replace(enabled, new_rules);
    }

    /// Insert `rule`, dropping any rule with the same id, then sort.
    pub fn upsert_rule(&self, rule: Rule) {
        let current = self.current.load();
        let mut rules: Vec<Rule> = current
            .rules
            .iter()
            .filter(|r| r.id != rule.id)
            .cloned()
            .collect();
        rules.push(rule);
        sort_by_priority(&mut rules);
        self.publish(current.enabled, Arc::new(rules));
    }

    /// Remove the rule with `id`. Returns whether one was found.
    pub fn remove_rule_by_id(&self, id: &str) -> bool {
        let current = self.current.load();
        let Some(pos) = current.rules.iter().position(|r| r.id == id) else {
            return false;
        };
        let mut rules = Vec::clone(&current.rules);
        rules.remove(pos);
        self.publish(current.enabled, Arc::new(rules));
        true
    }

    fn publish(&self, enabled: bool, rules: Arc<Vec<Rule>>) {
        self.current.store(Arc::new(RuleSnapshot { enabled, rules }));
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        Self::new(true)
    }
}
