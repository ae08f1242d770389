//! Rule data model.
//!
//! Rules are plain values: the registry never hands out references into
//! live state, only clones or shared snapshots.

use serde::{Deserialize, Deserializer, Serialize};

/// Read an explicit JSON `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Effect of a matching rule. Only `Block` is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "Option<String>", into = "String")]
pub enum RuleAction {
    Block,
    Allow,
    Log,
    /// Unrecognised action string, kept verbatim so a save does not rewrite it.
    Other(String),
    #[default]
    Unset,
}

impl RuleAction {
    pub fn is_block(&self) -> bool {
        matches!(self, RuleAction::Block)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, RuleAction::Unset)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Allow => "allow",
            RuleAction::Log => "log",
            RuleAction::Other(s) => s,
            RuleAction::Unset => "",
        }
    }
}

impl From<String> for RuleAction {
    fn from(value: String) -> Self {
        // Action comparison is case-insensitive.
        match value.to_ascii_lowercase().as_str() {
            "block" => RuleAction::Block,
            "allow" => RuleAction::Allow,
            "log" => RuleAction::Log,
            "" => RuleAction::Unset,
            _ => RuleAction::Other(value),
        }
    }
}

impl From<Option<String>> for RuleAction {
    fn from(value: Option<String>) -> Self {
        value.map(RuleAction::from).unwrap_or_default()
    }
}

impl From<RuleAction> for String {
    fn from(value: RuleAction) -> Self {
        value.as_str().to_string()
    }
}

/// Part of the request a rule's pattern is tested against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "Option<String>", into = "String")]
pub enum RuleScope {
    Query,
    Path,
    Headers,
    /// Reserved; never matches.
    Body,
    Other(String),
    #[default]
    Unset,
}

impl RuleScope {
    pub fn is_unset(&self) -> bool {
        matches!(self, RuleScope::Unset)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleScope::Query => "query",
            RuleScope::Path => "path",
            RuleScope::Headers => "headers",
            RuleScope::Body => "body",
            RuleScope::Other(s) => s,
            RuleScope::Unset => "",
        }
    }
}

impl From<String> for RuleScope {
    fn from(value: String) -> Self {
        // Scope names are compared exactly.
        match value.as_str() {
            "query" => RuleScope::Query,
            "path" => RuleScope::Path,
            "headers" => RuleScope::Headers,
            "body" => RuleScope::Body,
            "" => RuleScope::Unset,
            _ => RuleScope::Other(value),
        }
    }
}

impl From<Option<String>> for RuleScope {
    fn from(value: Option<String>) -> Self {
        value.map(RuleScope::from).unwrap_or_default()
    }
}

impl From<RuleScope> for String {
    fn from(value: RuleScope) -> Self {
        value.as_str().to_string()
    }
}

/// A single substring-matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Rule {
    /// Unique within the registry. Empty means "assign one".
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    /// Literal substring, matched case-insensitively.
    #[serde(deserialize_with = "null_as_default")]
    pub pattern: String,

    #[serde(skip_serializing_if = "RuleAction::is_unset")]
    pub action: RuleAction,

    #[serde(skip_serializing_if = "RuleScope::is_unset")]
    pub scope: RuleScope,

    #[serde(deserialize_with = "null_as_default")]
    pub enabled: bool,

    /// Lower values evaluate first. Zero means "unspecified" on create.
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i32,
}

impl Rule {
    /// Convenience constructor used by defaults and tests.
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        action: RuleAction,
        scope: RuleScope,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            action,
            scope,
            enabled: true,
            priority,
        }
    }

    /// Apply an update payload.
    ///
    /// `enabled` is always overwritten: an absent value disables the rule.
    pub fn apply_patch(&mut self, patch: &RulePatch) {
        if let Some(pattern) = &patch.pattern {
            self.pattern = pattern.clone();
        }
        if let Some(action) = &patch.action {
            self.action = action.clone();
        }
        if let Some(scope) = &patch.scope {
            self.scope = scope.clone();
        }
        self.enabled = patch.enabled.unwrap_or(false);
        if let Some(priority) = patch.priority.filter(|p| *p != 0) {
            self.priority = priority;
        }
    }
}

/// Update payload with per-field presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<RuleScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// File-backed representation of the whole rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConfig {
    #[serde(deserialize_with = "null_as_default_enabled")]
    pub enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub rules: Vec<Rule>,
}

/// A `null` kill switch reads as on, like an absent one.
fn null_as_default_enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: Vec::new(),
        }
    }
}
