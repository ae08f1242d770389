//! Rule evaluation.
//!
//! # Semantics
//! - Rules are walked in the order given (ascending priority)
//! - Disabled rules and rules with an empty pattern are skipped
//! - First matching rule wins, whatever its action
//! - Matching is case-insensitive literal substring containment
//!
//! No regex and no allocation per rule beyond the lowercased pattern, so a
//! request costs O(rules × inspected bytes) at worst.

use std::cell::OnceCell;

use axum::http::{HeaderMap, Request};

use crate::rules::model::{Rule, RuleScope};

/// Request attributes visible to rules.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    /// Raw query string, empty when absent.
    pub query: &'a str,
    pub path: &'a str,
    pub headers: Option<&'a HeaderMap>,
}

impl<'a> RequestView<'a> {
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        Self {
            query: request.uri().query().unwrap_or(""),
            path: request.uri().path(),
            headers: Some(request.headers()),
        }
    }
}

/// Lowercased request text, computed once per evaluation.
struct Inspected<'a> {
    query: String,
    path: String,
    headers: Option<&'a HeaderMap>,
    header_lines: OnceCell<Vec<String>>,
}

impl<'a> Inspected<'a> {
    fn new(view: &RequestView<'a>) -> Self {
        Self {
            query: view.query.to_lowercase(),
            path: view.path.to_lowercase(),
            headers: view.headers,
            header_lines: OnceCell::new(),
        }
    }

    /// `name:value` for every header value present.
    fn header_lines(&self) -> &[String] {
        self.header_lines.get_or_init(|| {
            self.headers
                .map(|headers| {
                    headers
                        .iter()
                        .map(|(name, value)| {
                            format!("{}:{}", name.as_str(), String::from_utf8_lossy(value.as_bytes()))
                                .to_lowercase()
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn matches(&self, scope: &RuleScope, pattern: &str) -> bool {
        match scope {
            RuleScope::Query => self.query.contains(pattern),
            RuleScope::Path => self.path.contains(pattern),
            RuleScope::Headers => self.header_lines().iter().any(|line| line.contains(pattern)),
            // Body inspection is reserved.
            RuleScope::Body | RuleScope::Other(_) | RuleScope::Unset => false,
        }
    }
}

/// Return the first enabled rule whose scope test matches.
pub fn evaluate<'r>(rules: &'r [Rule], request: &RequestView<'_>) -> Option<&'r Rule> {
    let inspected = Inspected::new(request);
    rules
        .iter()
        .filter(|rule| rule.enabled && !rule.pattern.is_empty())
        .find(|rule| inspected.matches(&rule.scope, &rule.pattern.to_lowercase()))
}

/// Dry run: would a `block` rule scoped to query or path match?
///
/// Header rules are not consulted. Unlike `evaluate`, a matching
/// non-blocking rule does not stop the search.
pub fn would_block(rules: &[Rule], query: Option<&str>, path: Option<&str>) -> bool {
    let query = query.map(str::to_lowercase);
    let path = path.map(str::to_lowercase);

    rules
        .iter()
        .filter(|rule| rule.enabled && !rule.pattern.is_empty() && rule.action.is_block())
        .any(|rule| {
            let pattern = rule.pattern.to_lowercase();
            match rule.scope {
                RuleScope::Query => query.as_deref().is_some_and(|q| q.contains(&pattern)),
                RuleScope::Path => path.as_deref().is_some_and(|p| p.contains(&pattern)),
                _ => false,
            }
        })
}
