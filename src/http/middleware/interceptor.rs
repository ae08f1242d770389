//! Request interceptor.
//! Screens every inbound request against the rule snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::observability::metrics;
use crate::rules::engine::{self, RequestView};
use crate::rules::{Registry, Rule, RuleAction};

/// Body of the fixed rejection response.
pub const BLOCKED_BODY: &str = "403 Forbidden - Blocked by WAF rule\n";

/// Fixed rejection: 403, plain text.
pub fn blocked_response() -> Response {
    (
        StatusCode::FORBIDDEN,
        [(header::CONTENT_TYPE, "text/plain")],
        BLOCKED_BODY,
    )
        .into_response()
}

pub async fn interceptor_middleware(
    State(registry): State<Arc<Registry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // 1. Global kill switch.
    let snapshot = registry.snapshot();
    if !snapshot.enabled {
        metrics::record_verdict("disabled");
        return next.run(request).await;
    }

    // 2. First matching rule, cloned so the request can move on.
    let matched: Option<Rule> =
        engine::evaluate(&snapshot.rules, &RequestView::from_request(&request)).cloned();

    // 3. Enforce.
    if let Some(rule) = matched {
        metrics::record_rule_match(rule.action.as_str());
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default();

        match rule.action {
            RuleAction::Block => {
                tracing::warn!(
                    request_id = %request_id,
                    client = %client,
                    rule_id = %rule.id,
                    pattern = %rule.pattern,
                    scope = rule.scope.as_str(),
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Request blocked"
                );
                metrics::record_verdict("block");
                return blocked_response();
            }
            RuleAction::Log => {
                tracing::info!(
                    request_id = %request_id,
                    client = %client,
                    rule_id = %rule.id,
                    pattern = %rule.pattern,
                    scope = rule.scope.as_str(),
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Rule matched"
                );
            }
            _ => {}
        }
    }

    metrics::record_verdict("pass");
    next.run(request).await
}
