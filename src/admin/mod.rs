//! Administrative API for runtime rule management.
//!
//! # Routes (relative to `admin.prefix`)
//! ```text
//! GET    /enabled              → {enabled}
//! POST   /enabled?enabled=b    → {enabled}
//! POST   /rules:reload         → {reloaded}
//! POST   /rules:save           → {saved}
//! GET    /rules                → [Rule] in evaluation order
//! POST   /rules                → created Rule
//! GET    /rules/{id}           → Rule | 404
//! PUT    /rules/{id}           → updated Rule | 404
//! DELETE /rules/{id}           → {deleted}
//! POST   /test?query=&path=    → {blocked}
//! ```
//!
//! These routes sit behind the request interceptor like any other path, so
//! an admin request whose own query or path trips a block rule gets the 403
//! block page. With the built-in rules, `/test?query=union` is rejected
//! before the dry-run handler runs.

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::AdminConfig;
use crate::http::server::AppState;

pub use error::ApiError;

pub fn setup_admin_router(config: &AdminConfig) -> Router<AppState> {
    let api_key: Option<Arc<str>> = config.api_key.as_deref().map(Arc::from);

    Router::new()
        .route("/enabled", get(get_enabled).post(set_enabled))
        .route("/rules:reload", post(reload_rules))
        .route("/rules:save", post(save_rules))
        .route("/rules", get(list_rules).post(create_rule))
        .route("/rules/{id}", get(get_rule).put(update_rule).delete(delete_rule))
        .route("/test", post(test_request))
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::store::LoadedConfig;
    use crate::rules::{FileRuleStore, Registry, Rule, RuleStore, StoreError};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        registry: Arc<Registry>,
        _dir: tempfile::TempDir,
    }

    /// File store whose writes take `delay`.
    #[derive(Debug)]
    struct SlowStore {
        inner: FileRuleStore,
        delay: std::time::Duration,
    }

    impl RuleStore for SlowStore {
        fn load(&self) -> Result<LoadedConfig, StoreError> {
            self.inner.load()
        }

        fn save(&self, enabled: bool, rules: &[Rule]) -> Result<(), StoreError> {
            std::thread::sleep(self.delay);
            self.inner.save(enabled, rules)
        }
    }

    fn admin_app(registry: Arc<Registry>, config: &AdminConfig) -> Router {
        let state = AppState {
            registry,
            upstream: None,
        };
        Router::new()
            .nest("/api/waf", setup_admin_router(config))
            .with_state(state)
    }

    fn harness(api_key: Option<&str>, initial: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, initial).unwrap();
        let registry = Arc::new(Registry::new(Arc::new(FileRuleStore::new(&path))));

        let config = AdminConfig {
            api_key: api_key.map(String::from),
            ..Default::default()
        };
        let app = admin_app(registry.clone(), &config);

        Harness {
            app,
            registry,
            _dir: dir,
        }
    }

    fn empty_rules() -> Harness {
        harness(None, r#"{"enabled":true,"rules":[]}"#)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_create_list_update_delete() {
        let h = empty_rules();

        let (status, created) = call(
            &h.app,
            Method::POST,
            "/api/waf/rules",
            Some(json!({"pattern": "union", "action": "block", "scope": "query", "enabled": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["priority"], 1000);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let (_, listed) = call(&h.app, Method::GET, "/api/waf/rules", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, updated) = call(
            &h.app,
            Method::PUT,
            &format!("/api/waf/rules/{id}"),
            Some(json!({"pattern": "select", "enabled": true, "priority": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["pattern"], "select");
        assert_eq!(updated["action"], "block");
        assert_eq!(updated["priority"], 5);

        let (status, fetched) = call(&h.app, Method::GET, &format!("/api/waf/rules/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, updated);

        let (_, deleted) = call(&h.app, Method::DELETE, &format!("/api/waf/rules/{id}"), None).await;
        assert_eq!(deleted, json!({"deleted": true}));
        let (_, deleted) = call(&h.app, Method::DELETE, &format!("/api/waf/rules/{id}"), None).await;
        assert_eq!(deleted, json!({"deleted": false}));
    }

    #[tokio::test]
    async fn test_create_accepts_null_fields() {
        let h = empty_rules();
        let (status, created) = call(
            &h.app,
            Method::POST,
            "/api/waf/rules",
            Some(json!({"id": null, "pattern": "union", "action": "block", "scope": null, "priority": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!created["id"].as_str().unwrap().is_empty());
        assert_eq!(created["priority"], 1000);
        assert!(created.get("scope").is_none());
    }

    #[tokio::test]
    async fn test_slow_persistence_does_not_stall_other_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"enabled":true,"rules":[]}"#).unwrap();
        let store = SlowStore {
            inner: FileRuleStore::new(&path),
            delay: std::time::Duration::from_millis(400),
        };
        let registry = Arc::new(Registry::new(Arc::new(store)));
        let app = admin_app(registry, &AdminConfig::default());

        let started = std::time::Instant::now();
        let pending = tokio::spawn({
            let app = app.clone();
            async move {
                call(
                    &app,
                    Method::POST,
                    "/api/waf/rules",
                    Some(json!({"pattern": "union", "action": "block", "scope": "query"})),
                )
                .await
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Single-threaded runtime: an inline write would hold the only worker.
        let (status, _) = call(&app, Method::GET, "/api/waf/enabled", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(started.elapsed() < std::time::Duration::from_millis(300));

        let (status, _) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(started.elapsed() >= std::time::Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_unknown_rule_is_404() {
        let h = empty_rules();
        let (status, body) = call(
            &h.app,
            Method::PUT,
            "/api/waf/rules/nope",
            Some(json!({"pattern": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Value::Null);

        let (status, _) = call(&h.app, Method::GET, "/api/waf/rules/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_toggle_enabled() {
        let h = empty_rules();
        let (_, body) = call(&h.app, Method::GET, "/api/waf/enabled", None).await;
        assert_eq!(body, json!({"enabled": true}));

        let (_, body) = call(&h.app, Method::POST, "/api/waf/enabled?enabled=false", None).await;
        assert_eq!(body, json!({"enabled": false}));
        assert!(!h.registry.is_enabled());

        let (status, _) = call(&h.app, Method::POST, "/api/waf/enabled", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let h = empty_rules();
        h.registry.create_rule(Rule {
            pattern: "drop".into(),
            ..Default::default()
        });

        let (_, body) = call(&h.app, Method::POST, "/api/waf/rules:save", None).await;
        assert_eq!(body, json!({"saved": true}));
        let (_, body) = call(&h.app, Method::POST, "/api/waf/rules:reload", None).await;
        assert_eq!(body, json!({"reloaded": true}));
        assert_eq!(h.registry.list_rules()[0].pattern, "drop");
    }

    #[tokio::test]
    async fn test_dry_run() {
        let h = harness(
            None,
            r#"{"enabled":true,"rules":[{"id":"t","pattern":"../","action":"block","scope":"path","enabled":true,"priority":1}]}"#,
        );

        let (_, body) = call(&h.app, Method::POST, "/api/waf/test?path=../../etc/passwd", None).await;
        assert_eq!(body, json!({"blocked": true}));
        let (_, body) = call(&h.app, Method::POST, "/api/waf/test?query=../../etc/passwd", None).await;
        assert_eq!(body, json!({"blocked": false}));
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let h = harness(Some("s3cret"), r#"{"enabled":true,"rules":[]}"#);

        let (status, _) = call(&h.app, Method::GET, "/api/waf/rules", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/waf/rules")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
