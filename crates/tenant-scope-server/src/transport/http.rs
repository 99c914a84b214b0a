//! HTTP transport implementation

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{Router, middleware};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, ContextState, request_context_middleware};
use crate::config::HttpConfig;
use crate::handlers;
use crate::{Error, Result};

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the application router.
///
/// Entity routes sit behind the request context middleware; `/health` and
/// `/metrics` do not.
pub fn router(state: ContextState, config: &HttpConfig) -> Router {
    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone());

    let entities = Router::new()
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/{id}",
            get(handlers::get_task).delete(handlers::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            request_context_middleware,
        ));

    #[cfg(feature = "metrics")]
    let entities = entities.route_layer(middleware::from_fn(track_request));

    #[allow(unused_mut)]
    let mut app = health;

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.merge(entities)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(build_cors_layer(config))
}

/// Serve `app` until `shutdown` resolves
pub async fn run_http(
    app: Router,
    config: &HttpConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &HttpConfig) -> CorsLayer {
    let Some(origin) = config.cors_origin.as_deref() else {
        // No cross-origin access
        return CorsLayer::new();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin_value) => CorsLayer::new()
            .allow_origin(origin_value)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
            CorsLayer::new()
        }
    }
}

pub(super) fn emit_security_warnings(http: &HttpConfig, auth: &AuthConfig) {
    let host = http.host;

    if host.is_unspecified() {
        tracing::warn!(
            "HTTP server binding to all interfaces ({host}). \
             This exposes the server to all network interfaces."
        );
    } else if !host.is_loopback() {
        tracing::warn!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        );
    }

    if !auth.is_jwt() && !host.is_loopback() {
        tracing::warn!(
            "SECURITY WARNING: static token table in use on a network-reachable address. \
             Configure auth.hs_secret for JWT authentication."
        );
    }

    if http.cors_origin.is_none() {
        tracing::info!("CORS origin not configured; cross-origin requests are refused");
    }
}

/// 200 while the storage backend answers its health check, 503 otherwise
async fn health_handler(State(state): State<ContextState>) -> impl IntoResponse {
    let (code, status) = match state.builder.storage().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}

#[cfg(feature = "metrics")]
async fn track_request(
    request: axum::extract::Request,
    next: middleware::Next,
) -> axum::response::Response {
    let route = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());
    let start = std::time::Instant::now();

    let response = next.run(request).await;
    crate::observability::record_request(&route, response.status().as_u16(), start.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tenant_scope::{
        ContextBuilder, EntityName, InMemoryStorage, PendingRecord, Predicate, Record, RecordId,
        Storage, StorageError, StorageResult, StoredStream, TenantId,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{StaticIdentityResolver, StaticToken};

    /// In-memory backend whose health check always fails
    #[derive(Debug, Default)]
    struct DownStorage {
        inner: InMemoryStorage,
    }

    #[async_trait]
    impl Storage for DownStorage {
        async fn query_by_tenant(
            &self,
            entity: EntityName,
            tenant: &TenantId,
            predicate: Predicate,
        ) -> StorageResult<StoredStream> {
            self.inner.query_by_tenant(entity, tenant, predicate).await
        }

        async fn insert(&self, entity: EntityName, record: PendingRecord) -> StorageResult<Record> {
            self.inner.insert(entity, record).await
        }

        async fn remove(
            &self,
            entity: EntityName,
            tenant: &TenantId,
            id: RecordId,
        ) -> StorageResult<bool> {
            self.inner.remove(entity, tenant, id).await
        }

        async fn health_check(&self) -> StorageResult<()> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    fn app() -> Router {
        app_with(Arc::new(InMemoryStorage::new()))
    }

    fn app_with(storage: Arc<dyn Storage>) -> Router {
        let builder = ContextBuilder::with_default_entities(storage);
        let tokens = StaticToken::parse_list("t-a:1:tenant-a,t-b:2:tenant-b,t-none:3").unwrap();
        let state = ContextState::new(builder, Arc::new(StaticIdentityResolver::new(tokens)));
        router(state, &HttpConfig::default())
    }

    fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "0.3.2",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("ok"));
        assert!(json.contains("0.3.2"));
    }

    #[tokio::test]
    async fn test_health_needs_no_credential() {
        let (status, body) = send(&app(), request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_health_reports_storage_outage() {
        let app = app_with(Arc::new(DownStorage::default()));
        let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn test_entity_routes_require_credential() {
        let app = app();
        let (status, body) = send(&app, request(Method::GET, "/projects", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication required");

        let (status, _) = send(&app, request(Method::GET, "/tasks", Some("bogus"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_identity_without_tenant_is_refused() {
        let (status, body) =
            send(&app(), request(Method::GET, "/projects", Some("t-none"), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_tenants_are_isolated_over_http() {
        let app = app();

        let (status, created) = send(
            &app,
            request(
                Method::POST,
                "/projects",
                Some("t-a"),
                Some(json!({"name": "Apollo", "tenant_id": "tenant-b"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tenant_id"], "tenant-a");
        assert_eq!(created["created_by"], "1");
        let id = created["id"].as_u64().unwrap();

        let (status, own) = send(
            &app,
            request(Method::GET, &format!("/projects/{id}"), Some("t-a"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(own["name"], "Apollo");

        let (status, foreign) = send(
            &app,
            request(Method::GET, &format!("/projects/{id}"), Some("t-b"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(foreign["error"], format!("project {id} not found"));

        let (status, listed) =
            send(&app, request(Method::GET, "/projects", Some("t-b"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([]));

        let (status, _) = send(
            &app,
            request(Method::DELETE, &format!("/projects/{id}"), Some("t-b"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            request(Method::DELETE, &format!("/projects/{id}"), Some("t-a"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_task_for_foreign_project_is_not_found() {
        let app = app();
        let (_, project) = send(
            &app,
            request(Method::POST, "/projects", Some("t-a"), Some(json!({"name": "x"}))),
        )
        .await;

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/tasks",
                Some("t-b"),
                Some(json!({"title": "steal", "project_id": project["id"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/tasks",
                Some("t-a"),
                Some(json!({"title": "ok", "project_id": project["id"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/tasks?project_id={}", project["id"]);
        let (status, tasks) = send(&app, request(Method::GET, &uri, Some("t-a"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tasks.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_invalid_record_is_unprocessable() {
        let (status, body) = send(
            &app(),
            request(Method::POST, "/projects", Some("t-a"), Some(json!({"name": 7}))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[test]
    fn test_build_cors_layer_variants() {
        let _open = build_cors_layer(&HttpConfig {
            cors_origin: Some("https://example.com".to_string()),
            ..HttpConfig::default()
        });
        let _closed = build_cors_layer(&HttpConfig::default());
        let _invalid = build_cors_layer(&HttpConfig {
            cors_origin: Some("bad\norigin".to_string()),
            ..HttpConfig::default()
        });
    }

    #[test]
    fn test_security_warnings_do_not_panic() {
        let http = HttpConfig {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ..HttpConfig::default()
        };
        emit_security_warnings(&http, &AuthConfig::static_tokens(vec![]));
        emit_security_warnings(&HttpConfig::default(), &AuthConfig::static_tokens(vec![]));
    }
}
