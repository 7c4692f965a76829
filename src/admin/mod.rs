//! Admin API.
//!
//! Read-only JSON views of the running monitor, behind bearer-token auth.
//! The monitor behind the API can be replaced at runtime (config reload), so
//! the state holds a swappable handle rather than the monitor itself.

pub mod auth;
pub mod handlers;

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::scheduler::MonitorHandle;

#[derive(Clone)]
pub struct AdminState {
    pub monitor: Arc<ArcSwap<MonitorHandle>>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(monitor: MonitorHandle, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            monitor: Arc::new(ArcSwap::from_pointee(monitor)),
            api_key: api_key.into(),
        }
    }

    /// Point the API at a rebuilt monitor.
    pub fn replace(&self, monitor: MonitorHandle) {
        self.monitor.store(Arc::new(monitor));
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/endpoints", get(get_endpoints))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::reader::MockReader;
    use crate::scheduler::Monitor;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn state() -> AdminState {
        let monitor = Monitor::new(MonitorConfig::default(), Arc::new(MockReader::new()));
        AdminState::new(monitor.handle(), "secret")
    }

    #[tokio::test]
    async fn test_rejects_missing_token() {
        let app = setup_admin_router(state());
        let res = app
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_serves_stats_with_token() {
        let app = setup_admin_router(state());
        let res = app
            .oneshot(
                Request::get("/admin/stats")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total_polls"], 0);
        assert_eq!(json["access_mode"], "fallback");
        assert_eq!(json["primary"]["address"], "192.168.178.125:502");
    }
}
