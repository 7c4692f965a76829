//! Admin API over a real socket.

use std::sync::Arc;
use std::time::Duration;

use failover_monitor::admin::{setup_admin_router, AdminState};
use failover_monitor::reader::MockReader;
use failover_monitor::{AccessMode, Monitor};
use serde_json::Value;

mod common;
use common::fast_config;

#[tokio::test]
async fn test_admin_endpoints_report_live_state() {
    let mock = Arc::new(MockReader::new());
    let mut monitor = Monitor::new(fast_config(AccessMode::Alternating), mock);
    monitor.start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = AdminState::new(monitor.handle(), "test-key");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, setup_admin_router(state)).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let get = |path: &'static str| {
        client
            .get(format!("http://{}{}", addr, path))
            .header("Authorization", "Bearer test-key")
            .send()
    };

    let status: Value = get("/admin/status").await.unwrap().json().await.unwrap();
    assert_eq!(status["state"], "running");
    assert_eq!(status["access_mode"], "alternating");

    let stats: Value = get("/admin/stats").await.unwrap().json().await.unwrap();
    assert_eq!(stats["total_polls"], 1);

    let endpoints: Value = get("/admin/endpoints").await.unwrap().json().await.unwrap();
    assert_eq!(endpoints.as_array().map(|a| a.len()), Some(2));
    assert_eq!(endpoints[0]["endpoint"], "primary");
    assert_eq!(endpoints[0]["total_successes"], 1);

    let denied = client
        .get(format!("http://{}/admin/stats", addr))
        .header("Authorization", "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    monitor.stop().await;
}
