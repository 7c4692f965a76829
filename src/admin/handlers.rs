use axum::{extract::State, Json};
use serde::Serialize;

use super::AdminState;
use crate::dispatch::AccessMode;
use crate::events::RunStatistics;
use crate::health::HealthSnapshot;
use crate::scheduler::SchedulerState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: SchedulerState,
    pub access_mode: AccessMode,
    pub success_rate: f64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let monitor = state.monitor.load();
    let stats = monitor.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: monitor.state(),
        access_mode: monitor.access_mode(),
        success_rate: stats.success_rate(),
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<RunStatistics> {
    Json(state.monitor.load().snapshot())
}

pub async fn get_endpoints(State(state): State<AdminState>) -> Json<Vec<HealthSnapshot>> {
    Json(state.monitor.load().endpoints().to_vec())
}
