use serde::Serialize;

#[derive(Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Serialize)]
pub struct KpiResponse {
    pub trucks_by_status: Vec<StatusCount>,
    pub trucks_inside: i64,
    pub pending_approvals: i64,
    pub pending_weighings: i64,
    pub docks_occupied: i64,
    pub docks_total: i64,
    pub scheduled_today: i64,
    pub exited_today: i64,
    pub avg_turnaround_minutes: Option<f64>,
}
