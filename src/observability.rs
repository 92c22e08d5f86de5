use std::net::SocketAddr;

use crate::wire::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "rota_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "rota_request_duration_seconds";

/// Counter: scheduling requests rejected with a clash.
pub const CONFLICTS_TOTAL: &str = "rota_conflicts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "rota_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "rota_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "rota_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Request variant to a short label for metrics.
pub fn op_label(req: &Request) -> &'static str {
    match req {
        Request::CreateTeacher { .. } => "create_teacher",
        Request::CreateStudent { .. } => "create_student",
        Request::ListTeachers => "list_teachers",
        Request::ListStudents => "list_students",
        Request::TeacherTimetable { .. } => "teacher_timetable",
        Request::StudentTimetable { .. } => "student_timetable",
        Request::CreateClass { .. } => "create_class",
        Request::UpdateClass { .. } => "update_class",
        Request::DeleteClass { .. } => "delete_class",
    }
}
