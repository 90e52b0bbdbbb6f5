//! Shared fixtures for the dashboard integration tests

#![allow(dead_code, unreachable_pub)]

use serde_json::{Value, json};
use std::sync::{Arc, Once};
use telecare_client::{AdminApi, Envelope, MockTransport, paths};
use telecare_dashboard::{CollectingReporter, TrendFilters, TrendsDashboard};

static LOGGING: Once = Once::new();

/// Route tracing output through the test harness capture
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("telecare_dashboard=debug")
            .with_test_writer()
            .try_init();
    });
}

/// A dashboard wired to a mock gateway
pub struct DashboardHarness {
    pub mock: Arc<MockTransport>,
    pub reporter: Arc<CollectingReporter>,
    pub dashboard: TrendsDashboard,
}

impl DashboardHarness {
    /// Mount against `mock`, which must already be stubbed
    pub fn mount(mock: Arc<MockTransport>, filters: TrendFilters) -> Self {
        init_test_logging();
        let reporter = Arc::new(CollectingReporter::new());
        let dashboard =
            TrendsDashboard::mount(AdminApi::new(mock.clone()), reporter.clone(), filters);
        Self {
            mock,
            reporter,
            dashboard,
        }
    }
}

pub fn stats_payload() -> Value {
    json!({
        "totalUsers": 120,
        "totalDoctors": "14",
        "totalOrders": 33,
        "totalOrderRevenue": "1520.75"
    })
}

pub fn registration_payload() -> Value {
    json!({
        "granularity": "daily",
        "chartData": [
            {"date": "2024-03-01", "registrations": "4"},
            {"date": "2024-03-02"}
        ],
        "stats": {"totalRegistrations": 4}
    })
}

pub fn consultation_payload(month: &str, revenue: &str) -> Value {
    json!({
        "month": month,
        "year": "2024",
        "chartData": [
            {"date": format!("2024-{month:0>2}-01"), "revenue": revenue, "count": 2}
        ]
    })
}

pub fn purchase_payload() -> Value {
    json!({
        "granularity": "monthly",
        "chartData": [{"month": "2024-01", "revenue": 300, "orders": 3}],
        "topProducts": [{"name": "Vitamin D", "revenue": "90"}]
    })
}

/// Stub every dashboard endpoint with a successful payload
pub fn stub_dashboard(mock: &MockTransport) {
    mock.respond(paths::DASHBOARD_STATS, stats_payload())
        .respond(paths::USER_REGISTRATION_TRENDS, registration_payload())
        .respond(paths::CONSULTATION_TRENDS, consultation_payload("1", "42.5"))
        .respond(paths::PRODUCT_PURCHASE_TRENDS, purchase_payload())
        .respond(
            paths::TOP_DOCTORS,
            json!([{"name": "Dr. Ada", "revenue": "410", "consultations": 12}]),
        );
}

/// Page of rows with a server total
pub fn page_of(rows: Value, total: u64) -> Envelope {
    Envelope::ok(rows).with_pagination(json!({"total": total}))
}

/// `count` user rows with ids `u1..`
pub fn user_rows(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|n| json!({"_id": format!("u{n}"), "name": format!("User {n}"), "role": "user"}))
            .collect(),
    )
}
