//! Consultation bookings table and its counter cards

use crate::list::{ListResource, PaginatedList};
use crate::normalize::{coerce_number, is_truthy};
use serde::Serialize;
use serde_json::Value;
use telecare_client::{AdminApi, ApiRequest, ConsultationFilters};
use tracing::debug;

/// Counter cards above the consultations table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSummary {
    /// Bookings ever made
    pub total_consultations_booked: f64,
    /// Revenue ever generated
    pub total_revenue_generated: f64,
    /// Busiest doctor or slot, as the server describes it
    pub most_consultations_booked: Option<Value>,
}

fn counter(data: &Value, key: &str) -> f64 {
    let n = data.get(key).map_or(0.0, coerce_number);
    if n.is_finite() { n } else { 0.0 }
}

impl ConsultationSummary {
    /// Summary from a stats payload, zeroed where fields are missing
    pub fn from_data(data: &Value) -> Self {
        Self {
            total_consultations_booked: counter(data, "totalConsultationsBooked"),
            total_revenue_generated: counter(data, "totalRevenueGenerated"),
            most_consultations_booked: data
                .get("mostConsultationsBooked")
                .filter(|value| is_truthy(value))
                .cloned(),
        }
    }
}

/// Counter cards plus their own loading flag
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationStatsState {
    /// Last good counters
    pub stats: ConsultationSummary,
    /// A stats fetch is in flight
    pub stats_loading: bool,
    /// Bumped per refresh; only the newest one may land
    #[serde(skip)]
    generation: u64,
}

/// `/admin/consultations`; pagination sits at the top level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consultations;

impl ListResource for Consultations {
    type Filters = ConsultationFilters;
    type Extra = ConsultationStatsState;

    const NAME: &'static str = "consultations";

    fn request(filters: &ConsultationFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::consultations_request(filters, page, limit)
    }
}

impl PaginatedList<Consultations> {
    /// Refetch the counter cards behind `stats_loading`
    ///
    /// A failure is reported and leaves the previous counters in place.
    pub async fn refresh_stats(&self) {
        let Some(generation) = self.modify_extra(|extra| {
            extra.generation += 1;
            extra.stats_loading = true;
            extra.generation
        }) else {
            return;
        };

        let result = self.api().consultation_stats().await;
        if let Err(err) = &result {
            self.reporter().report("consultationStats", err);
        }

        self.modify_extra(|extra| {
            if extra.generation != generation {
                debug!(generation, "discarding stale consultation stats");
                return;
            }
            if let Ok(envelope) = result {
                let summary = ConsultationSummary::from_data(&envelope.data);
                debug!(booked = summary.total_consultations_booked, "consultation stats refreshed");
                extra.stats = summary;
            }
            extra.stats_loading = false;
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use telecare_client::{MockReply, MockTransport, paths};

    fn mount(
        mock: &Arc<MockTransport>,
        reporter: &Arc<CollectingReporter>,
    ) -> PaginatedList<Consultations> {
        PaginatedList::mount(
            AdminApi::new(mock.clone()),
            reporter.clone(),
            10,
            ConsultationFilters::default(),
        )
    }

    #[test]
    fn test_summary_defaults() {
        assert_eq!(
            ConsultationSummary::from_data(&Value::Null),
            ConsultationSummary::default()
        );

        let summary = ConsultationSummary::from_data(&json!({
            "totalConsultationsBooked": "12",
            "totalRevenueGenerated": 480.5,
            "mostConsultationsBooked": ""
        }));
        assert_eq!(summary.total_consultations_booked, 12.0);
        assert_eq!(summary.total_revenue_generated, 480.5);
        assert!(summary.most_consultations_booked.is_none());
    }

    #[test]
    fn test_summary_keeps_busiest_record() {
        let summary = ConsultationSummary::from_data(&json!({
            "mostConsultationsBooked": {"doctor": "Dr. Ada", "count": 9}
        }));
        assert_eq!(
            summary.most_consultations_booked,
            Some(json!({"doctor": "Dr. Ada", "count": 9}))
        );
    }

    #[test]
    fn test_summary_keeps_tiny_numbers() {
        let summary = ConsultationSummary::from_data(&json!({
            "mostConsultationsBooked": 5e-324
        }));
        assert!(summary.most_consultations_booked.is_some());

        let summary = ConsultationSummary::from_data(&json!({
            "mostConsultationsBooked": 0
        }));
        assert!(summary.most_consultations_booked.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_stats_refresh_wins() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(paths::CONSULTATIONS, json!([]))
            .enqueue(
                paths::CONSULTATION_STATS,
                MockReply::Data(json!({"totalConsultationsBooked": 1})),
                Some(Duration::from_secs(5)),
            )
            .enqueue(
                paths::CONSULTATION_STATS,
                MockReply::Data(json!({"totalConsultationsBooked": 2})),
                Some(Duration::from_secs(1)),
            );
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        let older = list.refresh_stats();
        let newer = async {
            tokio::task::yield_now().await;
            list.refresh_stats().await;
            assert!(!list.snapshot().extra.stats_loading);
        };
        tokio::join!(older, newer);

        let state = list.snapshot();
        assert_eq!(state.extra.stats.total_consultations_booked, 2.0);
        assert!(!state.extra.stats_loading);
        assert_eq!(mock.call_count(paths::CONSULTATION_STATS), 2);
        assert!(reporter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_failure_keeps_counters() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(paths::CONSULTATIONS, json!([]))
            .respond(paths::CONSULTATION_STATS, json!({"totalConsultationsBooked": 4}));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;
        list.refresh_stats().await;

        mock.fail(paths::CONSULTATION_STATS, "down");
        list.refresh_stats().await;

        let state = list.snapshot();
        assert_eq!(state.extra.stats.total_consultations_booked, 4.0);
        assert!(!state.extra.stats_loading);
        assert_eq!(reporter.notices_for("consultationStats").len(), 1);
    }
}
