//! Resource fetchers for the trends dashboard
//!
//! Each fetcher calls one gateway endpoint and normalizes the payload. They
//! return the client error untouched; catching and reporting happens in the
//! orchestrator so the state slice can keep its last known-good value.

use crate::model::{ConsultationTrend, DashboardStats, DataPoint, PurchaseTrend, RegistrationTrend};
use crate::normalize::{self, CONSULTATION_SHAPE, PURCHASE_SHAPE, REGISTRATION_SHAPE};
use serde::Serialize;
use std::fmt;
use telecare_client::{AdminApi, ClientResult};
use telecare_core::FilterSet;
use tracing::{debug, instrument};

/// Every resource the trends dashboard tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardResource {
    /// Platform counters
    Stats,
    /// Registration chart
    UserRegistrations,
    /// Consultation chart
    Consultations,
    /// Product purchase chart
    ProductPurchases,
    /// Doctor leaderboard
    TopDoctors,
}

impl DashboardResource {
    /// All resources, in initial-load order
    pub const ALL: [Self; 5] = [
        Self::Stats,
        Self::UserRegistrations,
        Self::Consultations,
        Self::ProductPurchases,
        Self::TopDoctors,
    ];

    /// Name used in reports and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::UserRegistrations => "userRegistrationTrends",
            Self::Consultations => "consultationTrends",
            Self::ProductPurchases => "productPurchaseTrends",
            Self::TopDoctors => "topDoctors",
        }
    }
}

impl fmt::Display for DashboardResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch the dashboard counters
#[instrument(skip(api))]
pub async fn fetch_dashboard_stats(api: &AdminApi) -> ClientResult<DashboardStats> {
    let envelope = api.dashboard_stats().await?;
    Ok(normalize::normalize_dashboard_stats(&envelope.data))
}

/// Fetch the registration chart for `filter`
#[instrument(skip(api, filter), fields(filter = %filter))]
pub async fn fetch_user_registrations(
    api: &AdminApi,
    filter: &FilterSet,
) -> ClientResult<RegistrationTrend> {
    let envelope = api.user_registration_trends(filter).await?;
    let series: RegistrationTrend =
        normalize::normalize_trend(&envelope.data, filter, REGISTRATION_SHAPE);
    debug!(points = series.chart_data.len(), granularity = %series.granularity, "registrations normalized");
    Ok(series)
}

/// Fetch the consultation chart for `filter`
#[instrument(skip(api, filter), fields(filter = %filter))]
pub async fn fetch_consultation_trend(
    api: &AdminApi,
    filter: &FilterSet,
) -> ClientResult<ConsultationTrend> {
    let envelope = api.consultation_trends(filter).await?;
    let series: ConsultationTrend =
        normalize::normalize_trend(&envelope.data, filter, CONSULTATION_SHAPE);
    debug!(points = series.chart_data.len(), granularity = %series.granularity, "consultations normalized");
    Ok(series)
}

/// Fetch the product purchase chart and best sellers for `filter`
#[instrument(skip(api, filter), fields(filter = %filter))]
pub async fn fetch_purchase_trend(api: &AdminApi, filter: &FilterSet) -> ClientResult<PurchaseTrend> {
    let envelope = api.product_purchase_trends(filter).await?;
    let series: PurchaseTrend = normalize::normalize_trend(&envelope.data, filter, PURCHASE_SHAPE);
    debug!(points = series.chart_data.len(), granularity = %series.granularity, "purchases normalized");
    Ok(series)
}

/// Fetch the all-time doctor leaderboard
#[instrument(skip(api))]
pub async fn fetch_top_doctors(api: &AdminApi) -> ClientResult<Vec<DataPoint>> {
    let envelope = api.top_doctors_all_time().await?;
    Ok(normalize::normalize_top_doctors(&envelope.data))
}
