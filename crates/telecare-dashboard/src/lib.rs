//! Data orchestration for the Telecare admin dashboard
//!
//! The [`TrendsDashboard`] orchestrator drives the analytics page: an initial
//! load that fans out to every resource fetcher and then per-chart refetches
//! when a period filter changes. [`PaginatedList`] drives every admin table.
//! Both keep their state in a `tokio::sync::watch` channel, never propagate
//! fetch failures, and report them through an [`ErrorReporter`].

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod debounce;
pub mod fetcher;
pub mod list;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod reporter;
pub mod resources;

// Re-export commonly used types
pub use debounce::Debouncer;
pub use fetcher::DashboardResource;
pub use list::{ListResource, ListState, PaginatedList, Record};
pub use model::{
    ConsultationTrend, DashboardStats, DataPoint, PointValue, PurchaseTrend, RegistrationTrend,
    ResourceState, TimeAxisKey, TrendSeries,
};
pub use orchestrator::{TrendChart, TrendFilters, TrendsDashboard, TrendsState};
pub use reporter::{CollectingReporter, ErrorReporter, Notice, TracingReporter};
