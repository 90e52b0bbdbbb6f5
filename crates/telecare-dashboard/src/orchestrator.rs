//! Trends dashboard orchestrator
//!
//! Owns five state slices (stats, three trend charts, the doctor leaderboard)
//! behind a single watch channel. Construction runs the initial load: every
//! fetcher concurrently, joined, with individual failures reported and
//! ignored. Filter changes after that refetch only the affected chart.
//!
//! Filter changes that arrive while the initial load is still running are
//! recorded and replayed once, after it settles, for every chart whose filter
//! moved away from the one it was loaded with.

use crate::fetcher::{self, DashboardResource};
use crate::model::{
    ConsultationTrend, DashboardStats, DataPoint, PurchaseTrend, RegistrationTrend, ResourceState,
    TrendSeries,
};
use crate::reporter::ErrorReporter;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use telecare_client::{AdminApi, ClientResult};
use telecare_core::{FilterSet, Granularity};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// One FilterSet per trend chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendFilters {
    /// Registration chart period
    pub user_registrations: FilterSet,
    /// Consultation chart period
    pub consultations: FilterSet,
    /// Product purchase chart period
    pub product_purchases: FilterSet,
}

impl TrendFilters {
    /// Filter of `chart`
    pub const fn get(&self, chart: TrendChart) -> &FilterSet {
        match chart {
            TrendChart::UserRegistrations => &self.user_registrations,
            TrendChart::Consultations => &self.consultations,
            TrendChart::ProductPurchases => &self.product_purchases,
        }
    }

    const fn get_mut(&mut self, chart: TrendChart) -> &mut FilterSet {
        match chart {
            TrendChart::UserRegistrations => &mut self.user_registrations,
            TrendChart::Consultations => &mut self.consultations,
            TrendChart::ProductPurchases => &mut self.product_purchases,
        }
    }
}

/// The filterable trend charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendChart {
    /// Registrations over time
    UserRegistrations,
    /// Consultations over time
    Consultations,
    /// Product purchases over time
    ProductPurchases,
}

impl TrendChart {
    /// All charts
    pub const ALL: [Self; 3] = [
        Self::UserRegistrations,
        Self::Consultations,
        Self::ProductPurchases,
    ];

    /// Resource backing the chart
    pub const fn resource(self) -> DashboardResource {
        match self {
            Self::UserRegistrations => DashboardResource::UserRegistrations,
            Self::Consultations => DashboardResource::Consultations,
            Self::ProductPurchases => DashboardResource::ProductPurchases,
        }
    }

    const fn loading_mut(self, state: &mut TrendsState) -> &mut bool {
        match self {
            Self::UserRegistrations => &mut state.user_registrations.loading,
            Self::Consultations => &mut state.consultations.loading,
            Self::ProductPurchases => &mut state.product_purchases.loading,
        }
    }
}

/// Everything the dashboard page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsState {
    /// The initial load is running
    pub loading_initial: bool,
    /// The initial load has settled; never goes back to false
    pub initial_loaded: bool,
    /// Platform counters
    pub stats: ResourceState<DashboardStats>,
    /// Registration chart
    pub user_registrations: ResourceState<RegistrationTrend>,
    /// Consultation chart
    pub consultations: ResourceState<ConsultationTrend>,
    /// Product purchase chart
    pub product_purchases: ResourceState<PurchaseTrend>,
    /// Doctor leaderboard
    pub top_doctors: ResourceState<Vec<DataPoint>>,
    /// Current filter of each chart
    pub filters: TrendFilters,
}

impl TrendsState {
    fn mounting(filters: TrendFilters) -> Self {
        Self {
            loading_initial: true,
            initial_loaded: false,
            stats: ResourceState::pending(DashboardStats::default()),
            user_registrations: ResourceState::pending(TrendSeries::empty(Granularity::Daily)),
            consultations: ResourceState::pending(TrendSeries::empty(Granularity::Daily)),
            product_purchases: ResourceState::pending(TrendSeries {
                top_products: Some(Vec::new()),
                ..TrendSeries::empty(Granularity::Monthly)
            }),
            top_doctors: ResourceState::pending(Vec::new()),
            filters,
        }
    }

    /// Whether any slice or the initial load is in flight
    pub const fn is_busy(&self) -> bool {
        self.loading_initial
            || self.stats.loading
            || self.user_registrations.loading
            || self.consultations.loading
            || self.product_purchases.loading
            || self.top_doctors.loading
    }
}

type Slot<T> = fn(&mut TrendsState) -> &mut ResourceState<T>;

fn stats_slot(state: &mut TrendsState) -> &mut ResourceState<DashboardStats> {
    &mut state.stats
}

fn user_registrations_slot(state: &mut TrendsState) -> &mut ResourceState<RegistrationTrend> {
    &mut state.user_registrations
}

fn consultations_slot(state: &mut TrendsState) -> &mut ResourceState<ConsultationTrend> {
    &mut state.consultations
}

fn product_purchases_slot(state: &mut TrendsState) -> &mut ResourceState<PurchaseTrend> {
    &mut state.product_purchases
}

fn top_doctors_slot(state: &mut TrendsState) -> &mut ResourceState<Vec<DataPoint>> {
    &mut state.top_doctors
}

/// Latest issued request id per resource
#[derive(Debug, Default)]
struct Generations {
    stats: AtomicU64,
    user_registrations: AtomicU64,
    consultations: AtomicU64,
    product_purchases: AtomicU64,
    top_doctors: AtomicU64,
}

impl Generations {
    const fn counter(&self, resource: DashboardResource) -> &AtomicU64 {
        match resource {
            DashboardResource::Stats => &self.stats,
            DashboardResource::UserRegistrations => &self.user_registrations,
            DashboardResource::Consultations => &self.consultations,
            DashboardResource::ProductPurchases => &self.product_purchases,
            DashboardResource::TopDoctors => &self.top_doctors,
        }
    }

    fn next(&self, resource: DashboardResource) -> u64 {
        self.counter(resource).fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, resource: DashboardResource, generation: u64) -> bool {
        self.counter(resource).load(Ordering::SeqCst) == generation
    }
}

#[derive(Debug)]
struct Shared {
    api: AdminApi,
    reporter: Arc<dyn ErrorReporter>,
    state: watch::Sender<TrendsState>,
    generations: Generations,
    initial_loaded: AtomicBool,
    /// Latest requested filters; also serializes the initial-load flip
    requested: Mutex<TrendFilters>,
    cancel: CancellationToken,
}

impl Shared {
    /// Await `fetch` and write its outcome into the slot, unless unmounted or superseded
    async fn complete<T, F>(
        &self,
        resource: DashboardResource,
        generation: u64,
        slot: Slot<T>,
        fetch: F,
    ) where
        F: Future<Output = ClientResult<T>>,
    {
        let result = tokio::select! {
            () = self.cancel.cancelled() => {
                debug!(%resource, "unmounted, dropping in-flight fetch");
                return;
            }
            result = fetch => result,
        };

        if let Err(err) = &result {
            self.reporter.report(resource.as_str(), err);
        }

        if self.cancel.is_cancelled() {
            return;
        }
        if !self.generations.is_latest(resource, generation) {
            debug!(%resource, generation, "discarding stale response");
            return;
        }

        self.state.send_modify(move |state| {
            let slice = slot(state);
            if let Ok(data) = result {
                slice.data = Arc::new(data);
            }
            slice.loading = false;
        });
    }

    async fn load_stats(&self, generation: u64) {
        self.complete(
            DashboardResource::Stats,
            generation,
            stats_slot,
            fetcher::fetch_dashboard_stats(&self.api),
        )
        .await;
    }

    async fn load_top_doctors(&self, generation: u64) {
        self.complete(
            DashboardResource::TopDoctors,
            generation,
            top_doctors_slot,
            fetcher::fetch_top_doctors(&self.api),
        )
        .await;
    }

    async fn load_chart(&self, chart: TrendChart, generation: u64, filter: &FilterSet) {
        let resource = chart.resource();
        match chart {
            TrendChart::UserRegistrations => {
                self.complete(
                    resource,
                    generation,
                    user_registrations_slot,
                    fetcher::fetch_user_registrations(&self.api, filter),
                )
                .await;
            }
            TrendChart::Consultations => {
                self.complete(
                    resource,
                    generation,
                    consultations_slot,
                    fetcher::fetch_consultation_trend(&self.api, filter),
                )
                .await;
            }
            TrendChart::ProductPurchases => {
                self.complete(
                    resource,
                    generation,
                    product_purchases_slot,
                    fetcher::fetch_purchase_trend(&self.api, filter),
                )
                .await;
            }
        }
    }

    /// Bump the generation and raise the loading flag; the caller spawns the fetch
    fn begin_chart(&self, chart: TrendChart, state: &mut TrendsState) -> u64 {
        *chart.loading_mut(state) = true;
        self.generations.next(chart.resource())
    }

    fn spawn_chart(
        self: &Arc<Self>,
        chart: TrendChart,
        generation: u64,
        filter: FilterSet,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.load_chart(chart, generation, &filter).await;
        })
    }

    #[instrument(skip_all)]
    async fn initial_load(self: Arc<Self>, filters: TrendFilters) {
        info!("initial dashboard load started");
        let generations = &self.generations;
        tokio::join!(
            self.load_stats(generations.next(DashboardResource::Stats)),
            self.load_chart(
                TrendChart::UserRegistrations,
                generations.next(DashboardResource::UserRegistrations),
                &filters.user_registrations,
            ),
            self.load_chart(
                TrendChart::Consultations,
                generations.next(DashboardResource::Consultations),
                &filters.consultations,
            ),
            self.load_chart(
                TrendChart::ProductPurchases,
                generations.next(DashboardResource::ProductPurchases),
                &filters.product_purchases,
            ),
            self.load_top_doctors(generations.next(DashboardResource::TopDoctors)),
        );

        if self.cancel.is_cancelled() {
            debug!("unmounted during initial load");
            return;
        }

        let deferred = {
            let requested = self.requested.lock();
            let moved: Vec<(TrendChart, FilterSet)> = TrendChart::ALL
                .into_iter()
                .filter(|chart| requested.get(*chart) != filters.get(*chart))
                .map(|chart| (chart, requested.get(chart).clone()))
                .collect();

            let mut started = Vec::with_capacity(moved.len());
            self.state.send_modify(|state| {
                state.loading_initial = false;
                state.initial_loaded = true;
                for (chart, filter) in &moved {
                    started.push((*chart, self.begin_chart(*chart, state), filter.clone()));
                }
            });
            self.initial_loaded.store(true, Ordering::SeqCst);
            started
        };

        info!(deferred = deferred.len(), "initial dashboard load settled");
        for (chart, generation, filter) in deferred {
            debug!(resource = %chart.resource(), %filter, "replaying filter change made during initial load");
            self.spawn_chart(chart, generation, filter);
        }
    }
}

/// Handle to a mounted trends dashboard
///
/// Dropping the handle unmounts it: in-flight fetches stop writing state.
#[derive(Debug)]
pub struct TrendsDashboard {
    shared: Arc<Shared>,
}

impl TrendsDashboard {
    /// Mount the dashboard and start the initial load
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(api: AdminApi, reporter: Arc<dyn ErrorReporter>, filters: TrendFilters) -> Self {
        let (state, _) = watch::channel(TrendsState::mounting(filters.clone()));
        let shared = Arc::new(Shared {
            api,
            reporter,
            state,
            generations: Generations::default(),
            initial_loaded: AtomicBool::new(false),
            requested: Mutex::new(filters.clone()),
            cancel: CancellationToken::new(),
        });

        tokio::spawn(Arc::clone(&shared).initial_load(filters));
        Self { shared }
    }

    /// Change the registration chart period
    pub fn set_user_registration_filter(&self, filter: FilterSet) -> Option<JoinHandle<()>> {
        self.set_filter(TrendChart::UserRegistrations, filter)
    }

    /// Change the consultation chart period
    pub fn set_consultation_filter(&self, filter: FilterSet) -> Option<JoinHandle<()>> {
        self.set_filter(TrendChart::Consultations, filter)
    }

    /// Change the product purchase chart period
    pub fn set_product_filter(&self, filter: FilterSet) -> Option<JoinHandle<()>> {
        self.set_filter(TrendChart::ProductPurchases, filter)
    }

    /// Change the period of `chart`
    ///
    /// Returns the spawned refetch, or `None` when the filter is unchanged or
    /// the initial load has not settled yet (the change is replayed then).
    pub fn set_filter(&self, chart: TrendChart, filter: FilterSet) -> Option<JoinHandle<()>> {
        let mut requested = self.shared.requested.lock();
        if *requested.get(chart) == filter {
            return None;
        }
        *requested.get_mut(chart) = filter.clone();

        let initial_loaded = self.shared.initial_loaded.load(Ordering::SeqCst);
        let mut generation = 0;
        self.shared.state.send_modify(|state| {
            *state.filters.get_mut(chart) = filter.clone();
            if initial_loaded {
                generation = self.shared.begin_chart(chart, state);
            }
        });
        drop(requested);

        if !initial_loaded {
            debug!(resource = %chart.resource(), %filter, "filter change deferred until initial load settles");
            return None;
        }

        debug!(resource = %chart.resource(), %filter, generation, "refetching chart");
        Some(self.shared.spawn_chart(chart, generation, filter))
    }

    /// Refetch the doctor leaderboard on its own
    pub fn refresh_top_doctors(&self) -> JoinHandle<()> {
        let generation = self.shared.generations.next(DashboardResource::TopDoctors);
        self.shared
            .state
            .send_modify(|state| state.top_doctors.loading = true);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.load_top_doctors(generation).await })
    }

    /// Refetch the platform counters on their own
    pub fn refresh_stats(&self) -> JoinHandle<()> {
        let generation = self.shared.generations.next(DashboardResource::Stats);
        self.shared
            .state
            .send_modify(|state| state.stats.loading = true);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.load_stats(generation).await })
    }

    /// Watch every state change
    pub fn subscribe(&self) -> watch::Receiver<TrendsState> {
        self.shared.state.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> TrendsState {
        self.shared.state.borrow().clone()
    }

    /// Whether the initial load has settled
    pub fn is_initial_loaded(&self) -> bool {
        self.shared.initial_loaded.load(Ordering::SeqCst)
    }

    /// Wait for the initial load to settle and return the state at that point
    pub async fn wait_initial(&self) -> TrendsState {
        self.wait_until(|state| state.initial_loaded).await
    }

    /// Wait until nothing is loading
    pub async fn wait_idle(&self) -> TrendsState {
        self.wait_until(|state| state.initial_loaded && !state.is_busy())
            .await
    }

    async fn wait_until(&self, mut ready: impl FnMut(&TrendsState) -> bool) -> TrendsState {
        let mut receiver = self.subscribe();
        match receiver.wait_for(&mut ready).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl Drop for TrendsDashboard {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
