//! Paginated list hook shared by every admin table
//!
//! A [`PaginatedList`] owns `page`, `page_size` and a resource specific filter
//! record. Mounting, and any change to those three, issues exactly one fetch.
//! Mutations run through [`PaginatedList::run_action`], which drives the
//! separate `loading_actions` flag.

use crate::reporter::ErrorReporter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use telecare_client::{AdminApi, ApiRequest, ClientResult, Envelope};
use telecare_core::PaginationMeta;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One row of a list response, kept as the server sent it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON object
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Row from any JSON value; non-objects become empty rows
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    /// Server id (`_id`, else `id`)
    pub fn id(&self) -> Option<&str> {
        self.str_field("_id").or_else(|| self.str_field("id"))
    }

    /// Raw field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field as text
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Underlying object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Rows and server total extracted from one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    /// Rows in server order
    pub items: Vec<Record>,
    /// `pagination.total`, when the server sent one
    pub total: Option<u64>,
}

/// Rows found at `items_key` inside `data` (or `data` itself), plus the pagination total
pub fn extract_page(envelope: &Envelope, items_key: Option<&str>) -> ListPage {
    let rows = match items_key {
        Some(key) => envelope.data_field(key),
        None => Some(&envelope.data),
    };
    let items = rows
        .and_then(Value::as_array)
        .map(|rows| rows.iter().cloned().map(Record::from_value).collect())
        .unwrap_or_default();
    let total = envelope
        .pagination_block()
        .and_then(|block| block.get("total"))
        .and_then(Value::as_u64);

    ListPage { items, total }
}

/// A server collection that can be listed page by page
pub trait ListResource: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Resource specific filters
    type Filters: Clone + Default + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static;
    /// Extra state carried next to the rows
    type Extra: Clone + Default + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static;

    /// Name used in reports and logs
    const NAME: &'static str;
    /// Key of the row array inside `data`; `None` when `data` is the array
    const ITEMS_KEY: Option<&'static str> = None;

    /// Request for one page
    fn request(filters: &Self::Filters, page: u32, limit: u32) -> ApiRequest;

    /// Pull rows and total out of a response
    fn extract(envelope: &Envelope) -> ListPage {
        extract_page(envelope, Self::ITEMS_KEY)
    }

    /// Client side filtering applied after extraction
    fn post_filter(items: Vec<Record>) -> Vec<Record> {
        items
    }
}

/// Everything a list page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = ""))]
pub struct ListState<R: ListResource> {
    /// Current page, 1-based
    pub page: u32,
    /// Rows per page
    pub page_size: u32,
    /// Current filters
    pub filters: R::Filters,
    /// Rows of the last good response
    pub items: Arc<Vec<Record>>,
    /// Pagination computed from the server total
    pub meta: PaginationMeta,
    /// Server total, or the row count when the server sent none
    pub total_data: u64,
    /// The list fetch is in flight
    pub loading: bool,
    /// A mutation or detail lookup is in flight
    pub loading_actions: bool,
    /// Resource specific state
    pub extra: R::Extra,
}

impl<R: ListResource> ListState<R> {
    fn mounting(page: u32, page_size: u32, filters: R::Filters) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        Self {
            page,
            page_size,
            filters,
            items: Arc::new(Vec::new()),
            meta: PaginationMeta::new(page, page_size, 0),
            total_data: 0,
            loading: true,
            loading_actions: false,
            extra: R::Extra::default(),
        }
    }

    /// Total pages, never below one
    pub const fn total_pages(&self) -> u32 {
        self.meta.total_pages
    }
}

#[derive(Debug)]
struct ListShared<R: ListResource> {
    api: AdminApi,
    reporter: Arc<dyn ErrorReporter>,
    state: watch::Sender<ListState<R>>,
    generation: AtomicU64,
    actions_in_flight: AtomicUsize,
    cancel: CancellationToken,
}

struct PendingFetch {
    generation: u64,
    request: ApiRequest,
    page: u32,
    page_size: u32,
}

impl<R: ListResource> ListShared<R> {
    /// Raise `loading` and claim the next generation for the current inputs
    fn prepare(&self, state: &mut ListState<R>) -> PendingFetch {
        state.loading = true;
        PendingFetch {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            request: R::request(&state.filters, state.page, state.page_size),
            page: state.page,
            page_size: state.page_size,
        }
    }

    fn spawn_fetch(self: &Arc<Self>, pending: Option<PendingFetch>) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(pending) = pending {
                shared.fetch(pending).await;
            }
        })
    }

    /// Apply `change`; when it reports a change, start exactly one fetch
    fn update(
        self: &Arc<Self>,
        change: impl FnOnce(&mut ListState<R>) -> bool,
    ) -> Option<JoinHandle<()>> {
        let mut pending = None;
        self.state.send_if_modified(|state| {
            if !change(state) {
                return false;
            }
            pending = Some(self.prepare(state));
            true
        });

        pending.map(|pending| self.spawn_fetch(Some(pending)))
    }

    /// Fetch the current inputs again
    fn refetch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut pending = None;
        self.state
            .send_modify(|state| pending = Some(self.prepare(state)));
        self.spawn_fetch(pending)
    }

    async fn fetch(&self, pending: PendingFetch) {
        let PendingFetch {
            generation,
            request,
            page,
            page_size,
        } = pending;
        debug!(resource = R::NAME, %request, generation, "fetching list page");

        let result = tokio::select! {
            () = self.cancel.cancelled() => return,
            result = self.api.send(request) => result,
        };

        if let Err(err) = &result {
            self.reporter.report(R::NAME, err);
        }
        if self.cancel.is_cancelled() {
            return;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(resource = R::NAME, generation, "discarding stale list response");
            return;
        }

        self.state.send_modify(|state| {
            if let Ok(envelope) = result {
                let ListPage { items, total } = R::extract(&envelope);
                let total_data = total.unwrap_or(items.len() as u64);
                state.items = Arc::new(R::post_filter(items));
                state.meta = PaginationMeta::new(page, page_size, total_data);
                state.total_data = total_data;
            }
            state.loading = false;
        });
    }

    /// Raise `loading_actions` until the returned guard drops
    fn begin_action(&self) -> ActionGuard<'_, R> {
        self.actions_in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            let changed = !state.loading_actions;
            state.loading_actions = true;
            changed
        });
        ActionGuard { shared: self }
    }

    fn end_action(&self) {
        let last = self.actions_in_flight.fetch_sub(1, Ordering::SeqCst) == 1;
        if last && !self.cancel.is_cancelled() {
            self.state.send_if_modified(|state| {
                let changed = state.loading_actions;
                state.loading_actions = false;
                changed
            });
        }
    }
}

/// Ends one action when dropped, including when the action's future is cancelled
struct ActionGuard<'a, R: ListResource> {
    shared: &'a ListShared<R>,
}

impl<R: ListResource> Drop for ActionGuard<'_, R> {
    fn drop(&mut self) {
        self.shared.end_action();
    }
}

/// Handle to a mounted list
///
/// Dropping the handle unmounts it: in-flight fetches stop writing state.
#[derive(Debug)]
pub struct PaginatedList<R: ListResource> {
    shared: Arc<ListShared<R>>,
}

impl<R: ListResource> PaginatedList<R> {
    /// Mount on page 1 with `filters` and fetch it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        api: AdminApi,
        reporter: Arc<dyn ErrorReporter>,
        page_size: u32,
        filters: R::Filters,
    ) -> Self {
        Self::mount_at(api, reporter, 1, page_size, filters)
    }

    /// Mount on `page` instead of page 1
    pub fn mount_at(
        api: AdminApi,
        reporter: Arc<dyn ErrorReporter>,
        page: u32,
        page_size: u32,
        filters: R::Filters,
    ) -> Self {
        let (state, _) = watch::channel(ListState::mounting(page, page_size, filters));
        let shared = Arc::new(ListShared {
            api,
            reporter,
            state,
            generation: AtomicU64::new(0),
            actions_in_flight: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        });

        shared.refetch();
        Self { shared }
    }

    /// Go to `page` (clamped to at least 1)
    pub fn set_page(&self, page: u32) -> Option<JoinHandle<()>> {
        let page = page.max(1);
        self.shared.update(|state| {
            if state.page == page {
                return false;
            }
            state.page = page;
            true
        })
    }

    /// Change the page size; also returns to page 1
    pub fn set_page_size(&self, page_size: u32) -> Option<JoinHandle<()>> {
        let page_size = page_size.max(1);
        self.shared.update(|state| {
            if state.page_size == page_size {
                return false;
            }
            state.page_size = page_size;
            state.page = 1;
            true
        })
    }

    /// Replace the filters; also returns to page 1
    pub fn set_filters(&self, filters: R::Filters) -> Option<JoinHandle<()>> {
        self.shared.update(|state| {
            if state.filters == filters {
                return false;
            }
            state.filters = filters;
            state.page = 1;
            true
        })
    }

    /// Edit the filters in place; also returns to page 1 when they changed
    pub fn update_filters(&self, edit: impl FnOnce(&mut R::Filters)) -> Option<JoinHandle<()>> {
        let mut filters = self.shared.state.borrow().filters.clone();
        edit(&mut filters);
        self.set_filters(filters)
    }

    /// Fetch the current page again
    pub fn refetch(&self) -> JoinHandle<()> {
        self.shared.refetch()
    }

    /// Apply every emitted search value to the filters
    ///
    /// Each value goes through `apply` and resets the page to 1. The task
    /// ends when the list is dropped or the sender goes away.
    pub fn follow_search(
        &self,
        mut search: watch::Receiver<String>,
        apply: fn(&mut R::Filters, String),
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shared.cancel.cancelled() => return,
                    changed = search.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }

                let term = search.borrow_and_update().clone();
                let mut filters = shared.state.borrow().filters.clone();
                apply(&mut filters, term);
                shared.update(move |state| {
                    if state.filters == filters {
                        return false;
                    }
                    state.filters = filters;
                    state.page = 1;
                    true
                });
            }
        })
    }

    /// Run a mutation or lookup behind `loading_actions`
    ///
    /// Failures are reported under `action` and come back as `None`.
    pub async fn run_action<T, F>(&self, action: &str, work: F) -> Option<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let guard = self.shared.begin_action();
        let result = work.await;
        drop(guard);

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.shared.reporter.report(action, &err);
                None
            }
        }
    }

    /// Run a mutation and, when it succeeds, refetch the list before returning
    pub async fn mutate<F>(&self, action: &str, work: F) -> bool
    where
        F: Future<Output = ClientResult<Envelope>>,
    {
        let _guard = self.shared.begin_action();
        let result = work.await;
        let succeeded = match result {
            Ok(envelope) => envelope.success,
            Err(err) => {
                self.shared.reporter.report(action, &err);
                false
            }
        };

        if succeeded && let Err(err) = self.refetch().await {
            warn!(resource = R::NAME, action, error = %err, "refetch after mutation did not finish");
        }
        succeeded
    }

    /// Gateway used by this list
    pub fn api(&self) -> &AdminApi {
        &self.shared.api
    }

    pub(crate) fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.shared.reporter
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Edit resource specific state
    ///
    /// `None` once unmounted; the edit is skipped.
    pub(crate) fn modify_extra<T>(&self, edit: impl FnOnce(&mut R::Extra) -> T) -> Option<T> {
        if self.is_unmounted() {
            return None;
        }
        let mut output = None;
        self.shared
            .state
            .send_modify(|state| output = Some(edit(&mut state.extra)));
        output
    }

    /// Watch every state change
    pub fn subscribe(&self) -> watch::Receiver<ListState<R>> {
        self.shared.state.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ListState<R> {
        self.shared.state.borrow().clone()
    }

    /// Wait until neither the list nor an action is loading
    pub async fn wait_idle(&self) -> ListState<R> {
        let mut receiver = self.subscribe();
        match receiver
            .wait_for(|state| !state.loading && !state.loading_actions)
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl<R: ListResource> Drop for PaginatedList<R> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use telecare_client::{MockReply, MockTransport};

    #[derive(Debug, Clone, PartialEq)]
    struct Widgets;

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    struct WidgetFilters {
        kind: String,
    }

    impl ListResource for Widgets {
        type Filters = WidgetFilters;
        type Extra = ();
        const NAME: &'static str = "widgets";

        fn request(filters: &WidgetFilters, page: u32, limit: u32) -> ApiRequest {
            ApiRequest::get("/widgets")
                .query("kind", &filters.kind)
                .page(page, limit)
        }
    }

    fn mount(mock: &Arc<MockTransport>, reporter: &Arc<CollectingReporter>) -> PaginatedList<Widgets> {
        PaginatedList::mount(
            AdminApi::new(mock.clone()),
            reporter.clone(),
            20,
            WidgetFilters::default(),
        )
    }

    #[test]
    fn test_extract_page_locations() {
        let envelope = Envelope::ok(json!({"result": [{"_id": "a"}], "pagination": {"total": 7}}));
        let page = extract_page(&envelope, Some("result"));
        assert_eq!(page.items[0].id(), Some("a"));
        assert_eq!(page.total, Some(7));

        let envelope = Envelope::ok(json!([{"id": "b"}, 3])).with_pagination(json!({"total": 2}));
        let page = extract_page(&envelope, None);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id(), Some("b"));
        assert_eq!(page.items[1], Record::default());

        let page = extract_page(&Envelope::ok(Value::Null), None);
        assert_eq!(page, ListPage::default());
    }

    #[tokio::test]
    async fn test_mount_fetches_once_and_floors_pages() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_envelope(
            "/widgets",
            Envelope::ok(json!([])).with_pagination(json!({"total": 0})),
        );
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);

        let state = list.wait_idle().await;
        assert_eq!(mock.call_count("/widgets"), 1);
        assert_eq!(state.total_pages(), 1);
        assert_eq!(state.total_data, 0);
        assert_eq!(state.meta.limit, 20);
    }

    #[tokio::test]
    async fn test_total_falls_back_to_row_count() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([{"_id": "1"}, {"_id": "2"}, {"_id": "3"}]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);

        let state = list.wait_idle().await;
        assert_eq!(state.total_data, 3);
        assert_eq!(state.items.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_rows() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([{"_id": "1"}]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        mock.fail("/widgets", "down");
        list.refetch().await.unwrap();

        let state = list.snapshot();
        assert_eq!(state.items.len(), 1);
        assert!(!state.loading);
        assert_eq!(reporter.notices_for("widgets").len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_inputs_do_not_fetch() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        assert!(list.set_page(1).is_none());
        assert!(list.set_page_size(20).is_none());
        assert!(list.set_filters(WidgetFilters::default()).is_none());
        assert_eq!(mock.call_count("/widgets"), 1);
    }

    #[tokio::test]
    async fn test_page_size_change_resets_page() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        list.set_page(3).unwrap().await.unwrap();
        list.set_page_size(50).unwrap().await.unwrap();

        let last = mock.calls_to("/widgets").pop().unwrap();
        assert_eq!(last.query_value("page"), Some("1"));
        assert_eq!(last.query_value("limit"), Some("50"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_pages_keep_latest() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        mock.enqueue("/widgets", MockReply::Data(json!([{"_id": "page-2"}])), Some(Duration::from_secs(3)))
            .enqueue("/widgets", MockReply::Data(json!([{"_id": "page-3"}])), Some(Duration::from_secs(1)));
        let slow = list.set_page(2).unwrap();
        let fast = list.set_page(3).unwrap();
        fast.await.unwrap();
        slow.await.unwrap();

        let state = list.snapshot();
        assert_eq!(state.page, 3);
        assert_eq!(state.items[0].id(), Some("page-3"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_actions_use_their_own_flag() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        mock.respond("/widgets/1", json!({"_id": "1"}));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        let mut states = list.subscribe();
        let found = list
            .run_action("widgetById", list.api().send(ApiRequest::get("/widgets/1")))
            .await
            .unwrap();
        assert_eq!(found.data["_id"], json!("1"));

        assert!(states.has_changed().unwrap());
        let state = states.borrow_and_update().clone();
        assert!(!state.loading_actions);
        assert!(!state.loading);

        let missing = list
            .run_action("widgetById", list.api().send(ApiRequest::get("/widgets/2")))
            .await;
        assert!(missing.is_none());
        assert_eq!(reporter.notices_for("widgetById").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_action_clears_its_flag() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]))
            .respond("/widgets/slow", json!({}))
            .delay("/widgets/slow", Duration::from_secs(10));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        let timed_out = tokio::time::timeout(
            Duration::from_secs(1),
            list.run_action("slow", list.api().send(ApiRequest::get("/widgets/slow"))),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!list.snapshot().loading_actions);

        let state = tokio::time::timeout(Duration::from_secs(60), list.wait_idle())
            .await
            .unwrap();
        assert!(!state.loading_actions);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_refetches_on_success_only() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        mock.respond("/widgets/1/delete", json!({}));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        assert!(list
            .mutate("deleteWidget", list.api().send(ApiRequest::delete("/widgets/1/delete")))
            .await);
        assert_eq!(mock.call_count("/widgets"), 2);

        assert!(!list
            .mutate("deleteWidget", list.api().send(ApiRequest::delete("/widgets/9")))
            .await);
        assert_eq!(mock.call_count("/widgets"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_search_resets_page() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/widgets", json!([]));
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;
        list.set_page(4).unwrap().await.unwrap();

        let (search, receiver) = watch::channel(String::new());
        let follower = list.follow_search(receiver, |filters, term| filters.kind = term);
        search.send("gear".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        list.wait_idle().await;

        let state = list.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.filters.kind, "gear");
        let last = mock.calls_to("/widgets").pop().unwrap();
        assert_eq!(last.query_value("kind"), Some("gear"));
        assert_eq!(last.query_value("page"), Some("1"));

        drop(search);
        follower.await.unwrap();
    }
}
