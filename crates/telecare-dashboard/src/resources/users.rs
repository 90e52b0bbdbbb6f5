//! User management table and the lookups behind the user detail page

use crate::list::{ListResource, PaginatedList, Record, extract_page};
use futures::future::try_join4;
use serde::Serialize;
use serde_json::Value;
use telecare_client::{AdminApi, ApiRequest, ClientError, Envelope, UserFilters};
use telecare_core::DashboardConfig;

/// `/admin/users`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Users;

impl ListResource for Users {
    type Filters = UserFilters;
    type Extra = ();

    const NAME: &'static str = "users";

    fn request(filters: &UserFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::users_request(filters, page, limit)
    }

    /// Admin accounts never show up in the table. The server total still
    /// counts them, so `total_data` and page counts can run ahead of the rows.
    fn post_filter(items: Vec<Record>) -> Vec<Record> {
        items
            .into_iter()
            .filter(|user| user.str_field("role") != Some("admin"))
            .collect()
    }
}

/// Pagination blocks of the detail sub-lists
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDetailMeta {
    /// Orders pagination
    pub orders: Value,
    /// Consultations pagination
    pub consultations: Value,
    /// Reports pagination
    pub reports: Value,
}

/// Everything the user detail page shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDetail {
    /// The user record, when the server returned one
    pub user: Option<Value>,
    /// Orders placed
    pub orders: Vec<Record>,
    /// Consultations booked
    pub consultations: Vec<Record>,
    /// Reports uploaded
    pub reports: Vec<Record>,
    /// Pagination of the three lists
    pub meta: UserDetailMeta,
}

fn pagination_of(envelope: &Envelope) -> Value {
    envelope
        .pagination_block()
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

impl UserDetail {
    fn from_envelopes(
        user: Envelope,
        orders: Envelope,
        consultations: Envelope,
        reports: Envelope,
    ) -> Self {
        Self {
            user: Some(user.data).filter(|data| !data.is_null()),
            orders: extract_page(&orders, None).items,
            consultations: extract_page(&consultations, None).items,
            reports: extract_page(&reports, None).items,
            meta: UserDetailMeta {
                orders: pagination_of(&orders),
                consultations: pagination_of(&consultations),
                reports: pagination_of(&reports),
            },
        }
    }
}

impl PaginatedList<Users> {
    /// Activate or deactivate a user, then refresh the table
    pub async fn update_user_status(&self, id: &str, is_active: bool) -> bool {
        self.mutate("updateUserStatus", self.api().update_user_status(id, is_active))
            .await
    }

    /// User record plus orders, consultations and reports, fetched together
    ///
    /// Any one failing fails the whole lookup. Each sub-list asks for
    /// `detail_page_size` rows.
    pub async fn user_detail(&self, id: &str, config: &DashboardConfig) -> Option<UserDetail> {
        let api = self.api();
        let page_size = config.detail_page_size;
        self.run_action("userDetail", async {
            let (user, orders, consultations, reports) = try_join4(
                api.user_by_id(id),
                api.user_orders(id, 1, page_size),
                api.user_consultations(id, 1, page_size),
                api.reports_by_user(id, 1, page_size),
            )
            .await?;
            Ok::<_, ClientError>(UserDetail::from_envelopes(
                user,
                orders,
                consultations,
                reports,
            ))
        })
        .await
    }

    /// One page of a user's reports
    pub async fn reports_by_user(&self, id: &str, page: u32, limit: u32) -> Option<Envelope> {
        self.run_action("reportsByUser", self.api().reports_by_user(id, page, limit))
            .await
    }

    /// One page of a user's orders
    pub async fn user_orders(&self, id: &str, page: u32, limit: u32) -> Option<Envelope> {
        self.run_action("userOrders", self.api().user_orders(id, page, limit))
            .await
    }

    /// One page of a user's consultations
    pub async fn user_consultations(&self, id: &str, page: u32, limit: u32) -> Option<Envelope> {
        self.run_action("userConsultations", self.api().user_consultations(id, page, limit))
            .await
    }

    /// Questionnaire answers of a user
    pub async fn user_questions(&self, id: &str) -> Option<Value> {
        self.run_action("userQuestions", self.api().user_questions(id))
            .await
            .map(|envelope| envelope.data)
    }

    /// Doctor profile shown from the user table
    pub async fn doctor_detail(&self, id: &str) -> Option<Value> {
        self.run_action("doctorDetail", self.api().doctor_by_id(id))
            .await
            .map(|envelope| envelope.data)
    }

    /// One page of a doctor's consultations
    pub async fn doctor_consultations(&self, id: &str, page: u32, limit: u32) -> Option<Envelope> {
        self.run_action("doctorConsultations", self.api().doctor_consultations(id, page, limit))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use telecare_client::{MockTransport, paths};

    fn mount(
        mock: &Arc<MockTransport>,
        reporter: &Arc<CollectingReporter>,
    ) -> PaginatedList<Users> {
        PaginatedList::mount(
            AdminApi::new(mock.clone()),
            reporter.clone(),
            10,
            UserFilters::default(),
        )
    }

    fn stub_detail(mock: &MockTransport) {
        mock.respond(paths::USERS, json!([]))
            .respond("/admin/users/u1", json!({"_id": "u1", "name": "Ana"}))
            .respond("/admin/users/u1/orders", json!([{"_id": "o1"}]))
            .respond("/admin/users/u1/consultations", json!([]))
            .respond("/admin/users/u1/reports", json!([]));
    }

    #[test]
    fn test_admins_are_filtered_out() {
        let rows = vec![
            Record::from_value(json!({"_id": "1", "role": "user"})),
            Record::from_value(json!({"_id": "2", "role": "admin"})),
            Record::from_value(json!({"_id": "3"})),
        ];
        let kept = Users::post_filter(rows);
        let ids: Vec<_> = kept.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_detail_from_envelopes() {
        let detail = UserDetail::from_envelopes(
            Envelope::ok(json!({"_id": "u1", "name": "Ana"})),
            Envelope::ok(json!([{"_id": "o1"}])).with_pagination(json!({"total": 1})),
            Envelope::ok(Value::Null),
            Envelope::ok(json!([])),
        );

        assert_eq!(detail.user.unwrap()["name"], json!("Ana"));
        assert_eq!(detail.orders.len(), 1);
        assert!(detail.consultations.is_empty());
        assert_eq!(detail.meta.orders, json!({"total": 1}));
        assert_eq!(detail.meta.reports, json!({}));
    }

    #[test]
    fn test_request_carries_every_filter() {
        let request = Users::request(
            &UserFilters {
                role: "doctor".to_string(),
                ..UserFilters::default()
            },
            2,
            10,
        );
        assert_eq!(request.query_value("role"), Some("doctor"));
        assert_eq!(request.query_value("isActive"), Some(""));
        assert_eq!(request.query_value("page"), Some("2"));
    }

    #[tokio::test]
    async fn test_detail_uses_configured_page_size() {
        let mock = Arc::new(MockTransport::new());
        stub_detail(&mock);
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        let config = DashboardConfig {
            detail_page_size: 50,
            ..DashboardConfig::default()
        };
        let detail = list.user_detail("u1", &config).await.unwrap();

        assert_eq!(detail.user.unwrap()["name"], json!("Ana"));
        assert_eq!(detail.orders.len(), 1);
        for path in [
            "/admin/users/u1/orders",
            "/admin/users/u1/consultations",
            "/admin/users/u1/reports",
        ] {
            let calls = mock.calls_to(path);
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].query_value("limit"), Some("50"));
            assert_eq!(calls[0].query_value("page"), Some("1"));
        }
        assert!(!list.snapshot().loading_actions);
    }

    #[tokio::test]
    async fn test_detail_fails_as_a_whole() {
        let mock = Arc::new(MockTransport::new());
        stub_detail(&mock);
        mock.fail("/admin/users/u1/reports", "down");
        let reporter = Arc::new(CollectingReporter::new());
        let list = mount(&mock, &reporter);
        list.wait_idle().await;

        let detail = list.user_detail("u1", &DashboardConfig::default()).await;

        assert!(detail.is_none());
        assert_eq!(reporter.notices_for("userDetail").len(), 1);
        assert_eq!(
            mock.calls_to("/admin/users/u1/orders")[0].query_value("limit"),
            Some("200")
        );
    }
}
