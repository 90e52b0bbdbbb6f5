//! Order management table

use crate::list::{ListResource, PaginatedList};
use serde_json::Value;
use telecare_client::{AdminApi, ApiRequest, OrderFilters};

/// `/order/admin/all-orders`; rows live under `data.result`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orders;

impl ListResource for Orders {
    type Filters = OrderFilters;
    type Extra = ();

    const NAME: &'static str = "orders";
    const ITEMS_KEY: Option<&'static str> = Some("result");

    fn request(filters: &OrderFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::orders_request(filters, page, limit)
    }
}

impl PaginatedList<Orders> {
    /// Change an order's status fields, then refresh the table
    pub async fn update_order(&self, id: &str, order: Value) -> bool {
        self.mutate("updateOrder", self.api().update_order(id, order))
            .await
    }

    /// Delete an order, then refresh the table
    pub async fn delete_order(&self, id: &str) -> bool {
        self.mutate("deleteOrder", self.api().delete_order(id)).await
    }
}
