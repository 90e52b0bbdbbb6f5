//! Product catalog table

use crate::list::{ListResource, PaginatedList};
use serde_json::Value;
use telecare_client::{AdminApi, ApiRequest, ProductFilters};

/// `/product/admin/get`; rows live under `data.result`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Products;

impl ListResource for Products {
    type Filters = ProductFilters;
    type Extra = ();

    const NAME: &'static str = "products";
    const ITEMS_KEY: Option<&'static str> = Some("result");

    fn request(filters: &ProductFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::products_request(filters, page, limit)
    }
}

impl PaginatedList<Products> {
    /// Add a product, then refresh the table
    pub async fn create_product(&self, product: Value) -> bool {
        self.mutate("createProduct", self.api().create_product(product))
            .await
    }

    /// Edit a product, then refresh the table
    pub async fn update_product(&self, id: &str, product: Value) -> bool {
        self.mutate("updateProduct", self.api().update_product(id, product))
            .await
    }

    /// Delete a product, then refresh the table
    pub async fn delete_product(&self, id: &str) -> bool {
        self.mutate("deleteProduct", self.api().delete_product(id))
            .await
    }

    /// One product record
    pub async fn product_by_id(&self, id: &str) -> Option<Value> {
        self.run_action("productById", self.api().product_by_id(id))
            .await
            .map(|envelope| envelope.data)
    }
}
