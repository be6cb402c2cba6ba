use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::ApiClient;

/// Catalog entry as served by the product API. Prices are decimal money
/// values; decoding accepts both JSON numbers and strings, and the server
/// owns rounding and currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub stock_quantity: i64,
}

/// Typed client for the product catalog API.
#[derive(Clone)]
pub struct ProductsClient {
    api: ApiClient,
}

impl ProductsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ApiResult<Vec<Product>> {
        self.api.get_json("/products").await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Product> {
        self.api.get_json(&format!("/products/{id}")).await
    }

    pub async fn create(&self, product: &Product) -> ApiResult<Product> {
        self.api.post_json("/products", product).await
    }

    pub async fn update(&self, id: i64, product: &Product) -> ApiResult<Product> {
        self.api.put_json(&format!("/products/{id}"), product).await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api.delete(&format!("/products/{id}")).await
    }
}
