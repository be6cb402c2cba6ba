use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub product_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<BigDecimal>,
}

/// Order as served by the order API. The server computes `total_amount`;
/// clients never send totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequestItem {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderRequestItem>,
}

/// Typed client for the order API. Stock validation and totals live on the
/// server; rejections come back as [`crate::ApiError::Api`] with the
/// server's message intact.
#[derive(Clone)]
pub struct OrdersClient {
    api: ApiClient,
}

impl OrdersClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All orders; an admin-gated endpoint.
    pub async fn list_all(&self) -> ApiResult<Vec<Order>> {
        self.api.get_json("/orders").await
    }

    /// Orders belonging to the authenticated principal.
    pub async fn my_orders(&self) -> ApiResult<Vec<Order>> {
        self.api.get_json("/orders/my-orders").await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Order> {
        self.api.get_json(&format!("/orders/{id}")).await
    }

    pub async fn create(&self, request: &OrderRequest) -> ApiResult<Order> {
        self.api.post_json("/orders", request).await
    }

    pub async fn update_status(&self, id: i64, status: OrderStatus) -> ApiResult<Order> {
        self.api
            .put_empty(&format!("/orders/{id}/status?status={}", status.as_str()))
            .await
    }
}
