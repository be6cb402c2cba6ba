pub mod config;
pub mod error;
pub mod http;
pub mod orders;
pub mod products;
pub mod views;

pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use http::ApiClient;
pub use orders::{Order, OrderItem, OrderRequest, OrderRequestItem, OrderStatus, OrdersClient};
pub use products::{Product, ProductsClient};
pub use views::{permitted_views, resolve, View};
