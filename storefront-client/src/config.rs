use std::env;

/// Base URLs for the two backend APIs. Deployment-time settings; the
/// defaults match the local development stack.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub product_api_url: String,
    pub order_api_url: String,
}

impl ClientConfig {
    pub fn new(product_api_url: impl Into<String>, order_api_url: impl Into<String>) -> Self {
        Self {
            product_api_url: product_api_url.into(),
            order_api_url: order_api_url.into(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8083", "http://localhost:8082")
    }
}

pub fn load_client_config() -> ClientConfig {
    let defaults = ClientConfig::default();
    ClientConfig {
        product_api_url: env_or("PRODUCT_API_URL", defaults.product_api_url),
        order_api_url: env_or("ORDER_API_URL", defaults.order_api_url),
    }
}

fn env_or(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default,
    }
}
