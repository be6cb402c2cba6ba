use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use storefront_session::store::TokenStore;

use crate::error::{ApiError, ApiResult};

/// HTTP client for one backend base URL. The current bearer token is read
/// from the shared token store on every request; this layer never talks to
/// the session manager, so request code never blocks on session machinery.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self::with_client(Client::new(), base_url, store)
    }

    pub fn with_client(
        http: Client,
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        // A request without a token is allowed; some endpoints accept
        // anonymous reads and the rest answer 401.
        match self.store.get() {
            Some(token) => builder.bearer_auth(token.value),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // The stored token is no longer accepted; drop it and let the
            // rejection propagate. Recovery is a later refresh cycle or a
            // fresh login, never a retry with the same token.
            warn!(url = %response.url(), "401 from backend, clearing stored token");
            self.store.clear();
            return Err(ApiError::Unauthorized);
        }

        let status = response.status();
        if !status.is_success() {
            let message = extract_message(response).await;
            debug!(status = status.as_u16(), body = %message, "backend rejected request");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        decode(response).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .execute(self.request(Method::PUT, path).json(body))
            .await?;
        decode(response).await
    }

    /// PUT without a body, for endpoints driven entirely by path and query.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.execute(self.request(Method::PUT, path)).await?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))
}

async fn extract_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(message) = value.get("message").and_then(|message| message.as_str()) {
            return message.to_string();
        }
    }
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    }
}
