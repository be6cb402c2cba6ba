use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the credentials (401). The stored token has
    /// already been cleared by the time the caller sees this.
    #[error("authorization required")]
    Unauthorized,
    /// Business-level rejection from the backend, passed through verbatim
    /// (e.g. insufficient stock on order creation).
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
