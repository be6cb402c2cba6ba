use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Fatal initialization failures. These are the only errors a host is
/// expected to show to the user directly; everything else resolves into a
/// state transition.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("network is offline")]
    Offline,
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
    #[error("identity provider misconfigured: {0}")]
    Misconfigured(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network is offline")]
    Offline,
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
    #[error("identity provider misconfigured: {0}")]
    Misconfigured(String),
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("malformed identity provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("token is not a JWT: {0}")]
    MalformedToken(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ProviderError> for InitError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::Offline => InitError::Offline,
            ProviderError::Unreachable(detail) => InitError::Unreachable(detail),
            ProviderError::Misconfigured(detail) | ProviderError::Rejected(detail) => {
                InitError::Misconfigured(detail)
            }
            ProviderError::InvalidResponse(detail) => InitError::Unreachable(detail),
        }
    }
}
