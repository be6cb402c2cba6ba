pub mod claims;
pub mod config;
pub mod error;
pub mod keycloak;
pub mod manager;
pub mod provider;
pub mod roles;
pub mod store;

pub use claims::TokenClaims;
pub use config::{SessionConfig, UnauthenticatedBehavior};
pub use error::{InitError, ProviderError, SessionError, SessionResult};
pub use keycloak::KeycloakProvider;
pub use manager::{Phase, Session, SessionManager};
pub use provider::{IdentityProvider, ProviderSession};
pub use roles::{KNOWN_ROLES, ROLE_ADMIN, ROLE_CLIENT};
pub use store::{FileTokenStore, MemoryTokenStore, StoredToken, TokenStore};
