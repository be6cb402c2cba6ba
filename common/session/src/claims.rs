use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Application-focused view of the claims carried by a bearer token.
///
/// The role set is always rebuilt wholesale from the newest token; nothing
/// ever mutates it in place.
#[derive(Debug, Clone, Serialize)]
pub struct TokenClaims {
    pub subject: Option<String>,
    pub preferred_username: Option<String>,
    pub roles: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub raw: serde_json::Value,
}

impl TokenClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Decode the payload segment of a JWT without verifying the signature.
    /// The backends are the verifying parties; the client only needs the
    /// claims for display and view gating.
    pub fn from_bearer(token: &str) -> SessionResult<Self> {
        Self::try_from(decode_payload(token)?)
    }
}

/// Base64url-decode the payload segment of a compact JWT.
pub fn decode_payload(token: &str) -> SessionResult<serde_json::Value> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(SessionError::MalformedToken(
                "expected header.payload.signature".into(),
            ))
        }
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|err| SessionError::MalformedToken(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| SessionError::InvalidJson(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    realm_access: Option<RealmAccessRepr>,
    /// Flat fallback shape used by providers that do not nest roles.
    #[serde(default)]
    roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RealmAccessRepr {
    #[serde(default)]
    roles: Vec<String>,
}

impl TryFrom<ClaimsRepr> for TokenClaims {
    type Error = SessionError;

    fn try_from(value: ClaimsRepr) -> SessionResult<Self> {
        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| SessionError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| SessionError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        let roles = value
            .realm_access
            .map(|access| access.roles)
            .or(value.roles)
            .unwrap_or_default()
            .into_iter()
            .collect();

        Ok(Self {
            subject: value.sub,
            preferred_username: value.preferred_username,
            roles,
            expires_at,
            issued_at,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for TokenClaims {
    type Error = SessionError;

    fn try_from(value: serde_json::Value) -> SessionResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| SessionError::InvalidJson(err.to_string()))?;
        let mut claims = TokenClaims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}
