//! Session credential verification and identity resolution
//!
//! Credentials are HS256 JWTs carrying `{name, jet}` issued by the login
//! service. The arena only verifies them; issuing lives here as well so the
//! format is defined in one place.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::catalog::{Jet, JetCatalog};
use crate::game::player_id;

type HmacSha256 = Hmac<Sha256>;

/// Cookie the login service stores the credential in
pub const SESSION_COOKIE: &str = "df_session";

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a session credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Pilot name
    #[serde(default)]
    pub name: String,
    /// Selected jet id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jet: Option<String>,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

#[derive(Deserialize)]
struct JwtHeader {
    alg: String,
}

/// Verify a session credential and extract its claims
pub fn verify_session(token: &str, secret: &str, now_secs: u64) -> Result<SessionClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_json).map_err(|_| AuthError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    // Verify signature (HMAC-SHA256, constant time)
    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let claims: SessionClaims =
        serde_json::from_slice(&payload_json).map_err(|_| AuthError::InvalidToken)?;

    if let Some(exp) = claims.exp {
        if now_secs >= exp {
            return Err(AuthError::TokenExpired);
        }
    }

    Ok(claims)
}

/// Sign a session credential for `{name, jet}` valid for `ttl`
pub fn issue_session(
    name: &str,
    jet: &str,
    ttl: Duration,
    secret: &str,
    now_secs: u64,
) -> Result<String, AuthError> {
    let claims = SessionClaims {
        name: name.to_string(),
        jet: Some(jet.to_string()),
        exp: Some(now_secs + ttl.as_secs()),
        iat: Some(now_secs),
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| AuthError::InvalidToken)?;

    let header_b64 = URL_SAFE_NO_PAD.encode(JWT_HEADER);
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}.{}", header_b64, payload_b64, signature_b64))
}

/// Pick the credential from the session cookie, falling back to `?token=`
pub fn session_token<'a>(cookie: Option<&'a str>, query: Option<&'a str>) -> Option<&'a str> {
    cookie
        .filter(|t| !t.is_empty())
        .or_else(|| query.filter(|t| !t.is_empty()))
}

/// An admitted pilot
#[derive(Debug, Clone)]
pub struct Identity {
    pub player_id: String,
    pub name: String,
    pub jet: Arc<Jet>,
}

/// Resolve a connection's credential to an identity, or refuse it
pub fn resolve_identity(
    token: Option<&str>,
    secret: &str,
    catalog: &JetCatalog,
    now_secs: u64,
) -> Result<Identity, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let claims = verify_session(token, secret, now_secs)?;

    let jet_id = claims.jet.unwrap_or_default();
    let jet = catalog
        .get(&jet_id)
        .ok_or_else(|| AuthError::UnknownJet(jet_id.clone()))?;

    Ok(Identity {
        player_id: player_id(&claims.name, &jet.id),
        name: claims.name,
        jet,
    })
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing session")]
    MissingToken,

    #[error("Invalid session")]
    InvalidToken,

    #[error("Session expired")]
    TokenExpired,

    #[error("Jet not found: {0}")]
    UnknownJet(String),
}

impl AuthError {
    /// WebSocket close code the connection is refused with
    pub fn close_code(&self) -> u16 {
        match self {
            AuthError::MissingToken => 4400,
            AuthError::InvalidToken | AuthError::TokenExpired => 4401,
            AuthError::UnknownJet(_) => 4404,
        }
    }

    /// Close reason, kept short to fit a close frame
    pub fn close_reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Missing session",
            AuthError::InvalidToken => "Invalid session",
            AuthError::TokenExpired => "Session expired",
            AuthError::UnknownJet(_) => "Jet not found",
        }
    }
}
