//! Bearer authentication seam
//!
//! Token verification belongs to the auth collaborator; the scheduling core
//! only consumes the verified `{user_id, email}` claims it produces. The
//! claims arrive as the bearer credential: `<user_id>` alone, or
//! `<user_id>:<email>` when the identity provider supplied an email.
//! A first-time identity is provisioned by find-or-create on email, falling
//! back to a synthesized address when the provider has none. Missing or
//! malformed credentials are rejected with 401 before any handler runs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

/// Verified claims produced by the auth collaborator
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl VerifiedIdentity {
    /// Decode the collaborator's claims from the bearer credential
    fn from_bearer(token: &str) -> Option<Self> {
        let token = token.trim();
        let (id_part, email_part) = match token.split_once(':') {
            Some((id, email)) => (id, Some(email)),
            None => (token, None),
        };

        let user_id = Uuid::parse_str(id_part).ok()?;
        let email = email_part
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(String::from);

        Some(VerifiedIdentity { user_id, email })
    }

    /// Provider email, or a synthesized fallback when it has none
    fn email_or_fallback(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{}@users.hifz.invalid", self.user_id))
    }
}

/// Authenticated user resolved from the verified identity
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;

        let identity = VerifiedIdentity::from_bearer(token)
            .ok_or_else(|| ApiError::Unauthorized("invalid bearer credentials".to_string()))?;

        if let Some(user) = db::users::find_by_id(&state.db, identity.user_id).await? {
            return Ok(CurrentUser(user));
        }

        // First login for this identity: provision by email
        let email = identity.email_or_fallback();
        let user = db::users::find_or_create_by_email(&state.db, identity.user_id, &email).await?;
        info!(user_id = %user.id, email = %user.email, "user provisioned on first login");

        Ok(CurrentUser(user))
    }
}
