use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    app_state::AppState,
    domain::models::{UserId, UserKey},
    routes::ApiError,
};

/// The user the host's identity provider vouched for.
///
/// The provider (a reverse proxy or an upstream middleware) puts the
/// authenticated username into the configured identity header; this extractor
/// only maps it onto a known user. Returns 401 Unauthorized otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(&state.identity_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(UserKey::from)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let id = state
            .avatar_service
            .identify(&key)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        Ok(AuthUser { id })
    }
}
