//! Axum extractors: bearer-token auth and 400-normalized JSON bodies

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use uuid::Uuid;

use super::AppState;
use crate::core::error::{ApiError, AuthError, ForbiddenError};
use crate::domain::user::Role;

/// The authenticated caller, resolved from the bearer token via the session
/// store.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?
            .trim();
        let token = Uuid::parse_str(token).map_err(|_| AuthError::InvalidToken)?;

        let session = state
            .sessions
            .get(&token)
            .await
            .map_err(ApiError::from)?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredToken.into());
        }

        Ok(AuthUser {
            user_id: session.user_id,
            role: session.role,
        })
    }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if auth.role != Role::Admin {
            return Err(ForbiddenError::AdminRequired.into());
        }
        Ok(AdminUser {
            user_id: auth.user_id,
        })
    }
}

/// JSON body extractor whose rejection is a 400 in the crate's error shape
/// (axum's default Json rejection answers 422 with a bare message).
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::field("body", rejection.body_text())),
        }
    }
}
