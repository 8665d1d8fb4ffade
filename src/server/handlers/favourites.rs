//! Favourites handlers: the favourites list lives on the user record

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult, NotFoundError};
use crate::server::AppState;
use crate::server::extractors::{ApiJson, AuthUser};

#[derive(Debug, Deserialize)]
pub struct FavouriteBody {
    pub bookid: Uuid,
}

pub async fn add_book_to_favourites(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<FavouriteBody>,
) -> ApiResult<Json<Value>> {
    state
        .books
        .get(&body.bookid)
        .await?
        .ok_or_else(|| NotFoundError::entity("book", body.bookid))?;

    let mut user = state
        .users
        .get(&auth.user_id)
        .await?
        .ok_or_else(|| NotFoundError::entity("user", auth.user_id))?;

    if user.favourites.contains(&body.bookid) {
        return Err(ApiError::field("bookid", "book is already in favourites"));
    }
    user.favourites.push(body.bookid);
    user.touch();
    let user = state.users.update(&auth.user_id, user).await?;

    Ok(Json(json!({
        "message": "Book added to favourites successfully",
        "favourites": user.favourites,
    })))
}

pub async fn remove_book_from_favourites(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<FavouriteBody>,
) -> ApiResult<Json<Value>> {
    let mut user = state
        .users
        .get(&auth.user_id)
        .await?
        .ok_or_else(|| NotFoundError::entity("user", auth.user_id))?;

    if !user.favourites.contains(&body.bookid) {
        return Err(ApiError::field("bookid", "book not found in favourites"));
    }
    user.favourites.retain(|id| id != &body.bookid);
    user.touch();
    let user = state.users.update(&auth.user_id, user).await?;

    Ok(Json(json!({
        "message": "Book removed from favourites",
        "favourites": user.favourites,
    })))
}

pub async fn get_favourites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .get(&auth.user_id)
        .await?
        .ok_or_else(|| NotFoundError::entity("user", auth.user_id))?;

    let books = state.books.get_many(&user.favourites).await?;
    Ok(Json(json!({ "favourites": books })))
}
