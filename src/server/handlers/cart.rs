//! Cart handlers
//!
//! Mutations go through the versioned cart store; a concurrent modification
//! surfaces as a 409 rather than silently losing an update.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult, NotFoundError};
use crate::server::AppState;
use crate::server::extractors::{ApiJson, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CartItemBody {
    pub bookid: Uuid,
}

pub async fn add_book_to_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CartItemBody>,
) -> ApiResult<Json<Value>> {
    state
        .books
        .get(&body.bookid)
        .await?
        .ok_or_else(|| NotFoundError::entity("book", body.bookid))?;

    let mut cart = state.carts.get(&auth.user_id).await?;
    if !cart.add(body.bookid) {
        return Err(ApiError::field("bookid", "book is already in cart"));
    }
    let cart = state.carts.put(cart).await?;

    Ok(Json(json!({
        "message": "Book added to cart successfully",
        "cart": cart.book_ids,
    })))
}

pub async fn remove_book_from_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CartItemBody>,
) -> ApiResult<Json<Value>> {
    let mut cart = state.carts.get(&auth.user_id).await?;
    if !cart.remove(&body.bookid) {
        return Err(ApiError::field("bookid", "book not in cart"));
    }
    let cart = state.carts.put(cart).await?;

    Ok(Json(json!({
        "message": "Book removed from cart successfully",
        "cart": cart.book_ids,
    })))
}

pub async fn get_user_cart(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let cart = state.carts.get(&auth.user_id).await?;
    let books = state.books.get_many(&cart.book_ids).await?;

    // Most recently added first; the store does not guarantee input order
    let by_id: std::collections::HashMap<Uuid, _> =
        books.into_iter().map(|b| (b.id, b)).collect();
    let ordered: Vec<_> = cart
        .book_ids
        .iter()
        .rev()
        .filter_map(|id| by_id.get(id))
        .collect();

    Ok(Json(json!({
        "message": "User cart fetched successfully",
        "cart": ordered,
    })))
}
