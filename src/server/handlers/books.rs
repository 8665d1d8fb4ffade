//! Catalog handlers: admin CRUD plus the public browse and best-seller views

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult, NotFoundError};
use crate::domain::book::Book;
use crate::server::AppState;
use crate::server::extractors::{AdminUser, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookBody {
    pub title: String,
    pub author: String,
    pub price: f64,
    #[serde(alias = "desc")]
    pub description: String,
    pub language: String,
    pub genre: String,
    #[serde(default)]
    pub cover_url: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookBody {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    #[serde(alias = "desc")]
    pub description: Option<String>,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
}

pub async fn add_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<AddBookBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    for (field, value) in [
        ("title", &body.title),
        ("author", &body.author),
        ("description", &body.description),
        ("language", &body.language),
        ("genre", &body.genre),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::field(field, "is required"));
        }
    }

    let book = Book::new(
        body.title,
        body.author,
        body.price,
        body.description,
        body.language,
        body.genre,
        body.cover_url,
    );
    let book = state.books.insert(book).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Book added successfully", "book": book })),
    ))
}

pub async fn update_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateBookBody>,
) -> ApiResult<Json<Value>> {
    let mut book = state
        .books
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("book", id))?;

    // Absent fields keep their stored values
    if let Some(title) = body.title {
        book.title = title;
    }
    if let Some(author) = body.author {
        book.author = author;
    }
    if let Some(price) = body.price {
        book.price = price;
    }
    if let Some(description) = body.description {
        book.description = description;
    }
    if let Some(language) = body.language {
        book.language = language;
    }
    if let Some(genre) = body.genre {
        book.genre = genre;
    }
    if let Some(cover_url) = body.cover_url {
        book.cover_url = cover_url;
    }

    book.touch();
    let book = state.books.update(&id, book).await?;

    Ok(Json(json!({
        "message": "Book updated successfully",
        "book": book,
    })))
}

pub async fn delete_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .books
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("book", id))?;

    state.books.delete(&id).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}

pub async fn get_all_books(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let books = state.books.list().await?;
    Ok(Json(json!({ "status": "success", "data": books })))
}

pub async fn get_recent_books(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let books = state.books.list_recent(4).await?;
    Ok(Json(json!({ "status": "success", "data": books })))
}

pub async fn books_by_genre(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let counts = state.books.count_by_genre().await?;
    Ok(Json(json!({ "status": "success", "data": counts })))
}

pub async fn get_book_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let book = state
        .books
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("book", id))?;
    Ok(Json(json!({ "status": "success", "data": book })))
}

pub async fn mark_best_sellers(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let books = state.reporting.best_sellers().await?;
    Ok(Json(json!({
        "message": "Best sellers fetched successfully",
        "data": books,
    })))
}
