//! Shared fixtures for the integration tests: an in-memory application
//! state plus seeding helpers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use bookstore::core::credentials;
use bookstore::domain::book::Book;
use bookstore::domain::session::Session;
use bookstore::domain::user::{Role, User};
use bookstore::server::AppState;
use bookstore::storage::memory::{
    InMemoryBookStore, InMemoryCartStore, InMemoryEventStore, InMemoryOrderStore,
    InMemorySessionStore, InMemoryUserStore,
};

pub fn memory_state() -> AppState {
    AppState::new(
        Arc::new(InMemoryBookStore::new()),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryCartStore::new()),
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryEventStore::new()),
        Duration::days(30),
    )
}

/// Insert a user with the given role plus a live session; returns
/// (user id, bearer token).
pub async fn seed_account(state: &AppState, username: &str, role: Role) -> (Uuid, Uuid) {
    let salt = credentials::generate_salt();
    let hash = credentials::hash_password(&salt, "hunter2");
    let user = User::new(
        username.to_string(),
        format!("{username}@example.com"),
        hash,
        salt,
        "12 Library Lane".to_string(),
        role,
    );
    let user = state.users.insert(user).await.expect("seed user");

    let session = Session::issue(user.id, role, Duration::days(30));
    let session = state.sessions.insert(session).await.expect("seed session");

    (user.id, session.token)
}

pub async fn seed_user(state: &AppState, username: &str) -> (Uuid, Uuid) {
    seed_account(state, username, Role::User).await
}

pub async fn seed_admin(state: &AppState) -> (Uuid, Uuid) {
    seed_account(state, "admin", Role::Admin).await
}

pub async fn seed_book(state: &AppState, title: &str, price: f64) -> Book {
    let book = Book::new(
        title.to_string(),
        "R. Hart".to_string(),
        price,
        "A story".to_string(),
        "English".to_string(),
        "Fiction".to_string(),
        String::new(),
    );
    state.books.insert(book).await.expect("seed book")
}
