//! # Bookstore
//!
//! An online bookstore backend: a REST API for the catalog, carts,
//! favourites, checkout, order reporting, user accounts and events, backed
//! by MongoDB (with an in-memory backend for tests and development).
//!
//! ## Layout
//!
//! - [`core`]: the error taxonomy and credential digests
//! - [`domain`]: entities — books, users, carts, order groups/lines,
//!   sessions, events
//! - [`storage`]: store traits plus the MongoDB and in-memory backends
//! - [`services`]: the checkout workflow, reporting engine, status
//!   lifecycle and account management
//! - [`server`]: axum state, extractors, router and handlers
//! - [`tasks`]: the expired-event sweep
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bookstore::server::{AppState, router::build_router};
//! use bookstore::storage::memory::*;
//!
//! let state = AppState::new(
//!     Arc::new(InMemoryBookStore::new()),
//!     Arc::new(InMemoryUserStore::new()),
//!     Arc::new(InMemoryCartStore::new()),
//!     Arc::new(InMemoryOrderStore::new()),
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryEventStore::new()),
//!     chrono::Duration::days(30),
//! );
//! let app = build_router(state);
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod services;
pub mod storage;
pub mod tasks;
