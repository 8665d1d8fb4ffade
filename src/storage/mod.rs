//! Storage traits and backends
//!
//! The service layer talks to these traits only; the app wires either the
//! MongoDB backend or the in-memory backend (tests, development) behind them.
//! Trait methods return `anyhow::Result`; two typed marker errors travel
//! through it so callers can react to them specifically:
//!
//! - [`CartConflict`]: an optimistic cart write lost a race
//! - [`OrderNumberTaken`]: an order-line insert hit the unique-number index

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::book::Book;
use crate::domain::cart::Cart;
use crate::domain::event::Event;
use crate::domain::order::{OrderGroup, OrderLine, OrderStatus};
use crate::domain::session::Session;
use crate::domain::user::{Role, User};

pub mod memory;
pub mod mongo;

/// Optimistic cart write rejected: the stored version moved on.
#[derive(Debug, thiserror::Error)]
#[error("cart version conflict for user {user_id}")]
pub struct CartConflict {
    pub user_id: Uuid,
}

/// Order-line insert rejected by the unique order-number constraint.
#[derive(Debug, thiserror::Error)]
#[error("order number '{order_number}' already taken")]
pub struct OrderNumberTaken {
    pub order_number: String,
}

/// Books-per-genre aggregation row.
#[derive(Debug, Clone, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

/// Order-lines-per-book aggregation row.
#[derive(Debug, Clone)]
pub struct BookOrderCount {
    pub book_id: Uuid,
    pub count: u64,
}

/// Catalog persistence.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn insert(&self, book: Book) -> Result<Book>;

    async fn get(&self, id: &Uuid) -> Result<Option<Book>>;

    /// Fetch several books at once; missing ids are silently absent.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Book>>;

    /// All books, newest first.
    async fn list(&self) -> Result<Vec<Book>>;

    /// The `limit` newest books.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Book>>;

    async fn update(&self, id: &Uuid, book: Book) -> Result<Book>;

    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Number of books per genre.
    async fn count_by_genre(&self) -> Result<Vec<GenreCount>>;
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<User>;

    async fn get(&self, id: &Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update(&self, id: &Uuid, user: User) -> Result<User>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;

    /// Append created order-line ids to the user's order list.
    async fn append_order_lines(&self, id: &Uuid, line_ids: &[Uuid]) -> Result<()>;
}

/// Cart persistence with optimistic versioning.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart, or an empty version-0 cart when nothing is stored.
    async fn get(&self, user_id: &Uuid) -> Result<Cart>;

    /// Store the cart iff the stored version still equals `cart.version`;
    /// the stored copy gets `version + 1`. Fails with [`CartConflict`]
    /// otherwise.
    async fn put(&self, cart: Cart) -> Result<Cart>;
}

/// Order ledger persistence and its read-side aggregations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert one line. Fails with [`OrderNumberTaken`] when the order
    /// number is already present.
    async fn insert_line(&self, line: OrderLine) -> Result<OrderLine>;

    async fn insert_group(&self, group: OrderGroup) -> Result<OrderGroup>;

    /// Remove a group and every line belonging to it (checkout
    /// compensation).
    async fn delete_group(&self, group_id: &Uuid) -> Result<()>;

    async fn get_group(&self, group_id: &Uuid) -> Result<Option<OrderGroup>>;

    /// A user's lines, newest first.
    async fn lines_for_user(&self, user_id: &Uuid) -> Result<Vec<OrderLine>>;

    /// Every line, newest first.
    async fn all_lines(&self) -> Result<Vec<OrderLine>>;

    /// Lines of one group, in insertion order.
    async fn lines_in_group(&self, group_id: &Uuid) -> Result<Vec<OrderLine>>;

    /// Lines stamped with exactly this placement instant.
    async fn lines_placed_at(&self, placed_at: DateTime<Utc>) -> Result<Vec<OrderLine>>;

    /// Set the status of every line stamped with this placement instant;
    /// returns how many matched.
    async fn set_status_where_placed_at(
        &self,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<u64>;

    /// The user's most recent group by placement time.
    async fn latest_group_for_user(&self, user_id: &Uuid) -> Result<Option<OrderGroup>>;

    /// The user's earliest group placed within `[start, end)`.
    async fn group_for_user_in_window(
        &self,
        user_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<OrderGroup>>;

    /// Lines placed within `[start, end]`, optionally restricted to a status
    /// set.
    async fn lines_placed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<OrderLine>>;

    /// Sum of line prices for Completed lines placed within `[start, end]`,
    /// or `None` when no line matched.
    async fn sum_completed_prices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>>;

    /// Per-book line counts for lines placed at or after `cutoff`, any
    /// status.
    async fn count_lines_per_book_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookOrderCount>>;
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<Session>;

    async fn get(&self, token: &Uuid) -> Result<Option<Session>>;
}

/// Event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: Event) -> Result<Event>;

    async fn get(&self, id: &Uuid) -> Result<Option<Event>>;

    /// All events, latest event date first.
    async fn list(&self) -> Result<Vec<Event>>;

    async fn update(&self, id: &Uuid, event: Event) -> Result<Event>;

    async fn delete(&self, id: &Uuid) -> Result<()>;
}
