//! Checkout failure paths: order-number collision retry and the
//! compensating delete after a post-insert failure

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bookstore::domain::order::{OrderGroup, OrderLine, OrderStatus};
use bookstore::domain::user::{Role, User};
use bookstore::server::AppState;
use bookstore::services::checkout::{CheckoutPayment, SubmittedLine};
use bookstore::storage::memory::{
    InMemoryBookStore, InMemoryCartStore, InMemoryEventStore, InMemoryOrderStore,
    InMemorySessionStore, InMemoryUserStore,
};
use bookstore::storage::{OrderNumberTaken, OrderStore, UserStore};
use chrono::{DateTime, Utc};
use common::{seed_book, seed_user};
use uuid::Uuid;

/// Order store that reports an order-number collision for the first
/// `failures` line inserts, then delegates.
struct CollidingOrderStore {
    inner: InMemoryOrderStore,
    remaining: AtomicU32,
}

impl CollidingOrderStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            remaining: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl OrderStore for CollidingOrderStore {
    async fn insert_line(&self, line: OrderLine) -> Result<OrderLine> {
        let prev = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        if prev > 0 {
            return Err(OrderNumberTaken {
                order_number: line.order_number,
            }
            .into());
        }
        self.inner.insert_line(line).await
    }

    async fn insert_group(&self, group: OrderGroup) -> Result<OrderGroup> {
        self.inner.insert_group(group).await
    }

    async fn delete_group(&self, group_id: &Uuid) -> Result<()> {
        self.inner.delete_group(group_id).await
    }

    async fn get_group(&self, group_id: &Uuid) -> Result<Option<OrderGroup>> {
        self.inner.get_group(group_id).await
    }

    async fn lines_for_user(&self, user_id: &Uuid) -> Result<Vec<OrderLine>> {
        self.inner.lines_for_user(user_id).await
    }

    async fn all_lines(&self) -> Result<Vec<OrderLine>> {
        self.inner.all_lines().await
    }

    async fn lines_in_group(&self, group_id: &Uuid) -> Result<Vec<OrderLine>> {
        self.inner.lines_in_group(group_id).await
    }

    async fn lines_placed_at(&self, placed_at: DateTime<Utc>) -> Result<Vec<OrderLine>> {
        self.inner.lines_placed_at(placed_at).await
    }

    async fn set_status_where_placed_at(
        &self,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<u64> {
        self.inner.set_status_where_placed_at(placed_at, status).await
    }

    async fn latest_group_for_user(&self, user_id: &Uuid) -> Result<Option<OrderGroup>> {
        self.inner.latest_group_for_user(user_id).await
    }

    async fn group_for_user_in_window(
        &self,
        user_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<OrderGroup>> {
        self.inner.group_for_user_in_window(user_id, start, end).await
    }

    async fn lines_placed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<OrderLine>> {
        self.inner.lines_placed_between(start, end, statuses).await
    }

    async fn sum_completed_prices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>> {
        self.inner.sum_completed_prices(start, end).await
    }

    async fn count_lines_per_book_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<bookstore::storage::BookOrderCount>> {
        self.inner.count_lines_per_book_since(cutoff).await
    }
}

/// User store whose order-list append always fails, to trip the
/// compensation path.
struct BrokenAppendUserStore {
    inner: InMemoryUserStore,
}

#[async_trait]
impl UserStore for BrokenAppendUserStore {
    async fn insert(&self, user: User) -> Result<User> {
        self.inner.insert(user).await
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>> {
        self.inner.get(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.inner.find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn update(&self, id: &Uuid, user: User) -> Result<User> {
        self.inner.update(id, user).await
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.inner.list_by_role(role).await
    }

    async fn append_order_lines(&self, _id: &Uuid, _line_ids: &[Uuid]) -> Result<()> {
        Err(anyhow!("simulated append failure"))
    }
}

fn state_with(orders: Arc<dyn OrderStore>, users: Arc<dyn UserStore>) -> AppState {
    AppState::new(
        Arc::new(InMemoryBookStore::new()),
        users,
        Arc::new(InMemoryCartStore::new()),
        orders,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryEventStore::new()),
        chrono::Duration::days(30),
    )
}

#[tokio::test]
async fn collision_is_retried_with_a_fresh_number() {
    // Two collisions, then success: inside the per-line retry budget
    let state = state_with(
        Arc::new(CollidingOrderStore::new(2)),
        Arc::new(InMemoryUserStore::new()),
    );
    let (user_id, _) = seed_user(&state, "alice").await;
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    let placed = state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: book.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();

    assert_eq!(placed.lines.len(), 1);
    assert_eq!(state.orders.all_lines().await.unwrap().len(), 1);
}

#[tokio::test]
async fn exhausted_collisions_fail_with_nothing_persisted() {
    let state = state_with(
        Arc::new(CollidingOrderStore::new(100)),
        Arc::new(InMemoryUserStore::new()),
    );
    let (user_id, _) = seed_user(&state, "alice").await;
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    let err = state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: book.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(state.orders.all_lines().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_order_list_append_rolls_back_the_order() {
    let state = state_with(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(BrokenAppendUserStore {
            inner: InMemoryUserStore::new(),
        }),
    );
    let (user_id, _) = seed_user(&state, "alice").await;
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    let err = state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: book.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

    // The compensating delete removed the group and its lines
    assert!(state.orders.all_lines().await.unwrap().is_empty());
}
