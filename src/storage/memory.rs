//! In-memory storage backend for testing and development
//!
//! Mirrors the MongoDB backend's semantics, including the unique
//! order-number constraint and the optimistic cart version check. Uses
//! RwLock for thread-safe access.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::domain::book::Book;
use crate::domain::cart::Cart;
use crate::domain::event::Event;
use crate::domain::order::{OrderGroup, OrderLine, OrderStatus};
use crate::domain::session::Session;
use crate::domain::user::{Role, User};

use super::{
    BookOrderCount, BookStore, CartConflict, CartStore, EventStore, GenreCount, OrderNumberTaken,
    OrderStore, SessionStore, UserStore,
};

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryBookStore {
    books: Arc<RwLock<HashMap<Uuid, Book>>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn insert(&self, book: Book) -> Result<Book> {
        let mut books = self
            .books
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Book>> {
        let books = self
            .books
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(books.get(id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Book>> {
        let books = self
            .books
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(ids.iter().filter_map(|id| books.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let books = self
            .books
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut all: Vec<Book> = books.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let mut all = self.list().await?;
        all.truncate(limit);
        Ok(all)
    }

    async fn update(&self, id: &Uuid, book: Book) -> Result<Book> {
        let mut books = self
            .books
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        if !books.contains_key(id) {
            return Err(anyhow!("Book not found: {}", id));
        }
        books.insert(*id, book.clone());
        Ok(book)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut books = self
            .books
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        books.remove(id);
        Ok(())
    }

    async fn count_by_genre(&self) -> Result<Vec<GenreCount>> {
        let books = self
            .books
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for book in books.values() {
            *counts.entry(book.genre.clone()).or_default() += 1;
        }
        let mut rows: Vec<GenreCount> = counts
            .into_iter()
            .map(|(genre, count)| GenreCount { genre, count })
            .collect();
        rows.sort_by(|a, b| a.genre.cmp(&b.genre));
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: &Uuid, user: User) -> Result<User> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        if !users.contains_key(id) {
            return Err(anyhow!("User not found: {}", id));
        }
        users.insert(*id, user.clone());
        Ok(user)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut matching: Vec<User> = users.values().filter(|u| u.role == role).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn append_order_lines(&self, id: &Uuid, line_ids: &[Uuid]) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let user = users.get_mut(id).ok_or_else(|| anyhow!("User not found: {}", id))?;
        user.order_line_ids.extend_from_slice(line_ids);
        user.touch();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Carts
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get(&self, user_id: &Uuid) -> Result<Cart> {
        let carts = self
            .carts
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(carts
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(*user_id)))
    }

    async fn put(&self, mut cart: Cart) -> Result<Cart> {
        let mut carts = self
            .carts
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let stored_version = carts.get(&cart.user_id).map(|c| c.version).unwrap_or(0);
        if stored_version != cart.version {
            return Err(CartConflict {
                user_id: cart.user_id,
            }
            .into());
        }

        cart.version += 1;
        carts.insert(cart.user_id, cart.clone());
        Ok(cart)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Default)]
struct OrderState {
    groups: HashMap<Uuid, OrderGroup>,
    lines: HashMap<Uuid, OrderLine>,
    order_numbers: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_line(&self, line: OrderLine) -> Result<OrderLine> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if !state.order_numbers.insert(line.order_number.clone()) {
            return Err(OrderNumberTaken {
                order_number: line.order_number.clone(),
            }
            .into());
        }
        state.lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn insert_group(&self, group: OrderGroup) -> Result<OrderGroup> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, group_id: &Uuid) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        state.groups.remove(group_id);
        let removed: Vec<OrderLine> = state
            .lines
            .values()
            .filter(|l| &l.group_id == group_id)
            .cloned()
            .collect();
        for line in removed {
            state.lines.remove(&line.id);
            state.order_numbers.remove(&line.order_number);
        }
        Ok(())
    }

    async fn get_group(&self, group_id: &Uuid) -> Result<Option<OrderGroup>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state.groups.get(group_id).cloned())
    }

    async fn lines_for_user(&self, user_id: &Uuid) -> Result<Vec<OrderLine>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut lines: Vec<OrderLine> = state
            .lines
            .values()
            .filter(|l| &l.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lines)
    }

    async fn all_lines(&self) -> Result<Vec<OrderLine>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut lines: Vec<OrderLine> = state.lines.values().cloned().collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lines)
    }

    async fn lines_in_group(&self, group_id: &Uuid) -> Result<Vec<OrderLine>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut lines: Vec<OrderLine> = state
            .lines
            .values()
            .filter(|l| &l.group_id == group_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(lines)
    }

    async fn lines_placed_at(&self, placed_at: DateTime<Utc>) -> Result<Vec<OrderLine>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state
            .lines
            .values()
            .filter(|l| l.placed_at.timestamp_millis() == placed_at.timestamp_millis())
            .cloned()
            .collect())
    }

    async fn set_status_where_placed_at(
        &self,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<u64> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let now = Utc::now();
        let mut updated = 0;
        for line in state.lines.values_mut() {
            if line.placed_at.timestamp_millis() == placed_at.timestamp_millis() {
                line.status = status;
                line.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn latest_group_for_user(&self, user_id: &Uuid) -> Result<Option<OrderGroup>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state
            .groups
            .values()
            .filter(|g| &g.user_id == user_id)
            .max_by_key(|g| g.placed_at)
            .cloned())
    }

    async fn group_for_user_in_window(
        &self,
        user_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<OrderGroup>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state
            .groups
            .values()
            .filter(|g| &g.user_id == user_id && g.placed_at >= start && g.placed_at < end)
            .min_by_key(|g| g.placed_at)
            .cloned())
    }

    async fn lines_placed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<OrderLine>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state
            .lines
            .values()
            .filter(|l| l.placed_at >= start && l.placed_at <= end)
            .filter(|l| statuses.is_none_or(|s| s.contains(&l.status)))
            .cloned()
            .collect())
    }

    async fn sum_completed_prices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>> {
        let lines = self
            .lines_placed_between(start, end, Some(&[OrderStatus::Completed]))
            .await?;
        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(lines.iter().map(|l| l.price).sum()))
    }

    async fn count_lines_per_book_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookOrderCount>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for line in state.lines.values() {
            if line.placed_at >= cutoff {
                *counts.entry(line.book_id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(book_id, count)| BookOrderCount { book_id, count })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<Session> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        sessions.insert(session.token, session.clone());
        Ok(session)
    }

    async fn get(&self, token: &Uuid) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(sessions.get(token).cloned())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<Uuid, Event>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: Event) -> Result<Event> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Event>> {
        let events = self
            .events
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(events.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Event>> {
        let events = self
            .events
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut all: Vec<Event> = events.values().cloned().collect();
        all.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(all)
    }

    async fn update(&self, id: &Uuid, event: Event) -> Result<Event> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        if !events.contains_key(id) {
            return Err(anyhow!("Event not found: {}", id));
        }
        events.insert(*id, event.clone());
        Ok(event)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        events.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book(genre: &str) -> Book {
        Book::new(
            "The Silent Library".into(),
            "R. Hart".into(),
            250.0,
            "A mystery".into(),
            "English".into(),
            genre.into(),
            String::new(),
        )
    }

    #[tokio::test]
    async fn test_book_genre_counts() {
        let store = InMemoryBookStore::new();
        store.insert(sample_book("Mystery")).await.unwrap();
        store.insert(sample_book("Mystery")).await.unwrap();
        store.insert(sample_book("Poetry")).await.unwrap();

        let counts = store.count_by_genre().await.unwrap();
        assert_eq!(counts.len(), 2);
        let mystery = counts.iter().find(|c| c.genre == "Mystery").unwrap();
        assert_eq!(mystery.count, 2);
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let store = InMemoryBookStore::new();
        let book = store.insert(sample_book("Poetry")).await.unwrap();

        let found = store.get_many(&[book.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, book.id);
    }

    #[tokio::test]
    async fn test_cart_version_conflict() {
        let store = InMemoryCartStore::new();
        let user_id = Uuid::new_v4();

        // Two racers load the same empty cart
        let mut first = store.get(&user_id).await.unwrap();
        let mut second = store.get(&user_id).await.unwrap();

        first.add(Uuid::new_v4());
        store.put(first).await.unwrap();

        second.add(Uuid::new_v4());
        let err = store.put(second).await.unwrap_err();
        assert!(err.downcast_ref::<CartConflict>().is_some());
    }

    #[tokio::test]
    async fn test_cart_version_increments() {
        let store = InMemoryCartStore::new();
        let user_id = Uuid::new_v4();

        let mut cart = store.get(&user_id).await.unwrap();
        assert_eq!(cart.version, 0);
        cart.add(Uuid::new_v4());
        let stored = store.put(cart).await.unwrap();
        assert_eq!(stored.version, 1);

        let reloaded = store.get(&user_id).await.unwrap();
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let store = InMemoryOrderStore::new();
        let placed = Utc::now();
        let line = OrderLine::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 100.0, placed);

        let mut duplicate = line.clone();
        duplicate.id = Uuid::new_v4();

        store.insert_line(line).await.unwrap();
        let err = store.insert_line(duplicate).await.unwrap_err();
        assert!(err.downcast_ref::<OrderNumberTaken>().is_some());
    }

    #[tokio::test]
    async fn test_delete_group_frees_order_numbers() {
        let store = InMemoryOrderStore::new();
        let group_id = Uuid::new_v4();
        let placed = Utc::now();
        let line = OrderLine::new(group_id, Uuid::new_v4(), Uuid::new_v4(), 100.0, placed);
        let number = line.order_number.clone();

        store.insert_line(line).await.unwrap();
        store.delete_group(&group_id).await.unwrap();

        let mut again =
            OrderLine::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 50.0, placed);
        again.order_number = number;
        store.insert_line(again).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_status_by_placement_instant() {
        let store = InMemoryOrderStore::new();
        let placed = Utc::now();
        let other = placed + chrono::Duration::seconds(5);
        let group = Uuid::new_v4();
        let user = Uuid::new_v4();

        store
            .insert_line(OrderLine::new(group, user, Uuid::new_v4(), 10.0, placed))
            .await
            .unwrap();
        store
            .insert_line(OrderLine::new(group, user, Uuid::new_v4(), 20.0, placed))
            .await
            .unwrap();
        store
            .insert_line(OrderLine::new(Uuid::new_v4(), user, Uuid::new_v4(), 30.0, other))
            .await
            .unwrap();

        let updated = store
            .set_status_where_placed_at(placed, OrderStatus::OutForDelivery)
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let untouched = store.lines_placed_at(other).await.unwrap();
        assert_eq!(untouched[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_append_order_lines() {
        let store = InMemoryUserStore::new();
        let user = User::new(
            "bob".into(),
            "bob@example.com".into(),
            "h".into(),
            "s".into(),
            "addr".into(),
            Role::User,
        );
        let id = user.id;
        store.insert(user).await.unwrap();

        let lines = [Uuid::new_v4(), Uuid::new_v4()];
        store.append_order_lines(&id, &lines).await.unwrap();

        let user = store.get(&id).await.unwrap().unwrap();
        assert_eq!(user.order_line_ids, lines);
    }
}
