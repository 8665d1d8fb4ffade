//! MongoDB storage backend using the official MongoDB async driver.
//!
//! # Storage model
//!
//! Collection-per-entity: `books`, `users`, `carts`, `order_groups`,
//! `order_lines`, `sessions`, `events`. Carts are keyed by user id and
//! sessions by token; everything else by entity id.
//!
//! # Serialization strategy
//!
//! Entities are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON documents. UUIDs are stored as strings and
//! creation/update timestamps as ISO 8601 strings; placement timestamps are
//! stored as unix-millis integers so range matching and `$group` pipelines
//! operate on numbers. The key field is mapped to MongoDB's `_id`.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use serde::Serialize;
use serde::de::DeserializeOwned;
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
// Conversion helpers
// ---------------------------------------------------------------------------

/// Serialize an entity into a BSON document, renaming `key_field` → `_id`.
fn to_document<T: Serialize>(value: &T, key_field: &str) -> Result<Document> {
    let json =
        serde_json::to_value(value).map_err(|e| anyhow!("Failed to serialize entity: {}", e))?;
    let bson_val =
        mongodb::bson::to_bson(&json).map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut document = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(key) = document.remove(key_field) {
        document.insert("_id", key);
    }

    Ok(document)
}

/// Deserialize a BSON document into an entity, renaming `_id` → `key_field`.
fn from_document<T: DeserializeOwned>(mut document: Document, key_field: &str) -> Result<T> {
    if let Some(key) = document.remove("_id") {
        document.insert(key_field, key);
    }

    let json = Bson::Document(document).into_relaxed_extjson();
    serde_json::from_value(json)
        .map_err(|e| anyhow!("Failed to deserialize entity from document: {}", e))
}

/// Convert a UUID to its BSON string representation for queries.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

/// Whether a driver error is a unique-index violation (E11000).
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

/// BSON value for an order status, matching the entity serialization.
fn status_bson(status: OrderStatus) -> Bson {
    Bson::String(status.to_string())
}

async fn collect_entities<T: DeserializeOwned>(
    cursor: mongodb::Cursor<Document>,
    key_field: &str,
) -> Result<Vec<T>> {
    let documents: Vec<Document> = cursor
        .try_collect()
        .await
        .map_err(|e| anyhow!("Failed to collect documents: {}", e))?;

    documents
        .into_iter()
        .map(|d| from_document(d, key_field))
        .collect()
}

/// Create the indexes the stores rely on. Idempotent; called on startup.
pub async fn ensure_indexes(database: &Database) -> Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    database
        .collection::<Document>("order_lines")
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "order_number": 1 })
                .options(unique.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "placed_at": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "placed_at": 1 }).build(),
        ])
        .await
        .map_err(|e| anyhow!("Failed to create order_lines indexes: {}", e))?;

    database
        .collection::<Document>("order_groups")
        .create_indexes(vec![IndexModel::builder()
            .keys(doc! { "user_id": 1, "placed_at": -1 })
            .build()])
        .await
        .map_err(|e| anyhow!("Failed to create order_groups indexes: {}", e))?;

    database
        .collection::<Document>("users")
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(unique.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique)
                .build(),
        ])
        .await
        .map_err(|e| anyhow!("Failed to create users indexes: {}", e))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoBookStore {
    database: Database,
}

impl MongoBookStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection("books")
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn insert(&self, book: Book) -> Result<Book> {
        let document = to_document(&book, "id")?;
        self.collection()
            .insert_one(document)
            .await
            .map_err(|e| anyhow!("Failed to insert book: {}", e))?;
        Ok(book)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Book>> {
        let document = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to get book: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Book>> {
        let id_list: Vec<Bson> = ids.iter().map(uuid_bson).collect();
        let cursor = self
            .collection()
            .find(doc! { "_id": { "$in": id_list } })
            .await
            .map_err(|e| anyhow!("Failed to get books: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list books: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit as i64)
            .await
            .map_err(|e| anyhow!("Failed to list recent books: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn update(&self, id: &Uuid, book: Book) -> Result<Book> {
        let document = to_document(&book, "id")?;
        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, document)
            .await
            .map_err(|e| anyhow!("Failed to update book: {}", e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("Book not found: {}", id));
        }
        Ok(book)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to delete book: {}", e))?;
        Ok(())
    }

    async fn count_by_genre(&self) -> Result<Vec<GenreCount>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$genre", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let cursor = self
            .collection()
            .aggregate(pipeline)
            .await
            .map_err(|e| anyhow!("Failed to aggregate genres: {}", e))?;

        let rows: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect genre counts: {}", e))?;

        rows.into_iter()
            .map(|row| {
                let genre = row
                    .get_str("_id")
                    .map_err(|e| anyhow!("Genre row missing _id: {}", e))?
                    .to_string();
                let count = read_count(&row, "count")?;
                Ok(GenreCount { genre, count })
            })
            .collect()
    }
}

/// `$sum: 1` yields Int32 or Int64 depending on the server; accept both.
fn read_count(row: &Document, field: &str) -> Result<u64> {
    if let Ok(n) = row.get_i64(field) {
        return Ok(n as u64);
    }
    if let Ok(n) = row.get_i32(field) {
        return Ok(n as u64);
    }
    Err(anyhow!("Aggregation row missing numeric '{}'", field))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoUserStore {
    database: Database,
}

impl MongoUserStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection("users")
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: User) -> Result<User> {
        let document = to_document(&user, "id")?;
        self.collection()
            .insert_one(document)
            .await
            .map_err(|e| anyhow!("Failed to insert user: {}", e))?;
        Ok(user)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>> {
        let document = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to get user: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let document = self
            .collection()
            .find_one(doc! { "username": username })
            .await
            .map_err(|e| anyhow!("Failed to find user by username: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let document = self
            .collection()
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| anyhow!("Failed to find user by email: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: &Uuid, user: User) -> Result<User> {
        let document = to_document(&user, "id")?;
        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, document)
            .await
            .map_err(|e| anyhow!("Failed to update user: {}", e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("User not found: {}", id));
        }
        Ok(user)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let role_value = serde_json::to_value(role)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| anyhow!("Failed to serialize role"))?;

        let cursor = self
            .collection()
            .find(doc! { "role": role_value })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list users: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn append_order_lines(&self, id: &Uuid, line_ids: &[Uuid]) -> Result<()> {
        let ids: Vec<Bson> = line_ids.iter().map(uuid_bson).collect();
        let result = self
            .collection()
            .update_one(
                doc! { "_id": uuid_bson(id) },
                doc! {
                    "$push": { "order_line_ids": { "$each": ids } },
                    "$set": { "updated_at": Utc::now().to_rfc3339() },
                },
            )
            .await
            .map_err(|e| anyhow!("Failed to append order lines: {}", e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("User not found: {}", id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Carts
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoCartStore {
    database: Database,
}

impl MongoCartStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection("carts")
    }
}

#[async_trait]
impl CartStore for MongoCartStore {
    async fn get(&self, user_id: &Uuid) -> Result<Cart> {
        let document = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(user_id) })
            .await
            .map_err(|e| anyhow!("Failed to get cart: {}", e))?;

        match document {
            Some(d) => from_document(d, "user_id"),
            None => Ok(Cart::empty(*user_id)),
        }
    }

    async fn put(&self, mut cart: Cart) -> Result<Cart> {
        let expected_version = cart.version;
        cart.version += 1;
        let document = to_document(&cart, "user_id")?;

        if expected_version == 0 {
            // First write for this user; a duplicate key means someone beat
            // us to version 1.
            match self.collection().insert_one(document).await {
                Ok(_) => Ok(cart),
                Err(e) if is_duplicate_key(&e) => Err(CartConflict {
                    user_id: cart.user_id,
                }
                .into()),
                Err(e) => Err(anyhow!("Failed to insert cart: {}", e)),
            }
        } else {
            let result = self
                .collection()
                .replace_one(
                    doc! {
                        "_id": uuid_bson(&cart.user_id),
                        "version": expected_version as i64,
                    },
                    document,
                )
                .await
                .map_err(|e| anyhow!("Failed to update cart: {}", e))?;

            if result.matched_count == 0 {
                return Err(CartConflict {
                    user_id: cart.user_id,
                }
                .into());
            }
            Ok(cart)
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoOrderStore {
    database: Database,
}

impl MongoOrderStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn lines(&self) -> mongodb::Collection<Document> {
        self.database.collection("order_lines")
    }

    fn groups(&self) -> mongodb::Collection<Document> {
        self.database.collection("order_groups")
    }
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn insert_line(&self, line: OrderLine) -> Result<OrderLine> {
        let document = to_document(&line, "id")?;
        match self.lines().insert_one(document).await {
            Ok(_) => Ok(line),
            Err(e) if is_duplicate_key(&e) => Err(OrderNumberTaken {
                order_number: line.order_number.clone(),
            }
            .into()),
            Err(e) => Err(anyhow!("Failed to insert order line: {}", e)),
        }
    }

    async fn insert_group(&self, group: OrderGroup) -> Result<OrderGroup> {
        let document = to_document(&group, "id")?;
        self.groups()
            .insert_one(document)
            .await
            .map_err(|e| anyhow!("Failed to insert order group: {}", e))?;
        Ok(group)
    }

    async fn delete_group(&self, group_id: &Uuid) -> Result<()> {
        self.lines()
            .delete_many(doc! { "group_id": uuid_bson(group_id) })
            .await
            .map_err(|e| anyhow!("Failed to delete order lines: {}", e))?;
        self.groups()
            .delete_one(doc! { "_id": uuid_bson(group_id) })
            .await
            .map_err(|e| anyhow!("Failed to delete order group: {}", e))?;
        Ok(())
    }

    async fn get_group(&self, group_id: &Uuid) -> Result<Option<OrderGroup>> {
        let document = self
            .groups()
            .find_one(doc! { "_id": uuid_bson(group_id) })
            .await
            .map_err(|e| anyhow!("Failed to get order group: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn lines_for_user(&self, user_id: &Uuid) -> Result<Vec<OrderLine>> {
        let cursor = self
            .lines()
            .find(doc! { "user_id": uuid_bson(user_id) })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list user order lines: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn all_lines(&self) -> Result<Vec<OrderLine>> {
        let cursor = self
            .lines()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list order lines: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn lines_in_group(&self, group_id: &Uuid) -> Result<Vec<OrderLine>> {
        let cursor = self
            .lines()
            .find(doc! { "group_id": uuid_bson(group_id) })
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(|e| anyhow!("Failed to list group order lines: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn lines_placed_at(&self, placed_at: DateTime<Utc>) -> Result<Vec<OrderLine>> {
        let cursor = self
            .lines()
            .find(doc! { "placed_at": placed_at.timestamp_millis() })
            .await
            .map_err(|e| anyhow!("Failed to find order lines by placement: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn set_status_where_placed_at(
        &self,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<u64> {
        let result = self
            .lines()
            .update_many(
                doc! { "placed_at": placed_at.timestamp_millis() },
                doc! { "$set": {
                    "status": status_bson(status),
                    "updated_at": Utc::now().to_rfc3339(),
                } },
            )
            .await
            .map_err(|e| anyhow!("Failed to update order statuses: {}", e))?;
        Ok(result.modified_count)
    }

    async fn latest_group_for_user(&self, user_id: &Uuid) -> Result<Option<OrderGroup>> {
        let document = self
            .groups()
            .find_one(doc! { "user_id": uuid_bson(user_id) })
            .sort(doc! { "placed_at": -1 })
            .await
            .map_err(|e| anyhow!("Failed to find latest order group: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn group_for_user_in_window(
        &self,
        user_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<OrderGroup>> {
        let document = self
            .groups()
            .find_one(doc! {
                "user_id": uuid_bson(user_id),
                "placed_at": {
                    "$gte": start.timestamp_millis(),
                    "$lt": end.timestamp_millis(),
                },
            })
            .sort(doc! { "placed_at": 1 })
            .await
            .map_err(|e| anyhow!("Failed to find order group in window: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn lines_placed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<OrderLine>> {
        let mut filter = doc! {
            "placed_at": {
                "$gte": start.timestamp_millis(),
                "$lte": end.timestamp_millis(),
            },
        };
        if let Some(statuses) = statuses {
            let values: Vec<Bson> = statuses.iter().map(|s| status_bson(*s)).collect();
            filter.insert("status", doc! { "$in": values });
        }

        let cursor = self
            .lines()
            .find(filter)
            .await
            .map_err(|e| anyhow!("Failed to find order lines in window: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn sum_completed_prices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>> {
        let pipeline = vec![
            doc! { "$match": {
                "status": status_bson(OrderStatus::Completed),
                "placed_at": {
                    "$gte": start.timestamp_millis(),
                    "$lte": end.timestamp_millis(),
                },
            } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$price" } } },
        ];

        let cursor = self
            .lines()
            .aggregate(pipeline)
            .await
            .map_err(|e| anyhow!("Failed to aggregate sales: {}", e))?;

        let rows: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect sales total: {}", e))?;

        match rows.first() {
            Some(row) => {
                let total = row
                    .get_f64("total")
                    .map_err(|e| anyhow!("Sales total row malformed: {}", e))?;
                Ok(Some(total))
            }
            None => Ok(None),
        }
    }

    async fn count_lines_per_book_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookOrderCount>> {
        let pipeline = vec![
            doc! { "$match": { "placed_at": { "$gte": cutoff.timestamp_millis() } } },
            doc! { "$group": { "_id": "$book_id", "count": { "$sum": 1 } } },
        ];

        let cursor = self
            .lines()
            .aggregate(pipeline)
            .await
            .map_err(|e| anyhow!("Failed to aggregate book counts: {}", e))?;

        let rows: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect book counts: {}", e))?;

        rows.into_iter()
            .map(|row| {
                let id = row
                    .get_str("_id")
                    .map_err(|e| anyhow!("Book count row missing _id: {}", e))?;
                let book_id =
                    Uuid::parse_str(id).map_err(|e| anyhow!("Invalid book id '{}': {}", id, e))?;
                let count = read_count(&row, "count")?;
                Ok(BookOrderCount { book_id, count })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoSessionStore {
    database: Database,
}

impl MongoSessionStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection("sessions")
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn insert(&self, session: Session) -> Result<Session> {
        let document = to_document(&session, "token")?;
        self.collection()
            .insert_one(document)
            .await
            .map_err(|e| anyhow!("Failed to insert session: {}", e))?;
        Ok(session)
    }

    async fn get(&self, token: &Uuid) -> Result<Option<Session>> {
        let document = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(token) })
            .await
            .map_err(|e| anyhow!("Failed to get session: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "token")?)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MongoEventStore {
    database: Database,
}

impl MongoEventStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection("events")
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn insert(&self, event: Event) -> Result<Event> {
        let document = to_document(&event, "id")?;
        self.collection()
            .insert_one(document)
            .await
            .map_err(|e| anyhow!("Failed to insert event: {}", e))?;
        Ok(event)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Event>> {
        let document = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to get event: {}", e))?;

        match document {
            Some(d) => Ok(Some(from_document(d, "id")?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Event>> {
        let cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "event_date": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list events: {}", e))?;
        collect_entities(cursor, "id").await
    }

    async fn update(&self, id: &Uuid, event: Event) -> Result<Event> {
        let document = to_document(&event, "id")?;
        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, document)
            .await
            .map_err(|e| anyhow!("Failed to update event: {}", e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("Event not found: {}", id));
        }
        Ok(event)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to delete event: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_document_renames_key_field() {
        #[derive(Serialize)]
        struct Sample {
            id: String,
            name: String,
        }

        let doc = to_document(
            &Sample {
                id: "abc".into(),
                name: "test".into(),
            },
            "id",
        )
        .unwrap();

        assert!(doc.contains_key("_id"));
        assert!(!doc.contains_key("id"));
        assert_eq!(doc.get_str("_id").unwrap(), "abc");
        assert_eq!(doc.get_str("name").unwrap(), "test");
    }

    #[test]
    fn from_document_restores_key_field() {
        #[derive(serde::Deserialize)]
        struct Sample {
            user_id: String,
            version: u64,
        }

        let doc = doc! { "_id": "u1", "version": 3_i64 };
        let sample: Sample = from_document(doc, "user_id").unwrap();
        assert_eq!(sample.user_id, "u1");
        assert_eq!(sample.version, 3);
    }

    #[test]
    fn order_line_document_roundtrip() {
        let line = OrderLine::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            250.0,
            Utc::now(),
        );

        let doc = to_document(&line, "id").unwrap();
        // Placement timestamps live as integers for range queries
        assert!(doc.get_i64("placed_at").is_ok());

        let back: OrderLine = from_document(doc, "id").unwrap();
        assert_eq!(back.id, line.id);
        assert_eq!(back.order_number, line.order_number);
        assert_eq!(
            back.placed_at.timestamp_millis(),
            line.placed_at.timestamp_millis()
        );
    }

    #[test]
    fn cart_document_keyed_by_user() {
        let cart = Cart::empty(Uuid::new_v4());
        let doc = to_document(&cart, "user_id").unwrap();
        assert!(doc.contains_key("_id"));
        assert!(!doc.contains_key("user_id"));
    }

    #[test]
    fn status_bson_matches_serde() {
        let via_serde = serde_json::to_value(OrderStatus::OutForDelivery).unwrap();
        assert_eq!(via_serde, json!("OutForDelivery"));
        assert_eq!(
            status_bson(OrderStatus::OutForDelivery),
            Bson::String("OutForDelivery".to_string())
        );
    }
}
