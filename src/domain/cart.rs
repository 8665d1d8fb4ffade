//! Cart aggregate, one per user
//!
//! Carts are versioned: every write carries the version read at load time and
//! the store rejects it if the stored version has moved on. Losers of a race
//! get a conflict instead of silently overwriting each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub book_ids: Vec<Uuid>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Empty cart at version 0 (nothing persisted yet).
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            book_ids: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn contains(&self, book_id: &Uuid) -> bool {
        self.book_ids.contains(book_id)
    }

    /// Append a book id. Returns false when it was already present.
    pub fn add(&mut self, book_id: Uuid) -> bool {
        if self.contains(&book_id) {
            return false;
        }
        self.book_ids.push(book_id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a book id. Returns false when it was not present.
    pub fn remove(&mut self, book_id: &Uuid) -> bool {
        let before = self.book_ids.len();
        self.book_ids.retain(|id| id != book_id);
        if self.book_ids.len() == before {
            return false;
        }
        self.updated_at = Utc::now();
        true
    }

    /// Drop every purchased id at checkout.
    pub fn drain(&mut self, purchased: &[Uuid]) {
        self.book_ids.retain(|id| !purchased.contains(id));
        self.updated_at = Utc::now();
    }
}
