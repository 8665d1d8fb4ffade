//! Catalog book records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub description: String,
    pub language: String,
    pub genre: String,
    /// Cover image URL; uploads are out of scope, the URL is taken as given.
    #[serde(default)]
    pub cover_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        author: String,
        price: f64,
        description: String,
        language: String,
        genre: String,
        cover_url: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            author,
            price,
            description,
            language,
            genre,
            cover_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
