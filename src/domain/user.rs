//! User accounts
//!
//! The cart lives in its own aggregate (see [`crate::domain::cart`]); the
//! user record keeps the favourites list and the accumulated order-line ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub address: String,
    #[serde(default)]
    pub avatar_url: String,
    pub role: Role,
    #[serde(default)]
    pub favourites: Vec<Uuid>,
    #[serde(default)]
    pub order_line_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        password_salt: String,
        address: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            password_salt,
            address,
            avatar_url: String::new(),
            role,
            favourites: Vec::new(),
            order_line_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// User projection safe to put on the wire: no digest, no salt.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub address: String,
    pub avatar_url: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_carries_no_secrets() {
        let user = User::new(
            "alice".into(),
            "alice@example.com".into(),
            "deadbeef".into(),
            "cafe".into(),
            "12 Library Lane".into(),
            Role::User,
        );
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_salt").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
