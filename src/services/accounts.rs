//! Account management: signup, login, profile and password changes
//!
//! Login issues an opaque session token checked by the bearer-auth
//! extractor; there is no JWT. Passwords are stored as salted digests (see
//! [`crate::core::credentials`]).

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::credentials;
use crate::core::error::{ApiError, ApiResult, AuthError, ConflictError, NotFoundError};
use crate::domain::session::Session;
use crate::domain::user::{PublicUser, Role, User};
use crate::storage::{SessionStore, UserStore};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 4, message = "length should be greater than three"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 5, message = "length should be greater than four"))]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Clone)]
pub struct AccountsService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AccountsService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> ApiResult<PublicUser> {
        request.validate().map_err(first_field_error)?;

        if request.password != request.confirm_password {
            return Err(ApiError::field("confirmPassword", "passwords do not match"));
        }

        if self
            .users
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(ConflictError::UsernameTaken {
                username: request.username,
            }
            .into());
        }
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(ConflictError::EmailTaken {
                email: request.email,
            }
            .into());
        }

        let salt = credentials::generate_salt();
        let hash = credentials::hash_password(&salt, &request.password);
        let user = User::new(
            request.username,
            request.email,
            hash,
            salt,
            request.address,
            Role::User,
        );

        let user = self.users.insert(user).await?;
        Ok(PublicUser::from(&user))
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<LoginResponse> {
        let user = self
            .users
            .find_by_username(request.username.trim())
            .await?
            .ok_or(AuthError::BadCredentials)?;

        if !credentials::verify_password(
            &user.password_salt,
            &user.password_hash,
            &request.password,
        ) {
            return Err(AuthError::BadCredentials.into());
        }

        let session = Session::issue(user.id, user.role, self.session_ttl);
        let session = self.sessions.insert(session).await?;

        Ok(LoginResponse {
            token: session.token,
            user_id: user.id,
            role: user.role,
        })
    }

    pub async fn profile(&self, user_id: &Uuid) -> ApiResult<PublicUser> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| NotFoundError::entity("user", *user_id))?;
        Ok(PublicUser::from(&user))
    }

    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        request: UpdateProfileRequest,
    ) -> ApiResult<PublicUser> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| NotFoundError::entity("user", *user_id))?;

        if let Some(username) = request.username {
            if username != user.username {
                if self.users.find_by_username(&username).await?.is_some() {
                    return Err(ConflictError::UsernameTaken { username }.into());
                }
                user.username = username;
            }
        }
        if let Some(email) = request.email {
            if email != user.email {
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(ConflictError::EmailTaken { email }.into());
                }
                user.email = email;
            }
        }
        if let Some(address) = request.address {
            user.address = address;
        }
        if let Some(avatar_url) = request.avatar_url {
            user.avatar_url = avatar_url;
        }

        user.touch();
        let user = self.users.update(user_id, user).await?;
        Ok(PublicUser::from(&user))
    }

    pub async fn change_password(
        &self,
        user_id: &Uuid,
        request: ChangePasswordRequest,
    ) -> ApiResult<()> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| NotFoundError::entity("user", *user_id))?;

        if !credentials::verify_password(
            &user.password_salt,
            &user.password_hash,
            &request.current_password,
        ) {
            return Err(ApiError::field(
                "currentPassword",
                "current password is incorrect",
            ));
        }
        if request.new_password.len() < 5 {
            return Err(ApiError::field(
                "newPassword",
                "length should be greater than four",
            ));
        }

        user.password_salt = credentials::generate_salt();
        user.password_hash = credentials::hash_password(&user.password_salt, &request.new_password);
        user.touch();
        self.users.update(user_id, user).await?;
        Ok(())
    }

    /// Customer accounts (role `user`), digests omitted.
    pub async fn list_customers(&self) -> ApiResult<Vec<PublicUser>> {
        let users = self.users.list_by_role(Role::User).await?;
        if users.is_empty() {
            return Err(NotFoundError::no_match("users"));
        }
        Ok(users.iter().map(PublicUser::from).collect())
    }
}

/// Collapse a `validator` error set into the first field failure.
fn first_field_error(errors: validator::ValidationErrors) -> ApiError {
    for (field, failures) in errors.field_errors() {
        if let Some(failure) = failures.first() {
            let message = failure
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| failure.code.to_string());
            return ApiError::field(field.to_string(), message);
        }
    }
    ApiError::field("body", "invalid input")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_rules() {
        let request = SignupRequest {
            username: "abc".into(),
            email: "a@example.com".into(),
            password: "longenough".into(),
            confirm_password: "longenough".into(),
            address: String::new(),
        };
        assert!(request.validate().is_err());

        let request = SignupRequest {
            username: "abcd".into(),
            email: "not-an-email".into(),
            password: "longenough".into(),
            confirm_password: "longenough".into(),
            address: String::new(),
        };
        assert!(request.validate().is_err());

        let request = SignupRequest {
            username: "abcd".into(),
            email: "a@example.com".into(),
            password: "long".into(),
            confirm_password: "long".into(),
            address: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_first_field_error_maps_to_400() {
        let request = SignupRequest {
            username: "abc".into(),
            email: "a@example.com".into(),
            password: "longenough".into(),
            confirm_password: "longenough".into(),
            address: String::new(),
        };
        let err = first_field_error(request.validate().unwrap_err());
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("username"));
    }
}
