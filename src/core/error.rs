//! Typed error handling for the bookstore API
//!
//! One crate-wide error type with category sub-enums. Each category knows its
//! HTTP status code and a stable error code, so handlers can return
//! `Result<_, ApiError>` and let axum's `IntoResponse` produce the wire
//! format.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: malformed or rejected input → 400
//! - [`NotFoundError`]: lookup misses → 404
//! - [`AuthError`]: missing/invalid/expired credentials → 401
//! - [`ForbiddenError`]: role failures → 403
//! - [`ConflictError`]: uniqueness and version conflicts → 409
//! - [`StorageError`]: store failures → 500, generic message outward

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::storage::CartConflict;

/// The main error type for the bookstore API
#[derive(Debug)]
pub enum ApiError {
    /// Input validation failures
    Validation(ValidationError),

    /// Lookup misses
    NotFound(NotFoundError),

    /// Credential failures
    Auth(AuthError),

    /// Role failures
    Forbidden(ForbiddenError),

    /// Uniqueness and optimistic-version conflicts
    Conflict(ConflictError),

    /// Storage backend failures
    Storage(StorageError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(e) => write!(f, "{}", e),
            ApiError::NotFound(e) => write!(f, "{}", e),
            ApiError::Auth(e) => write!(f, "{}", e),
            ApiError::Forbidden(e) => write!(f, "{}", e),
            ApiError::Conflict(e) => write!(f, "{}", e),
            ApiError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(e) => e.error_code(),
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Auth(e) => e.error_code(),
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(e) => e.error_code(),
            ApiError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation(ValidationError::PriceMismatch {
                book_id,
                submitted,
                catalog,
            }) => Some(serde_json::json!({
                "book_id": book_id.to_string(),
                "submitted": submitted,
                "catalog": catalog,
            })),
            ApiError::Validation(ValidationError::IllegalTransition {
                order_number,
                from,
                to,
            }) => Some(serde_json::json!({
                "order_number": order_number,
                "from": from.to_string(),
                "to": to.to_string(),
            })),
            _ => None,
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationError::Field {
            field: field.into(),
            message: message.into(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(e) = &self {
            tracing::error!(error = %e.detail, "storage failure");
        }
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Checkout submitted with no lines
    EmptyOrder,

    /// Payment payload is missing fields required by the payment method
    MissingPaymentFields { method: &'static str },

    /// bKash phone number did not normalize to the national format
    InvalidPhoneNumber { value: String },

    /// Submitted line price disagrees with the catalog
    PriceMismatch {
        book_id: Uuid,
        submitted: f64,
        catalog: f64,
    },

    /// Status value outside the known set
    UnknownStatus { value: String },

    /// Target status is not reachable from a line's current status
    IllegalTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Generic single-field failure (signup rules, event rules, ...)
    Field { field: String, message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyOrder => write!(f, "No books in the order"),
            ValidationError::MissingPaymentFields { method } => {
                write!(f, "{} payment details are required", method)
            }
            ValidationError::InvalidPhoneNumber { value } => {
                write!(f, "'{}' is not a valid bKash phone number", value)
            }
            ValidationError::PriceMismatch {
                book_id,
                submitted,
                catalog,
            } => write!(
                f,
                "Submitted price {} for book {} does not match catalog price {}",
                submitted, book_id, catalog
            ),
            ValidationError::UnknownStatus { value } => {
                write!(f, "Invalid status provided: '{}'", value)
            }
            ValidationError::IllegalTransition {
                order_number,
                from,
                to,
            } => write!(
                f,
                "Order {} cannot move from {} to {}",
                order_number, from, to
            ),
            ValidationError::Field { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::EmptyOrder => "EMPTY_ORDER",
            ValidationError::MissingPaymentFields { .. } => "MISSING_PAYMENT_FIELDS",
            ValidationError::InvalidPhoneNumber { .. } => "INVALID_PHONE_NUMBER",
            ValidationError::PriceMismatch { .. } => "PRICE_MISMATCH",
            ValidationError::UnknownStatus { .. } => "UNKNOWN_STATUS",
            ValidationError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            ValidationError::Field { .. } => "VALIDATION_ERROR",
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

// =============================================================================
// Not-Found Errors
// =============================================================================

/// Lookup misses
#[derive(Debug)]
pub enum NotFoundError {
    /// An entity referenced by id does not exist
    Entity { kind: &'static str, id: Uuid },

    /// A query found no rows ("no orders found", "no sales found for today")
    NoMatch { what: String },
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundError::Entity { kind, id } => {
                write!(f, "{} with id '{}' not found", kind, id)
            }
            NotFoundError::NoMatch { what } => write!(f, "No {} found", what),
        }
    }
}

impl std::error::Error for NotFoundError {}

impl NotFoundError {
    pub fn entity(kind: &'static str, id: Uuid) -> ApiError {
        ApiError::NotFound(NotFoundError::Entity { kind, id })
    }

    pub fn no_match(what: impl Into<String>) -> ApiError {
        ApiError::NotFound(NotFoundError::NoMatch { what: what.into() })
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        ApiError::NotFound(err)
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Credential failures
#[derive(Debug)]
pub enum AuthError {
    /// No bearer token on the request
    MissingToken,

    /// Token not recognized by the session store
    InvalidToken,

    /// Token recognized but past its expiry
    ExpiredToken,

    /// Login with unknown username or wrong password
    BadCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Authentication token required"),
            AuthError::InvalidToken => write!(f, "Token invalid. Please sign in again"),
            AuthError::ExpiredToken => write!(f, "Token expired. Please sign in again"),
            AuthError::BadCredentials => write!(f, "Invalid username or password"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "EXPIRED_TOKEN",
            AuthError::BadCredentials => "BAD_CREDENTIALS",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

// =============================================================================
// Forbidden Errors
// =============================================================================

/// Role failures
#[derive(Debug)]
pub enum ForbiddenError {
    /// The operation requires the admin role
    AdminRequired,
}

impl fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenError::AdminRequired => write!(f, "Forbidden: admin access required"),
        }
    }
}

impl std::error::Error for ForbiddenError {}

impl From<ForbiddenError> for ApiError {
    fn from(err: ForbiddenError) -> Self {
        ApiError::Forbidden(err)
    }
}

// =============================================================================
// Conflict Errors
// =============================================================================

/// Uniqueness and version conflicts
#[derive(Debug)]
pub enum ConflictError {
    /// Username already registered
    UsernameTaken { username: String },

    /// Email already registered
    EmailTaken { email: String },

    /// Cart was modified concurrently; the caller should retry
    CartVersion { user_id: Uuid },
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictError::UsernameTaken { username } => {
                write!(f, "Username '{}' already exists", username)
            }
            ConflictError::EmailTaken { email } => {
                write!(f, "Email '{}' already exists", email)
            }
            ConflictError::CartVersion { user_id } => {
                write!(f, "Cart for user {} was modified concurrently", user_id)
            }
        }
    }
}

impl std::error::Error for ConflictError {}

impl ConflictError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConflictError::UsernameTaken { .. } => "USERNAME_TAKEN",
            ConflictError::EmailTaken { .. } => "EMAIL_TAKEN",
            ConflictError::CartVersion { .. } => "CART_CONFLICT",
        }
    }
}

impl From<ConflictError> for ApiError {
    fn from(err: ConflictError) -> Self {
        ApiError::Conflict(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Storage backend failure. The detail is logged server-side; the wire
/// message stays generic.
#[derive(Debug)]
pub struct StorageError {
    pub detail: String,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Internal server error")
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

/// Storage traits return `anyhow::Result`; this conversion routes the typed
/// cart conflict to 409 and everything else to a generic 500.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(conflict) = err.downcast_ref::<CartConflict>() {
            return ApiError::Conflict(ConflictError::CartVersion {
                user_id: conflict.user_id,
            });
        }
        ApiError::Storage(StorageError {
            detail: format!("{:#}", err),
        })
    }
}

/// A specialized Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_return_400() {
        let err = ApiError::Validation(ValidationError::EmptyOrder);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::Validation(ValidationError::UnknownStatus {
            value: "Shipped".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "UNKNOWN_STATUS");
    }

    #[test]
    fn test_not_found_returns_404() {
        let err = NotFoundError::entity("book", Uuid::nil());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("book"));
    }

    #[test]
    fn test_auth_errors_return_401() {
        assert_eq!(
            ApiError::Auth(AuthError::MissingToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::ExpiredToken).error_code(),
            "EXPIRED_TOKEN"
        );
    }

    #[test]
    fn test_forbidden_returns_403() {
        let err = ApiError::Forbidden(ForbiddenError::AdminRequired);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_conflicts_return_409() {
        let err = ApiError::Conflict(ConflictError::UsernameTaken {
            username: "alice".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "USERNAME_TAKEN");
    }

    #[test]
    fn test_storage_error_message_is_generic() {
        let err = ApiError::Storage(StorageError {
            detail: "connection refused to mongodb://...".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_cart_conflict_downcast_from_anyhow() {
        let user_id = Uuid::new_v4();
        let err: anyhow::Error = CartConflict { user_id }.into();
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
        assert_eq!(api.error_code(), "CART_CONFLICT");
    }

    #[test]
    fn test_other_anyhow_becomes_storage() {
        let err = anyhow::anyhow!("mongo went away");
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_price_mismatch_details() {
        let err = ApiError::Validation(ValidationError::PriceMismatch {
            book_id: Uuid::nil(),
            submitted: 90.0,
            catalog: 100.0,
        });
        let response = err.to_response();
        assert_eq!(response.code, "PRICE_MISMATCH");
        assert!(response.details.is_some());
    }
}
