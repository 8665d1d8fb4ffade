//! Cross-cutting concerns: the error taxonomy and credential digests

pub mod credentials;
pub mod error;

pub use error::{
    ApiError, ApiResult, AuthError, ConflictError, ForbiddenError, NotFoundError, ValidationError,
};
