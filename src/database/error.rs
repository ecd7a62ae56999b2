use thiserror::Error;
use warp::{
    http::StatusCode,
    reject::Reject,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FoodgramError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("You cannot subscribe to yourself")]
    InvalidSelfReference,

    #[error("{0}")]
    Validation(String),

    /// Deleting a favorite, cart entry or subscription that was never created
    #[error("{0}")]
    MissingRelation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// The detail is only logged, clients see a generic message
    #[error("Internal server error")]
    Internal(String),
}

impl FoodgramError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FoodgramError::NotFound(_) => StatusCode::NOT_FOUND,
            FoodgramError::Duplicate(_)
            | FoodgramError::InvalidSelfReference
            | FoodgramError::Validation(_)
            | FoodgramError::MissingRelation(_) => StatusCode::BAD_REQUEST,
            FoodgramError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FoodgramError::Forbidden(_) => StatusCode::FORBIDDEN,
            FoodgramError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Replaces the message of a `Duplicate` coming out of a unique constraint
    /// with a field-level validation error.
    pub fn duplicate_as_validation(self, info: &str) -> Self {
        match self {
            FoodgramError::Duplicate(_) => Self::validation(info),
            other => other,
        }
    }
}

impl From<sqlx::Error> for FoodgramError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound(String::from("Not found")),
            sqlx::Error::Database(e) => match e.code().as_deref() {
                Some(UNIQUE_VIOLATION) => Self::Duplicate(String::from("Object already exists")),
                Some(FOREIGN_KEY_VIOLATION) => {
                    Self::NotFound(String::from("Referenced object does not exist"))
                }
                Some(CHECK_VIOLATION) => Self::Validation(format!("{}", e.message())),
                _ => {
                    log::error!("Database error: {e}");
                    Self::Internal(format!("{e}"))
                }
            },
            sqlx::Error::PoolTimedOut => {
                log::error!("Pool timed out");
                Self::Internal(String::from("Pool timed out"))
            }
            sqlx::Error::PoolClosed => Self::Internal(String::from("Pool closed")),
            e => {
                log::error!("Query failed: {e}");
                Self::Internal(format!("{e}"))
            }
        }
    }
}

impl From<argon2::password_hash::Error> for FoodgramError {
    fn from(value: argon2::password_hash::Error) -> Self {
        log::error!("Password hashing failed: {value}");
        Self::Internal(format!("{value}"))
    }
}

impl From<FoodgramError> for potion::Error {
    fn from(value: FoodgramError) -> Self {
        let info = Some(value.to_string());
        match value {
            FoodgramError::NotFound(_) => potion::Error {
                code: 404,
                info,
                redirect: None,
            },
            FoodgramError::Duplicate(_)
            | FoodgramError::InvalidSelfReference
            | FoodgramError::Validation(_)
            | FoodgramError::MissingRelation(_) => potion::Error {
                code: 400,
                info,
                redirect: None,
            },
            FoodgramError::Unauthorized(_) => potion::Error {
                code: 401,
                info,
                redirect: None,
            },
            FoodgramError::Forbidden(_) => potion::Error {
                code: 403,
                info,
                redirect: None,
            },
            FoodgramError::Internal(_) => potion::Error {
                code: 500,
                info,
                redirect: None,
            },
        }
    }
}

impl Reject for FoodgramError {}

// `From<FoodgramError> for Rejection` is provided by warp's blanket impl for `Reject` types.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(FoodgramError::not_found("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            FoodgramError::Duplicate("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FoodgramError::InvalidSelfReference.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FoodgramError::MissingRelation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FoodgramError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FoodgramError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_detail_is_hidden() {
        let error = FoodgramError::Internal("connection reset by peer".into());
        assert_eq!(error.to_string(), "Internal server error");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let error = FoodgramError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_can_be_reported_as_validation() {
        let error = FoodgramError::Duplicate("Object already exists".into())
            .duplicate_as_validation("Tag with this slug already exists");
        assert_eq!(
            error,
            FoodgramError::Validation("Tag with this slug already exists".into())
        );

        let untouched = FoodgramError::not_found("Tag").duplicate_as_validation("ignored");
        assert_eq!(untouched, FoodgramError::not_found("Tag"));
    }

    #[test]
    fn converts_into_potion_error() {
        let error: potion::Error = FoodgramError::not_found("Recipe").into();
        assert_eq!(error.code, 404);
        assert_eq!(error.info.as_deref(), Some("Recipe not found"));

        let error: potion::Error = FoodgramError::InvalidSelfReference.into();
        assert_eq!(error.code, 400);
    }
}
