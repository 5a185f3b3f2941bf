//! Transactional incident store on PostgreSQL + PostGIS.
//!
//! Unique-constraint violations are expected control flow here (the
//! content-hash and source-url barriers), never bugs; validation-trigger
//! rejections are terminal for the row and surface the trigger's reason.

pub mod cache;
pub mod db;
pub mod evidence;
pub mod incidents;
pub mod sources;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("validation trigger rejected row: {0}")]
    ValidationRejected(String),

    #[error("incident {0} not found")]
    NotFound(Uuid),
}

/// Postgres unique_violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Whether an error is a unique-constraint violation, optionally on a
/// specific constraint.
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    if db.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return false;
    }
    match constraint {
        Some(name) => db.constraint() == Some(name),
        None => true,
    }
}

/// Extract a validation-trigger rejection, which arrives as a RAISE
/// EXCEPTION whose message starts with `VALIDATION_FAILED`.
pub fn validation_rejection(err: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db) = err else {
        return None;
    };
    let message = db.message();
    message
        .starts_with("VALIDATION_FAILED")
        .then(|| message.to_string())
}

/// Map a raw sqlx error onto [`StoreError`], promoting trigger rejections.
pub fn map_db_error(err: sqlx::Error) -> StoreError {
    match validation_rejection(&err) {
        Some(reason) => StoreError::ValidationRejected(reason),
        None => StoreError::Db(err),
    }
}
