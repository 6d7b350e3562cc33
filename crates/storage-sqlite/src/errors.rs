//! Diesel and r2d2 failures, and their mapping onto `circlepoints_core` errors.

use circlepoints_core::errors::{DatabaseError, Error};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Error type of code running against a live connection.
///
/// Never leaves this crate: repositories convert it with `into_core()` or `?`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("No pooled connection available: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Diesel query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A domain error raised inside a write job. Carried through the
    /// transaction unchanged so callers still see e.g. a precondition failure.
    #[error(transparent)]
    Core(Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Core(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(DieselError::RollbackTransaction)
            | StorageError::QueryFailed(DieselError::AlreadyInTransaction) => Error::Database(
                DatabaseError::TransactionFailed("transaction was rolled back".to_string()),
            ),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::Core(e) => e,
        }
    }
}

/// `.into_core()` for driver results, routed through [`StorageError`].
pub trait IntoCore<T> {
    fn into_core(self) -> circlepoints_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> circlepoints_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> circlepoints_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}
