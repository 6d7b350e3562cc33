//! Error types shared by every circle points crate.
//!
//! Nothing here depends on a database driver; the storage crate maps its own
//! failures onto [`DatabaseError`].

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the points domain.
///
/// Every variant maps onto one [`ErrorKind`], which is what callers use to
/// decide between rejecting a request and offering a retry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse classification of an [`Error`] as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any transaction opened.
    Validation,
    /// Well-formed request that the current state does not allow.
    PreconditionFailed,
    /// Transactional infrastructure fault. Nothing was persisted.
    StorageUnavailable,
    NotFound,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(DatabaseError::NotFound(_)) | Error::NotFound(_) => ErrorKind::NotFound,
            Error::Database(DatabaseError::UniqueViolation(_))
            | Error::Database(DatabaseError::ForeignKeyViolation(_)) => {
                ErrorKind::PreconditionFailed
            }
            Error::Database(DatabaseError::MigrationFailed(_)) => ErrorKind::Internal,
            Error::Database(_) => ErrorKind::StorageUnavailable,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Precondition(_) => ErrorKind::PreconditionFailed,
            Error::Unexpected(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        Error::NotFound(format!("{} '{}'", what, id))
    }
}

/// Storage failure, already stripped of driver types by the storage crate.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Cannot reach the database: {0}")]
    ConnectionFailed(String),

    #[error("Cannot build the connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("No such row: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    UniqueViolation(String),

    /// A referenced goal, reward or group row does not exist.
    #[error("Dangling reference: {0}")]
    ForeignKeyViolation(String),

    /// The transaction was rolled back; none of its writes are visible.
    #[error("Transaction rolled back: {0}")]
    TransactionFailed(String),

    /// The writer did not answer within its budget. The job may still commit.
    #[error("Storage call timed out after {0} ms")]
    Timeout(u64),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Storage invariant broken: {0}")]
    Internal(String),
}

/// Malformed input, rejected before anything is written.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("'{0}' must not be blank")]
    MissingField(String),

    #[error("'{field}' must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("Start date {start} is after end date {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// The request is well formed but the current state does not allow it.
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Insufficient balance: {required} points required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Reward '{0}' is no longer active")]
    RewardInactive(String),

    #[error("Reward '{reward_id}' reached its redemption cap of {max_redeems}")]
    RedemptionCapReached { reward_id: String, max_redeems: i64 },

    #[error("Reward '{reward_id}' does not belong to group '{group_id}'")]
    WrongGroup { reward_id: String, group_id: String },

    #[error("Goal '{0}' is not in its active window")]
    GoalOutsideWindow(String),

    #[error("Cannot move redemption from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Only group admins can {0}")]
    AdminRequired(&'static str),

    #[error("User '{user_id}' is not an active member of group '{group_id}'")]
    NotMember { user_id: String, group_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_faults_are_retryable() {
        let err = Error::from(DatabaseError::Timeout(30_000));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(err.is_retryable());

        let err = Error::from(DatabaseError::QueryFailed("disk I/O error".into()));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejections_are_not_retryable() {
        let err = Error::from(PreconditionError::InsufficientBalance {
            required: 50,
            available: 10,
        });
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(!err.is_retryable());

        let err = Error::from(ValidationError::MissingField("name".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = Error::from(DatabaseError::NotFound("reward".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
