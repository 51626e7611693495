//! Error types for store operations.

use std::fmt;

use sqlx::error::ErrorKind;
use thiserror::Error;

/// What a failed statement ran into, as far as callers care.
///
/// Constraint failures are split by the schema rule that fired: duplicate
/// keys come from `UNIQUE (subject, name)` and the primary keys, missing
/// references from the `scan_id`/`question_id`/`topic_id` foreign keys, and
/// rejected values from the `CHECK` clauses on subject, match kind and
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    /// Another connection holds the lock past the busy timeout.
    BusyOrLocked,
    DuplicateKey,
    MissingReference,
    RejectedValue,
    /// No pooled connection became free in time.
    PoolTimeout,
    /// The pool is closed or the database file cannot be reached.
    Unavailable,
    Other,
}

// SQLite extended result codes.
const SQLITE_BUSY: u32 = 5;
const SQLITE_LOCKED: u32 = 6;
const SQLITE_CONSTRAINT: u32 = 19;
const SQLITE_CONSTRAINT_CHECK: u32 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: u32 = 787;
const SQLITE_CONSTRAINT_NOTNULL: u32 = 1299;
const SQLITE_CONSTRAINT_PRIMARYKEY: u32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: u32 = 2067;

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Self::Unavailable,
            sqlx::Error::Database(database_error) => match database_error.kind() {
                ErrorKind::UniqueViolation => Self::DuplicateKey,
                ErrorKind::ForeignKeyViolation => Self::MissingReference,
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => Self::RejectedValue,
                _ => Self::from_sqlite_code(database_error.code().as_deref()),
            },
            _ => Self::Other,
        }
    }

    /// Classifies a SQLite result code as reported by the driver, either
    /// numeric (`"2067"`) or symbolic (`"SQLITE_CONSTRAINT_UNIQUE"`).
    #[must_use]
    pub fn from_sqlite_code(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return Self::Other;
        };

        match code.parse::<u32>() {
            Ok(SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE) => Self::DuplicateKey,
            Ok(SQLITE_CONSTRAINT_FOREIGNKEY) => Self::MissingReference,
            Ok(SQLITE_CONSTRAINT_CHECK | SQLITE_CONSTRAINT_NOTNULL) => Self::RejectedValue,
            Ok(value) if value & 0xff == SQLITE_BUSY || value & 0xff == SQLITE_LOCKED => {
                Self::BusyOrLocked
            }
            // Plain or unlisted constraint codes: no more detail to go on.
            Ok(value) if value & 0xff == SQLITE_CONSTRAINT => Self::RejectedValue,
            Ok(_) => Self::Other,
            Err(_) => match code {
                "SQLITE_BUSY" | "SQLITE_LOCKED" => Self::BusyOrLocked,
                "SQLITE_CONSTRAINT_PRIMARYKEY" | "SQLITE_CONSTRAINT_UNIQUE" => Self::DuplicateKey,
                "SQLITE_CONSTRAINT_FOREIGNKEY" => Self::MissingReference,
                other if other.starts_with("SQLITE_CONSTRAINT") => Self::RejectedValue,
                _ => Self::Other,
            },
        }
    }

    /// True for the three constraint kinds.
    #[must_use]
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            Self::DuplicateKey | Self::MissingReference | Self::RejectedValue
        )
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::DuplicateKey => "duplicate_key",
            Self::MissingReference => "missing_reference",
            Self::RejectedValue => "rejected_value",
            Self::PoolTimeout => "pool_timeout",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: StoreDbErrorKind,
        message: String,
    },

    /// A scan with this id was already imported.
    #[error(
        "scan already imported: {0}\n  Suggestion: Give the scan a new id or remove the existing one first"
    )]
    DuplicateScan(String),

    /// A link names a question or topic that is not stored.
    #[error(
        "cannot link question '{question_id}' to topic '{topic_id}': one of them is not stored\n  Suggestion: Run `topicmap seed` and `topicmap import` before mapping"
    )]
    UnknownLinkTarget {
        question_id: String,
        topic_id: String,
    },

    /// A stored row could not be turned back into a typed record.
    #[error("invalid stored {table} row '{id}': {reason}")]
    InvalidRow {
        table: &'static str,
        id: String,
        reason: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    pub(crate) fn invalid_row(table: &'static str, id: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidRow {
            table,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the typed database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<StoreDbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::DuplicateScan(_) | Self::UnknownLinkTarget { .. } | Self::InvalidRow { .. } => {
                None
            }
        }
    }

    /// Returns true when this error is a database busy/locked condition.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        self.database_kind() == Some(StoreDbErrorKind::BusyOrLocked)
    }

    /// Returns true when a schema constraint rejected the write.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        self.database_kind().is_some_and(StoreDbErrorKind::is_constraint)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_database_message() {
        let err = StoreError::Database {
            kind: StoreDbErrorKind::Other,
            message: "connection failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("database error"));
        assert!(msg.contains("other"));
        assert!(msg.contains("connection failed"));
    }

    #[test]
    fn test_store_error_busy_flag() {
        let err = StoreError::Database {
            kind: StoreDbErrorKind::BusyOrLocked,
            message: "database is locked".to_string(),
        };
        assert_eq!(err.database_kind(), Some(StoreDbErrorKind::BusyOrLocked));
        assert!(err.is_busy_or_locked());
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_store_error_duplicate_scan_message() {
        let err = StoreError::DuplicateScan("scan-7".to_string());
        let msg = err.to_string();
        assert!(msg.contains("scan-7"));
        assert!(msg.contains("Suggestion"));
        assert_eq!(err.database_kind(), None);
    }

    #[test]
    fn test_store_error_from_sqlx_classifies_pool_errors() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.database_kind(), Some(StoreDbErrorKind::PoolTimeout));

        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.database_kind(), Some(StoreDbErrorKind::Unavailable));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_kind_from_extended_codes() {
        let cases = [
            ("2067", StoreDbErrorKind::DuplicateKey),
            ("1555", StoreDbErrorKind::DuplicateKey),
            ("787", StoreDbErrorKind::MissingReference),
            ("275", StoreDbErrorKind::RejectedValue),
            ("1299", StoreDbErrorKind::RejectedValue),
            ("19", StoreDbErrorKind::RejectedValue),
            ("5", StoreDbErrorKind::BusyOrLocked),
            ("517", StoreDbErrorKind::BusyOrLocked),
            ("6", StoreDbErrorKind::BusyOrLocked),
            ("1", StoreDbErrorKind::Other),
        ];
        for (code, expected) in cases {
            assert_eq!(StoreDbErrorKind::from_sqlite_code(Some(code)), expected, "code {code}");
        }
    }

    #[test]
    fn test_kind_from_symbolic_codes() {
        assert_eq!(
            StoreDbErrorKind::from_sqlite_code(Some("SQLITE_CONSTRAINT_FOREIGNKEY")),
            StoreDbErrorKind::MissingReference
        );
        assert_eq!(
            StoreDbErrorKind::from_sqlite_code(Some("SQLITE_CONSTRAINT_UNIQUE")),
            StoreDbErrorKind::DuplicateKey
        );
        assert_eq!(
            StoreDbErrorKind::from_sqlite_code(Some("SQLITE_BUSY")),
            StoreDbErrorKind::BusyOrLocked
        );
        assert_eq!(StoreDbErrorKind::from_sqlite_code(None), StoreDbErrorKind::Other);
    }

    #[test]
    fn test_unknown_link_target_message() {
        let err = StoreError::UnknownLinkTarget {
            question_id: "q9".to_string(),
            topic_id: "t1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("q9"));
        assert!(msg.contains("t1"));
        assert!(msg.contains("Suggestion"));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_store_error_invalid_row_message() {
        let err = StoreError::invalid_row("questions", "q1", "unknown subject: History");
        let msg = err.to_string();
        assert!(msg.contains("questions"));
        assert!(msg.contains("q1"));
        assert!(msg.contains("History"));
    }
}
