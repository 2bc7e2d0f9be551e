//! Borrow records (loan audit trail)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One loan of one copy. `returned_on == None` means the copy is still out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub book_id: i32,
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub borrowed_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_on: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    pub fn is_outstanding(&self) -> bool {
        self.returned_on.is_none()
    }
}

/// Borrower identity captured from the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Borrower {
    pub username: String,
    pub email: String,
    pub mobile: String,
}

/// Insert payload for a new loan
#[derive(Debug, Clone)]
pub struct NewBorrowRecord {
    pub book_id: i32,
    pub borrower: Borrower,
    pub borrowed_on: DateTime<Utc>,
}

/// Borrow history line joined with its book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowHistoryEntry {
    pub id: i32,
    pub book_id: i32,
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub borrowed_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_on: Option<DateTime<Utc>>,
    /// `None` once the book has been deleted
    pub book_title: Option<String>,
    pub author: Option<String>,
}
