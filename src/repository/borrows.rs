//! Borrow records repository (read side)

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::BorrowHistoryEntry};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Borrow history joined with book title/author, newest borrow first.
    /// Records outlive their book, hence the LEFT JOIN.
    pub async fn history(&self, username: Option<&str>) -> AppResult<Vec<BorrowHistoryEntry>> {
        let entries = sqlx::query_as::<_, BorrowHistoryEntry>(
            r#"
            SELECT r.id, r.book_id, r.username, r.email, r.mobile,
                   r.borrowed_on, r.returned_on,
                   b.title AS book_title, b.author
            FROM borrow_records r
            LEFT JOIN books b ON b.id = r.book_id
            WHERE ($1::text IS NULL OR r.username = $1)
            ORDER BY r.borrowed_on DESC, r.id DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
