//! PostgreSQL unit of work.
//!
//! Book rows are locked with `SELECT ... FOR UPDATE`, so two transactions touching the
//! same book serialize on that row while transactions on different books proceed in
//! parallel. Lock order is always book row first, then borrow record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BorrowRecord, NewBorrowRecord},
};

use super::{books::BOOK_COLUMNS, CatalogTransaction};

const RECORD_COLUMNS: &str = "id, book_id, username, email, mobile, borrowed_on, returned_on";

pub struct PgCatalogTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgCatalogTransaction {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl CatalogTransaction for PgCatalogTransaction {
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        let query = format!("SELECT {} FROM books WHERE id = $1 FOR UPDATE", BOOK_COLUMNS);
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(book)
    }

    async fn save_book(&mut self, book: &Book) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre = $4, publication_date = $5,
                total_count = $6, borrowed_count = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.publication_date)
        .bind(book.total_count())
        .bind(book.borrowed_count())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }
        Ok(())
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    async fn count_outstanding(&mut self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND returned_on IS NULL",
        )
        .bind(book_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn lock_outstanding(
        &mut self,
        book_id: i32,
        username: &str,
    ) -> AppResult<Option<BorrowRecord>> {
        let query = format!(
            r#"
            SELECT {}
            FROM borrow_records
            WHERE book_id = $1 AND username = $2 AND returned_on IS NULL
            FOR UPDATE
            "#,
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, BorrowRecord>(&query)
            .bind(book_id)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn insert_borrow(&mut self, record: &NewBorrowRecord) -> AppResult<BorrowRecord> {
        let query = format!(
            r#"
            INSERT INTO borrow_records (book_id, username, email, mobile, borrowed_on)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, BorrowRecord>(&query)
            .bind(record.book_id)
            .bind(&record.borrower.username)
            .bind(&record.borrower.email)
            .bind(&record.borrower.mobile)
            .bind(record.borrowed_on)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                    format!(
                        "{} already has book {} on loan",
                        record.borrower.username, record.book_id
                    ),
                ),
                other => AppError::Database(other),
            })
    }

    async fn mark_returned(&mut self, record_id: i32, at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let query = format!(
            r#"
            UPDATE borrow_records
            SET returned_on = $2
            WHERE id = $1 AND returned_on IS NULL
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, BorrowRecord>(&query)
            .bind(record_id)
            .bind(at)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Borrow record {} already returned", record_id))
            })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
