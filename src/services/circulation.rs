//! Borrow / return service.
//!
//! Each operation is one transaction holding the book row lock: the book is read,
//! validated, and written back together with its borrow record, so the borrowed count
//! always equals the number of outstanding records for that book.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowHistoryEntry, BorrowRecord, Borrower, Caller, Capability, NewBorrowRecord},
    repository::CatalogStore,
};

use super::with_deadline;

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn CatalogStore>,
    deadline: Duration,
}

impl CirculationService {
    pub fn new(store: Arc<dyn CatalogStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Borrow one copy of a book
    pub async fn borrow(&self, book_id: i32, borrower: &Borrower) -> AppResult<BorrowRecord> {
        let result = with_deadline(self.deadline, "borrow", async {
            let mut tx = self.store.begin().await?;
            let mut book = tx.lock_book(book_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} not found", book_id))
            })?;

            if tx
                .lock_outstanding(book_id, &borrower.username)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "{} already has book {} on loan",
                    borrower.username, book_id
                )));
            }

            book.check_out()?;

            let record = tx
                .insert_borrow(&NewBorrowRecord {
                    book_id,
                    borrower: borrower.clone(),
                    borrowed_on: Utc::now(),
                })
                .await?;
            tx.save_book(&book).await?;

            Ok((tx, (record, book)))
        })
        .await;

        match result {
            Ok((record, book)) => {
                tracing::info!(
                    book_id,
                    username = %borrower.username,
                    borrowed_count = book.borrowed_count(),
                    total_count = book.total_count(),
                    "Book borrowed"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::debug!(book_id, username = %borrower.username, error = %e, "Borrow rejected");
                Err(e)
            }
        }
    }

    /// Return the borrower's outstanding copy of a book
    pub async fn return_book(&self, book_id: i32, borrower: &Borrower) -> AppResult<BorrowRecord> {
        let (record, book) = with_deadline(self.deadline, "return", async {
            let mut tx = self.store.begin().await?;
            // Book row first, same lock order as borrow.
            let mut book = tx.lock_book(book_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} not found", book_id))
            })?;

            let outstanding = tx
                .lock_outstanding(book_id, &borrower.username)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "No active borrow of book {} found for {}",
                        book_id, borrower.username
                    ))
                })?;

            let record = tx.mark_returned(outstanding.id, Utc::now()).await?;
            book.check_in()?;
            tx.save_book(&book).await?;

            Ok((tx, (record, book)))
        })
        .await?;

        tracing::info!(
            book_id,
            username = %borrower.username,
            borrowed_count = book.borrowed_count(),
            total_count = book.total_count(),
            "Book returned"
        );
        Ok(record)
    }

    /// Borrow history visible to the caller, newest borrow first.
    /// Members only see their own records.
    pub async fn history(&self, caller: &Caller) -> AppResult<Vec<BorrowHistoryEntry>> {
        caller.require(Capability::ReadCatalog)?;
        let filter = if caller.role.can(Capability::ViewAllHistory) {
            None
        } else {
            Some(caller.username.as_str())
        };
        self.store.borrow_history(filter).await
    }
}
