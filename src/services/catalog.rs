//! Catalog management service

use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookPatch, BookQuery, NewBook},
    repository::CatalogStore,
};

use super::with_deadline;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    deadline: Duration,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Search books with pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.store.search_books(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by exact title
    pub async fn get_book_by_title(&self, title: &str) -> AppResult<Book> {
        self.store
            .get_book_by_title(title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book titled '{}' not found", title)))
    }

    /// Create a new book with nothing borrowed
    pub async fn create_book(&self, new_book: NewBook) -> AppResult<Book> {
        new_book.validate()?;
        let created = self.store.insert_book(&new_book).await?;
        tracing::info!(
            book_id = created.id,
            total_count = created.total_count(),
            "Book created"
        );
        Ok(created)
    }

    /// Apply a partial update under the book's lock.
    /// Capacity can't shrink below the copies currently lent out.
    pub async fn update_book(&self, id: i32, patch: BookPatch) -> AppResult<Book> {
        let updated = with_deadline(self.deadline, "update book", async {
            let mut tx = self.store.begin().await?;
            let mut book = tx
                .lock_book(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

            patch.apply(&mut book)?;
            tx.save_book(&book).await?;
            Ok((tx, book))
        })
        .await?;

        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    /// Delete a book that has no outstanding loans
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        with_deadline(self.deadline, "delete book", async {
            let mut tx = self.store.begin().await?;
            tx.lock_book(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

            let outstanding = tx.count_outstanding(id).await?;
            if outstanding > 0 {
                return Err(AppError::Conflict(format!(
                    "Cannot delete book {} with {} active borrow(s)",
                    id, outstanding
                )));
            }

            tx.delete_book(id).await?;
            Ok((tx, ()))
        })
        .await?;

        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
