//! Repository layer: the catalog store contract and its backends.
//!
//! The engine never talks to a database handle directly. It receives an
//! `Arc<dyn CatalogStore>` at construction and runs every count-mutating operation
//! inside a [`CatalogTransaction`], which holds the per-book critical section until it
//! is committed or dropped. Dropping an uncommitted transaction rolls it back.

pub mod books;
pub mod borrows;
pub mod memory;
pub mod transaction;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookQuery, BorrowHistoryEntry, BorrowRecord, NewBook, NewBorrowRecord},
};

pub use memory::MemoryStore;
pub use transaction::PgCatalogTransaction;

/// Reads and non-transactional writes against the catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Connectivity probe for readiness checks
    async fn ping(&self) -> AppResult<()>;

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book>;

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>>;

    async fn get_book_by_title(&self, title: &str) -> AppResult<Option<Book>>;

    /// One page of books plus the total number of matches
    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;

    /// Borrow history, newest borrow first; `username` restricts to one borrower
    async fn borrow_history(&self, username: Option<&str>) -> AppResult<Vec<BorrowHistoryEntry>>;

    /// Open a unit of work
    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>>;
}

/// A unit of work. Rows returned by the `lock_*` methods stay locked until commit or drop.
#[async_trait]
pub trait CatalogTransaction: Send {
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>>;

    async fn save_book(&mut self, book: &Book) -> AppResult<()>;

    async fn delete_book(&mut self, id: i32) -> AppResult<()>;

    async fn count_outstanding(&mut self, book_id: i32) -> AppResult<i64>;

    async fn lock_outstanding(
        &mut self,
        book_id: i32,
        username: &str,
    ) -> AppResult<Option<BorrowRecord>>;

    async fn insert_borrow(&mut self, record: &NewBorrowRecord) -> AppResult<BorrowRecord>;

    async fn mark_returned(&mut self, record_id: i32, at: DateTime<Utc>) -> AppResult<BorrowRecord>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// PostgreSQL-backed catalog store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub borrows: borrows::BorrowsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            borrows: borrows::BorrowsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book> {
        self.books.create(book).await
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        self.books.get_by_id(id).await
    }

    async fn get_book_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        self.books.get_by_title(title).await
    }

    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.books.search(query).await
    }

    async fn borrow_history(&self, username: Option<&str>) -> AppResult<Vec<BorrowHistoryEntry>> {
        self.borrows.history(username).await
    }

    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCatalogTransaction::new(tx)))
    }
}
