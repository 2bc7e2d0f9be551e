//! In-process catalog store.
//!
//! A transaction takes the store's writer lock for its whole lifetime and works on a
//! staged copy of the state. `commit` publishes the copy; dropping the transaction
//! discards it. Every unit of work is therefore linearized, which is stricter than the
//! per-book serialization the Postgres backend gives.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, BorrowHistoryEntry, BorrowRecord, NewBook, NewBorrowRecord},
};

use super::{CatalogStore, CatalogTransaction};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    books: BTreeMap<i32, Book>,
    borrows: Vec<BorrowRecord>,
    last_book_id: i32,
    last_borrow_id: i32,
}

impl MemoryState {
    fn outstanding(&self, book_id: i32, username: &str) -> Option<&BorrowRecord> {
        self.borrows
            .iter()
            .find(|r| r.book_id == book_id && r.username == username && r.is_outstanding())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.last_book_id += 1;
        let created = Book::created(state.last_book_id, book);
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn get_book_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.values().find(|b| b.title == title).cloned())
    }

    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let state = self.state.lock().await;
        let matching: Vec<&Book> = state.books.values().filter(|b| query.matches(b)).collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn borrow_history(&self, username: Option<&str>) -> AppResult<Vec<BorrowHistoryEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<BorrowHistoryEntry> = state
            .borrows
            .iter()
            .filter(|r| username.map_or(true, |u| r.username == u))
            .map(|r| {
                let book = state.books.get(&r.book_id);
                BorrowHistoryEntry {
                    id: r.id,
                    book_id: r.book_id,
                    username: r.username.clone(),
                    email: r.email.clone(),
                    mobile: r.mobile.clone(),
                    borrowed_on: r.borrowed_on,
                    returned_on: r.returned_on,
                    book_title: book.map(|b| b.title.clone()),
                    author: book.map(|b| b.author.clone()),
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.borrowed_on
                .cmp(&a.borrowed_on)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl CatalogTransaction for MemoryTransaction {
    async fn lock_book(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.staged.books.get(&id).cloned())
    }

    async fn save_book(&mut self, book: &Book) -> AppResult<()> {
        match self.staged.books.get_mut(&book.id) {
            Some(slot) => {
                *slot = book.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Book with id {} not found", book.id))),
        }
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        self.staged
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn count_outstanding(&mut self, book_id: i32) -> AppResult<i64> {
        Ok(self
            .staged
            .borrows
            .iter()
            .filter(|r| r.book_id == book_id && r.is_outstanding())
            .count() as i64)
    }

    async fn lock_outstanding(
        &mut self,
        book_id: i32,
        username: &str,
    ) -> AppResult<Option<BorrowRecord>> {
        Ok(self.staged.outstanding(book_id, username).cloned())
    }

    async fn insert_borrow(&mut self, record: &NewBorrowRecord) -> AppResult<BorrowRecord> {
        if self
            .staged
            .outstanding(record.book_id, &record.borrower.username)
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "{} already has book {} on loan",
                record.borrower.username, record.book_id
            )));
        }

        self.staged.last_borrow_id += 1;
        let created = BorrowRecord {
            id: self.staged.last_borrow_id,
            book_id: record.book_id,
            username: record.borrower.username.clone(),
            email: record.borrower.email.clone(),
            mobile: record.borrower.mobile.clone(),
            borrowed_on: record.borrowed_on,
            returned_on: None,
        };
        self.staged.borrows.push(created.clone());
        Ok(created)
    }

    async fn mark_returned(&mut self, record_id: i32, at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let record = self
            .staged
            .borrows
            .iter_mut()
            .find(|r| r.id == record_id && r.is_outstanding())
            .ok_or_else(|| {
                AppError::Conflict(format!("Borrow record {} already returned", record_id))
            })?;
        record.returned_on = Some(at);
        Ok(record.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
