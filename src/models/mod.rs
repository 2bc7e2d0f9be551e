//! Data models for the catalog

pub mod book;
pub mod borrow;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookPatch, BookQuery, NewBook};
pub use borrow::{BorrowHistoryEntry, BorrowRecord, Borrower, NewBorrowRecord};
pub use user::{Caller, Capability, Role};
