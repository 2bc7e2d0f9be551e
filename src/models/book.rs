//! Book model and inventory accounting.
//!
//! `borrowed_count` and `total_count` are the only stored inventory state; availability
//! is always derived from them. Count mutations go through [`Book::check_out`],
//! [`Book::check_in`] and [`Book::resize`] so the `0 <= borrowed <= total` invariant is
//! checked in one place.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book row from the catalog store
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_date: Option<NaiveDate>,
    total_count: i32,
    borrowed_count: i32,
}

impl Book {
    /// Build a freshly created book: nothing borrowed yet.
    pub fn created(id: i32, new_book: &NewBook) -> Self {
        Self {
            id,
            title: new_book.title.clone(),
            author: new_book.author.clone(),
            genre: new_book.genre.clone(),
            publication_date: new_book.publication_date,
            total_count: new_book.total_count,
            borrowed_count: 0,
        }
    }

    pub fn total_count(&self) -> i32 {
        self.total_count
    }

    pub fn borrowed_count(&self) -> i32 {
        self.borrowed_count
    }

    /// True iff at least one copy is on the shelf
    pub fn availability_status(&self) -> bool {
        self.borrowed_count < self.total_count
    }

    /// Take one copy off the shelf.
    pub fn check_out(&mut self) -> AppResult<()> {
        if !self.availability_status() {
            return Err(AppError::Conflict(format!(
                "Book {} is not available ({}/{} borrowed)",
                self.id, self.borrowed_count, self.total_count
            )));
        }
        self.borrowed_count += 1;
        Ok(())
    }

    /// Put one copy back on the shelf.
    pub fn check_in(&mut self) -> AppResult<()> {
        if self.borrowed_count == 0 {
            // An outstanding record exists but the counter says otherwise.
            return Err(AppError::Internal(format!(
                "Book {} has an outstanding loan but borrowed_count is 0",
                self.id
            )));
        }
        self.borrowed_count -= 1;
        Ok(())
    }

    /// Change capacity; cannot drop below the copies currently lent out.
    pub fn resize(&mut self, total_count: i32) -> AppResult<()> {
        if total_count < 0 {
            return Err(AppError::Validation(
                "Total count cannot be negative".to_string(),
            ));
        }
        if total_count < self.borrowed_count {
            return Err(AppError::Validation(format!(
                "Total count cannot be less than borrowed count ({})",
                self.borrowed_count
            )));
        }
        self.total_count = total_count;
        Ok(())
    }
}

/// Create book request (engine input)
#[derive(Debug, Clone, Validate)]
pub struct NewBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Total count cannot be negative"))]
    pub total_count: i32,
}

/// Partial update: `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub total_count: Option<i32>,
}

impl BookPatch {
    /// Apply the overrides onto `book`. Nothing is written if the count change is rejected.
    pub fn apply(self, book: &mut Book) -> AppResult<()> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        if let Some(total_count) = self.total_count {
            book.resize(total_count)?;
        }
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(date) = self.publication_date {
            book.publication_date = Some(date);
        }
        Ok(())
    }
}

/// Book listing query parameters.
///
/// Values are kept as raw strings so that a malformed `page` or `limit` falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
    /// Substring matched against id, title, author and genre
    pub search: Option<String>,
}

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

impl BookQuery {
    pub fn page(&self) -> i64 {
        parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        parse_positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Trimmed search term, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Case-insensitive substring match used by the in-memory store
    pub fn matches(&self, book: &Book) -> bool {
        let Some(term) = self.search_term() else {
            return true;
        };
        let term = term.to_lowercase();
        book.id.to_string().contains(&term)
            || book.title.to_lowercase().contains(&term)
            || book.author.to_lowercase().contains(&term)
            || book.genre.to_lowercase().contains(&term)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i32) -> Book {
        Book::created(
            1,
            &NewBook {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                genre: "Science Fiction".to_string(),
                publication_date: NaiveDate::from_ymd_opt(1965, 8, 1),
                total_count: total,
            },
        )
    }

    #[test]
    fn test_created_book_availability() {
        assert!(book(2).availability_status());
        assert!(!book(0).availability_status());
        assert_eq!(book(2).borrowed_count(), 0);
    }

    #[test]
    fn test_check_out_until_exhausted() {
        let mut b = book(2);
        b.check_out().unwrap();
        assert!(b.availability_status());
        b.check_out().unwrap();
        assert_eq!(b.borrowed_count(), 2);
        assert!(!b.availability_status());

        let err = b.check_out().unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(b.borrowed_count(), 2);
    }

    #[test]
    fn test_check_in_restores_availability() {
        let mut b = book(1);
        b.check_out().unwrap();
        b.check_in().unwrap();
        assert_eq!(b.borrowed_count(), 0);
        assert!(b.availability_status());
        assert!(matches!(b.check_in(), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_resize_below_borrowed_rejected() {
        let mut b = book(3);
        b.check_out().unwrap();
        b.check_out().unwrap();
        assert!(matches!(b.resize(1), Err(AppError::Validation(_))));
        assert!(matches!(b.resize(-1), Err(AppError::Validation(_))));
        assert_eq!(b.total_count(), 3);

        b.resize(2).unwrap();
        assert!(!b.availability_status());
    }

    #[test]
    fn test_patch_leaves_book_untouched_on_error() {
        let mut b = book(1);
        b.check_out().unwrap();
        let before = b.clone();
        let patch = BookPatch {
            title: Some("Children of Dune".to_string()),
            total_count: Some(0),
            ..Default::default()
        };
        assert!(patch.apply(&mut b).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn test_new_book_validation() {
        let mut new_book = NewBook {
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            genre: "Novel".to_string(),
            publication_date: None,
            total_count: -1,
        };
        assert!(new_book.validate().is_err());
        new_book.total_count = 0;
        assert!(new_book.validate().is_ok());
    }

    #[test]
    fn test_query_defaults_and_floors() {
        let q = BookQuery::default();
        assert_eq!((q.page(), q.limit(), q.offset()), (1, 10, 0));

        let q = BookQuery {
            page: Some("0".to_string()),
            limit: Some("abc".to_string()),
            search: Some("   ".to_string()),
        };
        assert_eq!((q.page(), q.limit()), (1, 10));
        assert_eq!(q.search_term(), None);

        let q = BookQuery {
            page: Some("3".to_string()),
            limit: Some("5".to_string()),
            search: None,
        };
        assert_eq!(q.offset(), 10);
    }

    #[test]
    fn test_query_huge_page_saturates_offset() {
        let q = BookQuery {
            page: Some(i64::MAX.to_string()),
            limit: Some("10".to_string()),
            search: None,
        };
        assert_eq!(q.page(), i64::MAX);
        assert_eq!(q.offset(), i64::MAX);
    }

    #[test]
    fn test_query_matches_any_field() {
        let b = book(1);
        let q = |s: &str| BookQuery {
            search: Some(s.to_string()),
            ..Default::default()
        };
        assert!(q("herbert").matches(&b));
        assert!(q("FICTION").matches(&b));
        assert!(q("1").matches(&b));
        assert!(!q("tolkien").matches(&b));
    }
}
