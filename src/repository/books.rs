//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookQuery, NewBook},
};

/// Column list matching `Book`'s `FromRow` fields
pub(crate) const BOOK_COLUMNS: &str =
    "id, title, author, genre, publication_date, total_count, borrowed_count";

/// Escape LIKE wildcards so the search term is matched literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new book with nothing borrowed
    pub async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let query = format!(
            r#"
            INSERT INTO books (title, author, genre, publication_date, total_count, borrowed_count)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );

        let created = sqlx::query_as::<_, Book>(&query)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.genre)
            .bind(book.publication_date)
            .bind(book.total_count)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let query = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Get the first book with exactly this title
    pub async fn get_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let query = format!(
            "SELECT {} FROM books WHERE title = $1 ORDER BY id LIMIT 1",
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Search books by id/title/author/genre substring, ordered by id
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let pattern = query.search_term().map(like_pattern);

        let filter = r#"
            ($1::text IS NULL
             OR CAST(id AS TEXT) ILIKE $1
             OR title ILIKE $1
             OR author ILIKE $1
             OR genre ILIKE $1)
        "#;

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", filter);
        let page_query = format!(
            "SELECT {} FROM books WHERE {} ORDER BY id LIMIT $2 OFFSET $3",
            BOOK_COLUMNS, filter
        );

        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let books = sqlx::query_as::<_, Book>(&page_query)
            .bind(&pattern)
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }
}
