//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookPatch, BookQuery, Capability, NewBook},
};

use super::{date_format::DayMonthYear, AuthenticatedUser, MessageResponse};

/// Book as exposed on the wire
#[serde_as]
#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Publication date (dd/mm/yyyy)
    #[serde_as(as = "Option<DayMonthYear>")]
    #[schema(value_type = Option<String>, example = "01/08/1965")]
    pub publication_date: Option<NaiveDate>,
    pub total_count: i32,
    pub borrowed_count: i32,
    /// True while at least one copy is on the shelf
    pub availability_status: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.id,
            total_count: book.total_count(),
            borrowed_count: book.borrowed_count(),
            availability_status: book.availability_status(),
            title: book.title,
            author: book.author,
            genre: book.genre,
            publication_date: book.publication_date,
        }
    }
}

/// Create book request
#[serde_as]
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
    /// Publication date (dd/mm/yyyy)
    #[serde_as(as = "Option<DayMonthYear>")]
    #[schema(value_type = Option<String>, example = "01/08/1965")]
    pub publication_date: Option<NaiveDate>,
    /// Number of copies owned (>= 0)
    #[serde(default)]
    pub total_count: i32,
}

impl From<CreateBookRequest> for NewBook {
    fn from(request: CreateBookRequest) -> Self {
        Self {
            title: request.title,
            author: request.author,
            genre: request.genre,
            publication_date: request.publication_date,
            total_count: request.total_count,
        }
    }
}

/// Update book request: omitted or empty fields are left unchanged
#[serde_as]
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    /// Publication date (dd/mm/yyyy)
    #[serde_as(as = "Option<DayMonthYear>")]
    #[schema(value_type = Option<String>, example = "01/08/1965")]
    pub publication_date: Option<NaiveDate>,
    /// New capacity; cannot be below the number of copies currently borrowed
    pub total_count: Option<i32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<UpdateBookRequest> for BookPatch {
    fn from(request: UpdateBookRequest) -> Self {
        Self {
            title: non_empty(request.title),
            author: non_empty(request.author),
            genre: non_empty(request.genre),
            publication_date: request.publication_date,
            total_count: request.total_count,
        }
    }
}

/// Paginated book listing
#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookResponse>,
    /// Total number of matching books
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("cookie_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = BookListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<BookListResponse>> {
    caller.require(Capability::ReadCatalog)?;

    let (books, total) = state.services.catalog.search_books(&query).await?;

    Ok(Json(BookListResponse {
        books: books.into_iter().map(BookResponse::from).collect(),
        total,
        page: query.page(),
        limit: query.limit(),
    }))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/id/{id}",
    tag = "books",
    security(("cookie_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<BookResponse>> {
    caller.require(Capability::ReadCatalog)?;

    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book.into()))
}

/// Get a book by exact title
#[utoipa::path(
    get,
    path = "/books/title/{title}",
    tag = "books",
    security(("cookie_auth" = [])),
    params(
        ("title" = String, Path, description = "Exact book title")
    ),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_by_title(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(title): Path<String>,
) -> AppResult<Json<BookResponse>> {
    caller.require(Capability::ReadCatalog)?;

    let book = state.services.catalog.get_book_by_title(&title).await?;
    Ok(Json(book.into()))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books/createBook",
    tag = "books",
    security(("cookie_auth" = [])),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin or Librarian only")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateBookRequest>, AppError>,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    caller.require(Capability::ManageCatalog)?;

    let created = state.services.catalog.create_book(request.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/updateBook/{id}",
    tag = "books",
    security(("cookie_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid input or total below borrowed count"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBookRequest>, AppError>,
) -> AppResult<Json<BookResponse>> {
    caller.require(Capability::ManageCatalog)?;

    let updated = state.services.catalog.update_book(id, request.into()).await?;
    Ok(Json(updated.into()))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/deleteBook/{id}",
    tag = "books",
    security(("cookie_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has active borrows")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    caller.require(Capability::ManageCatalog)?;

    state.services.catalog.delete_book(id).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}
