//! Borrow, return and borrow-history endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowHistoryEntry, BorrowRecord, Capability},
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "circulation",
    security(("cookie_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = BorrowRecord),
        (status = 403, description = "Members only"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not available or already borrowed by caller")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(book_id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<BorrowRecord>> {
    caller.require(Capability::Borrow)?;

    let record = state
        .services
        .circulation
        .borrow(book_id, &caller.borrower())
        .await?;
    Ok(Json(record))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "circulation",
    security(("cookie_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = BorrowRecord),
        (status = 403, description = "Members only"),
        (status = 404, description = "No active borrow for this book")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(book_id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<BorrowRecord>> {
    caller.require(Capability::Borrow)?;

    let record = state
        .services
        .circulation
        .return_book(book_id, &caller.borrower())
        .await?;
    Ok(Json(record))
}

/// Borrow history (members see their own records only)
#[utoipa::path(
    get,
    path = "/history",
    tag = "circulation",
    security(("cookie_auth" = [])),
    responses(
        (status = 200, description = "Borrow history, newest first", body = Vec<BorrowHistoryEntry>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn borrow_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowHistoryEntry>>> {
    let history = state.services.circulation.history(&caller).await?;
    Ok(Json(history))
}
