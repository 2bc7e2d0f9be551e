//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, circulation, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "0.3.0",
        description = "Library catalog and circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::get_book_by_title,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Circulation
        circulation::borrow_book,
        circulation::return_book,
        circulation::borrow_history,
    ),
    components(
        schemas(
            // Books
            books::BookResponse,
            books::BookListResponse,
            books::CreateBookRequest,
            books::UpdateBookRequest,
            crate::models::book::BookQuery,
            // Circulation
            crate::models::borrow::BorrowRecord,
            crate::models::borrow::BorrowHistoryEntry,
            crate::models::user::Role,
            // Health
            health::HealthResponse,
            // Common
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "circulation", description = "Borrowing, returns and history")
    )
)]
pub struct ApiDoc;

/// Session cookie issued by the identity service
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("jwt"))),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
