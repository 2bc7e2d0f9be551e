//! API handlers for the Bookshelf REST endpoints

pub mod books;
pub mod circulation;
pub mod date_format;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, Method},
    routing::{delete, get, post, put},
    RequestPartsExt, Router,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{config::CorsConfig, error::AppError, models::Caller, AppState};

/// Extractor for the caller resolved by the identity service.
///
/// The session token is read from the configured cookie (`jwt` by default), falling back
/// to an `Authorization: Bearer` header.
pub struct AuthenticatedUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = match jar.get(&state.config.identity.cookie_name) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                let TypedHeader(Authorization(bearer)) = parts
                    .extract::<TypedHeader<Authorization<Bearer>>>()
                    .await
                    .map_err(|_| AppError::Authentication("No valid session cookie found".to_string()))?;
                bearer.token().to_string()
            }
        };

        if token.is_empty() {
            return Err(AppError::Authentication("Empty session token".to_string()));
        }

        let caller = state.services.identity.validate(&token).await?;
        Ok(AuthenticatedUser(caller))
    }
}

/// Plain message body
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Session cookies need credentialed CORS, which rules out wildcards.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books))
        .route("/books/createBook", post(books::create_book))
        .route("/books/id/:id", get(books::get_book))
        .route("/books/title/:title", get(books::get_book_by_title))
        .route("/books/updateBook/:id", put(books::update_book))
        .route("/books/deleteBook/:id", delete(books::delete_book))
        // Circulation
        .route("/books/:id/borrow", post(circulation::borrow_book))
        .route("/books/:id/return", post(circulation::return_book))
        .route("/history", get(circulation::borrow_history))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
