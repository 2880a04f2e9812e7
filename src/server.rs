//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/login", post(handlers::login))
        .route("/signup", post(handlers::signup))
        .route("/get-books", get(handlers::get_books))
        .route("/get-genres", get(handlers::get_genres))
        .route("/get-books-by-genre/{genre}", get(handlers::get_books_by_genre))
        .route("/get-book-details/{id}", get(handlers::get_book_details))
        .route("/add-book", post(handlers::add_book))
        .route("/user-book-status/toggle", post(handlers::toggle_status))
        .route("/user-book-status/read", get(handlers::read_books))
        .route("/user-book-status/unread", get(handlers::unread_books));

    Router::new()
        .nest("/v1/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
