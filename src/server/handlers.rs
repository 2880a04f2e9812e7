//! HTTP request handlers.

use crate::auth::Claims;
use crate::catalog::CoverUpload;
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::validate::{
    ListBooksParams, LoginRequest, NewBookRequest, PageParams, SignupRequest, StatusListParams,
    ToggleRequest,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Uniform response envelope, mirrored by error responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T: Serialize> {
    status_code: u16,
    data: Option<T>,
    message: &'static str,
}

/// Build a success envelope carrying `data`.
fn envelope<T: Serialize>(status: StatusCode, data: T, message: &'static str) -> Response {
    (
        status,
        Json(Envelope {
            status_code: status.as_u16(),
            data: Some(data),
            message,
        }),
    )
        .into_response()
}

/// Build a success envelope with `data: null`.
fn envelope_empty(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        Json(Envelope::<()> {
            status_code: status.as_u16(),
            data: None,
            message,
        }),
    )
        .into_response()
}

// ============================================================================
// AUTH
// ============================================================================

/// Login response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    user_details: crate::db::User,
    token: String,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    let (user, token) = state.auth.login(&req)?;

    Ok(envelope(
        StatusCode::OK,
        LoginData {
            user_details: user,
            token,
        },
        "Login successful",
    ))
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Response> {
    state.auth.signup(&req)?;
    Ok(envelope_empty(
        StatusCode::CREATED,
        "User created successfully",
    ))
}

// ============================================================================
// CATALOG
// ============================================================================

/// GET /get-books
pub async fn get_books(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListBooksParams>,
) -> Result<Response> {
    // Public endpoint; a valid token scopes the read flags to the caller.
    let viewer = optional_viewer(&state, &headers);
    let page = state.catalog.list_books(&params, viewer.as_deref())?;

    Ok(envelope(StatusCode::OK, page, "Data fetched successfully"))
}

/// GET /get-genres
pub async fn get_genres(State(state): State<AppState>) -> Result<Response> {
    let genres = state.catalog.list_genres()?;
    Ok(envelope(
        StatusCode::OK,
        genres,
        "Genres fetched successfully",
    ))
}

/// GET /get-books-by-genre/{genre}
pub async fn get_books_by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response> {
    let page = state.catalog.list_books_by_genre(&genre, &params)?;
    Ok(envelope(StatusCode::OK, page, "Books fetched successfully"))
}

/// GET /get-book-details/{id}
pub async fn get_book_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let book = state.catalog.book_details(&id)?;
    Ok(envelope(
        StatusCode::OK,
        book,
        "Book details fetched successfully",
    ))
}

/// POST /add-book (multipart)
pub async fn add_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    authenticate(&state, &headers)?;

    let (req, cover) = read_book_form(multipart).await?;
    let book = state.catalog.add_book(&req, cover).await?;

    Ok(envelope(
        StatusCode::CREATED,
        book,
        "Book added successfully",
    ))
}

/// Collect the add-book form fields and cover file.
async fn read_book_form(
    mut multipart: Multipart,
) -> Result<(NewBookRequest, Option<CoverUpload>)> {
    let mut req = NewBookRequest::default();
    let mut cover = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name().unwrap_or_default() {
            "title" => req.title = Some(field.text().await.map_err(bad_multipart)?),
            "author" => req.author = Some(field.text().await.map_err(bad_multipart)?),
            "genre" => req.genre = Some(field.text().await.map_err(bad_multipart)?),
            "publicationYear" => {
                req.publication_year = Some(field.text().await.map_err(bad_multipart)?)
            }
            "coverImage" => {
                let file_name = field.file_name().unwrap_or("cover").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?.to_vec();
                cover = Some(CoverUpload { file_name, bytes });
            }
            _ => {
                // Unknown fields are drained and ignored.
                let _ = field.bytes().await;
            }
        }
    }

    Ok((req, cover))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation {
        field: "body",
        message: format!("Invalid multipart payload: {}", err),
    }
}

// ============================================================================
// READ STATUS
// ============================================================================

/// POST /user-book-status/toggle
pub async fn toggle_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ToggleRequest>,
) -> Result<Response> {
    authenticate(&state, &headers)?;

    let row = state.status.toggle(&req)?;
    Ok(envelope(
        StatusCode::OK,
        row,
        "Book status toggled successfully",
    ))
}

/// GET /user-book-status/read
pub async fn read_books(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<StatusListParams>,
) -> Result<Response> {
    authenticate(&state, &headers)?;

    let page = state.status.list_read(&params)?;
    Ok(envelope(StatusCode::OK, page, "Books fetched successfully"))
}

/// GET /user-book-status/unread
pub async fn unread_books(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<StatusListParams>,
) -> Result<Response> {
    authenticate(&state, &headers)?;

    let page = state.status.list_unread(&params)?;
    Ok(envelope(StatusCode::OK, page, "Books fetched successfully"))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract the bearer token from the Authorization header.
///
/// A header without the `Bearer ` prefix is treated as the raw token.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).to_string())
        .filter(|v| !v.is_empty())
}

/// Require a valid bearer token.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims> {
    let token = extract_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Access denied: no token provided".to_string())
    })?;

    state.auth.authenticate(&token)
}

/// Claims of the caller, if a valid token was supplied.
fn optional_viewer(state: &AppState, headers: &HeaderMap) -> Option<String> {
    extract_token(headers)
        .and_then(|token| state.auth.authenticate(&token).ok())
        .map(|claims| claims.sub)
}
