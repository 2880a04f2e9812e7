//! Book catalog service: search, genres, details, creation.

use crate::db::{Book, BookWithFlag, Database, now_millis, now_timestamp};
use crate::error::{AppError, Result};
use crate::storage::CoverStore;
use crate::validate::{self, ListBooksParams, NewBookRequest, PageParams};
use serde::Serialize;

/// One page of the searchable book listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    /// Books on this page, annotated with the viewer's read flag.
    pub data: Vec<BookWithFlag>,
    /// Total page count over all matching books.
    pub total_pages: u32,
    /// The requested page.
    pub current_page: u32,
}

/// One page of a genre listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenrePage {
    /// Books on this page.
    pub data: Vec<Book>,
    /// Total count of books matching the genre.
    pub total_books: u32,
    /// The requested page.
    pub current_page: u32,
    /// Total page count.
    pub total_pages: u32,
}

/// Uploaded cover file as received from the multipart form.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    /// Original filename, used in the storage key.
    pub file_name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Catalog service.
pub struct CatalogService {
    db: Database,
    covers: CoverStore,
}

impl CatalogService {
    /// Create a new catalog service.
    pub fn new(db: Database, covers: CoverStore) -> Self {
        Self { db, covers }
    }

    /// Search the catalog.
    ///
    /// The read flag is scoped to `viewer_id`; anonymous callers get
    /// `read = false` on every row.
    pub fn list_books(&self, params: &ListBooksParams, viewer_id: Option<&str>) -> Result<BookPage> {
        let (query, page, limit) = params.validate()?;

        let data = self.db.search_books(query, viewer_id, page, limit)?;
        let count = self.db.count_books(query)?;

        Ok(BookPage {
            data,
            total_pages: total_pages(count, limit),
            current_page: page,
        })
    }

    /// Distinct genre values across the catalog.
    pub fn list_genres(&self) -> Result<Vec<String>> {
        self.db.list_genres()
    }

    /// Books matching a genre (case-insensitive substring), paginated.
    pub fn list_books_by_genre(&self, genre: &str, params: &PageParams) -> Result<GenrePage> {
        let genre = genre.trim();
        if genre.is_empty() {
            return Err(AppError::Validation {
                field: "genre",
                message: "Genre is required".to_string(),
            });
        }

        let (page, limit) = params.validate()?;

        let data = self.db.books_by_genre(genre, page, limit)?;
        let count = self.db.count_books_by_genre(genre)?;

        Ok(GenrePage {
            data,
            total_books: count,
            current_page: page,
            total_pages: total_pages(count, limit),
        })
    }

    /// Look up one book by its canonical ID.
    pub fn book_details(&self, id: &str) -> Result<Book> {
        validate::canonical_id("id", "Book ID", id)?;

        self.db
            .get_book(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Validate, upload the cover, then persist a new book.
    ///
    /// Validation runs before the upload so invalid input never leaves an
    /// orphaned blob. If the insert fails after the upload succeeded, the
    /// blob is deleted best-effort.
    pub async fn add_book(&self, req: &NewBookRequest, cover: Option<CoverUpload>) -> Result<Book> {
        let (title, author, genre, publication_year) = req.validate()?;

        let cover = cover.ok_or_else(|| AppError::Validation {
            field: "coverImage",
            message: "Cover image is required".to_string(),
        })?;

        if image::guess_format(&cover.bytes).is_err() {
            return Err(AppError::Validation {
                field: "coverImage",
                message: "Cover image must be a valid image file".to_string(),
            });
        }

        let key = cover_key(&cover.file_name);
        let url = self.covers.put(&key, &cover.bytes).await?;

        let now = now_timestamp();
        let book = Book {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            publication_year,
            cover_image: Some(url),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.db.insert_book(&book) {
            if let Err(cleanup) = self.covers.delete(&key).await {
                tracing::warn!(error = %cleanup, key, "Failed to remove cover after insert error");
            }
            return Err(err);
        }

        Ok(book)
    }
}

/// Storage key for a cover upload, namespaced by upload time.
fn cover_key(file_name: &str) -> String {
    // Path separators in client filenames must not escape the prefix.
    let name = file_name.replace(['/', '\\'], "_");
    format!("covers/{}_{}", now_millis(), name)
}

fn total_pages(count: u32, limit: u32) -> u32 {
    count.div_ceil(limit)
}
