use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Referential integrity is advisory (see spec): read marks may outlive
        // their book. The bundled SQLite defaults FK enforcement on, so restore
        // the historical per-connection default the schema was written against.
        conn.pragma_update(None, "foreign_keys", false)
            .map_err(|e| AppError::Database(format!("Failed to disable foreign keys: {}", e)))?;

        conn.execute_batch(
            r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                user_name TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                genre TEXT NOT NULL,
                publication_year INTEGER NOT NULL,
                cover_image TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Per-(user, book) read/unread marks
            CREATE TABLE IF NOT EXISTS read_states (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                mark TEXT NOT NULL DEFAULT 'read',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (book_id) REFERENCES books(id)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre);
            CREATE INDEX IF NOT EXISTS idx_read_states_user ON read_states(user_id, mark);
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, first_name, last_name, email, user_name, password_hash, is_deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.email,
                user.user_name,
                user.password_hash,
                user.is_deleted,
                user.created_at,
            ],
        )
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("users.email") {
                AppError::Conflict("Email already exists".to_string())
            } else if msg.contains("users.user_name") {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get an active user by email (login lookup).
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, first_name, last_name, email, user_name, password_hash, is_deleted, created_at
             FROM users WHERE email = ?1 AND is_deleted = 0",
            params![email],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, first_name, last_name, email, user_name, password_hash, is_deleted, created_at
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    /// Check whether any account (active or soft-deleted) holds this email.
    pub fn email_taken(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            params![email],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|e| AppError::Database(format!("Failed to check email: {}", e)))
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            user_name: row.get(4)?,
            password_hash: row.get(5)?,
            is_deleted: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a new book.
    pub fn insert_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (id, title, author, genre, publication_year, cover_image, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                book.id,
                book.title,
                book.author,
                book.genre,
                book.publication_year,
                book.cover_image,
                book.is_deleted,
                book.created_at,
                book.updated_at,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to insert book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, author, genre, publication_year, cover_image, is_deleted, created_at, updated_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get book: {}", e)))
    }

    /// Search books by title, author or genre (case-insensitive substring),
    /// annotating each with the viewer's read flag.
    ///
    /// With no viewer the join matches nothing and every flag is false.
    pub fn search_books(
        &self,
        query: Option<&str>,
        viewer_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<BookWithFlag>> {
        let pattern = like_pattern(query);
        let offset = (page as i64 - 1) * limit as i64;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT b.id, b.title, b.author, b.genre, b.publication_year, b.cover_image,
                        b.is_deleted, b.created_at, b.updated_at,
                        COALESCE(rs.mark, '') = 'read'
                 FROM books b
                 LEFT JOIN read_states rs ON rs.book_id = b.id AND rs.user_id = ?1
                 WHERE b.title LIKE ?2 OR b.author LIKE ?2 OR b.genre LIKE ?2
                 ORDER BY b.created_at, b.id
                 LIMIT ?3 OFFSET ?4",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(
                params![viewer_id, pattern, limit as i64, offset],
                |row| {
                    Ok(BookWithFlag {
                        book: Self::row_to_book(row)?,
                        read: row.get(9)?,
                    })
                },
            )
            .map_err(|e| AppError::Database(format!("Failed to search books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Count books matching a search query.
    pub fn count_books(&self, query: Option<&str>) -> Result<u32> {
        let pattern = like_pattern(query);
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM books
             WHERE title LIKE ?1 OR author LIKE ?1 OR genre LIKE ?1",
            params![pattern],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Database(format!("Failed to count books: {}", e)))
    }

    /// Distinct genre values across all books.
    pub fn list_genres(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT DISTINCT genre FROM books ORDER BY genre")
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let genres = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| AppError::Database(format!("Failed to list genres: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect genres: {}", e)))?;

        Ok(genres)
    }

    /// Books whose genre matches the given substring, paginated.
    pub fn books_by_genre(&self, genre: &str, page: u32, limit: u32) -> Result<Vec<Book>> {
        let pattern = like_pattern(Some(genre));
        let offset = (page as i64 - 1) * limit as i64;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, author, genre, publication_year, cover_image, is_deleted, created_at, updated_at
                 FROM books WHERE genre LIKE ?1
                 ORDER BY created_at, id
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![pattern, limit as i64, offset], Self::row_to_book)
            .map_err(|e| AppError::Database(format!("Failed to get books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Count books whose genre matches the given substring.
    pub fn count_books_by_genre(&self, genre: &str) -> Result<u32> {
        let pattern = like_pattern(Some(genre));
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM books WHERE genre LIKE ?1",
            params![pattern],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Database(format!("Failed to count books: {}", e)))
    }

    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            genre: row.get(3)?,
            publication_year: row.get(4)?,
            cover_image: row.get(5)?,
            is_deleted: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    // ========== READ STATE OPERATIONS ==========

    /// Toggle the (user, book) read mark in a single conditional upsert.
    ///
    /// Absent row: insert with mark = 'read'. Present row: negate the mark.
    /// One statement, so two concurrent toggles cannot both observe the
    /// pre-toggle state.
    pub fn toggle_read_state(&self, user_id: &str, book_id: &str) -> Result<ReadState> {
        let now = now_timestamp();
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO read_states (user_id, book_id, mark, created_at, updated_at)
             VALUES (?1, ?2, 'read', ?3, ?3)
             ON CONFLICT (user_id, book_id) DO UPDATE SET
                mark = CASE read_states.mark WHEN 'read' THEN 'unread' ELSE 'read' END,
                updated_at = excluded.updated_at",
            params![user_id, book_id, now],
        )
        .map_err(|e| AppError::Database(format!("Failed to toggle read state: {}", e)))?;

        conn.query_row(
            "SELECT id, user_id, book_id, mark, created_at, updated_at
             FROM read_states WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
            |row| {
                Ok(ReadState {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    book_id: row.get(2)?,
                    mark: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .map_err(|e| AppError::Database(format!("Failed to read toggled state: {}", e)))
    }

    /// Books the user has marked with the given mark, paginated in toggle
    /// order. Marks whose book no longer exists are skipped.
    pub fn list_marked_books(
        &self,
        user_id: &str,
        mark: ReadMark,
        page: u32,
        limit: u32,
    ) -> Result<Vec<BookWithFlag>> {
        let offset = (page as i64 - 1) * limit as i64;
        let read = mark == ReadMark::Read;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT b.id, b.title, b.author, b.genre, b.publication_year, b.cover_image,
                        b.is_deleted, b.created_at, b.updated_at
                 FROM read_states rs
                 JOIN books b ON b.id = rs.book_id
                 WHERE rs.user_id = ?1 AND rs.mark = ?2
                 ORDER BY rs.id
                 LIMIT ?3 OFFSET ?4",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![user_id, mark, limit as i64, offset], |row| {
                Ok(BookWithFlag {
                    book: Self::row_to_book(row)?,
                    read,
                })
            })
            .map_err(|e| AppError::Database(format!("Failed to list marked books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Count the user's marks with the given value.
    ///
    /// Counts mark rows, not joined books, so page totals follow the mark
    /// count even when a referenced book is gone.
    pub fn count_marked(&self, user_id: &str, mark: ReadMark) -> Result<u32> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM read_states WHERE user_id = ?1 AND mark = ?2",
            params![user_id, mark],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Database(format!("Failed to count marks: {}", e)))
    }
}

/// `LIKE` pattern for a case-insensitive substring match; `None` matches all.
fn like_pattern(query: Option<&str>) -> String {
    match query {
        Some(q) => format!("%{}%", q),
        None => "%".to_string(),
    }
}
