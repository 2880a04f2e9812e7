mod schema;

pub use schema::Database;

use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Catalog entry with bibliographic metadata and an optional cover URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique book ID (canonical UUID string).
    pub id: String,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Genre label.
    pub genre: String,
    /// Year of publication.
    pub publication_year: i32,
    /// Public URL of the uploaded cover image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Soft-delete flag. Reserved; no endpoint sets it.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// A book annotated with the viewer's read flag.
#[derive(Debug, Clone, Serialize)]
pub struct BookWithFlag {
    /// The book record.
    #[serde(flatten)]
    pub book: Book,
    /// Whether the viewer has marked this book read.
    pub read: bool,
}

/// User account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (canonical UUID string).
    pub id: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address, unique across users.
    pub email: String,
    /// Login handle, unique across users.
    pub user_name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Account creation timestamp.
    pub created_at: i64,
}

/// Whether a user has marked a book read or unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMark {
    /// The user has read the book.
    Read,
    /// The user has not read the book (or flipped it back).
    Unread,
}

impl ReadMark {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ReadMark::Read => "read",
            ReadMark::Unread => "unread",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(ReadMark::Read),
            "unread" => Some(ReadMark::Unread),
            _ => None,
        }
    }

    /// The opposite mark.
    pub fn flipped(self) -> Self {
        match self {
            ReadMark::Read => ReadMark::Unread,
            ReadMark::Unread => ReadMark::Read,
        }
    }
}

impl ToSql for ReadMark {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReadMark {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| ReadMark::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

/// Per-(user, book) read/unread record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadState {
    /// Row ID.
    pub id: i64,
    /// Owning user ID.
    #[serde(rename = "customerId")]
    pub user_id: String,
    /// Referenced book ID.
    pub book_id: String,
    /// Current mark.
    pub mark: ReadMark,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last toggle timestamp.
    pub updated_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Millisecond timestamp, used to namespace upload keys.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
