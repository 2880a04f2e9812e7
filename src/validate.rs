//! Request-shape validation.
//!
//! Each endpoint has a typed request struct with a `validate()` entry point.
//! Checks run in declaration order; the first violation wins and is returned
//! as [`AppError::Validation`] carrying the offending field.

use crate::error::{AppError, Result};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Lower bound for accepted publication years.
pub const MIN_PUBLICATION_YEAR: i32 = 1000;

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl LoginRequest {
    /// Validate and return `(email, password)`.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let email = require_email("email", &self.email)?;
        let password = require("password", "Password is required", &self.password)?;
        Ok((email, password))
    }
}

/// Signup payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Login handle.
    pub user_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
}

impl SignupRequest {
    /// Validate and return `(first_name, last_name, user_name, email, password)`.
    pub fn validate(&self) -> Result<(&str, &str, &str, &str, &str)> {
        let first_name = require("firstName", "First name is required", &self.first_name)?;
        let last_name = require("lastName", "Last name is required", &self.last_name)?;
        let user_name = require("userName", "Username is required", &self.user_name)?;
        let email = require_email("email", &self.email)?;
        let password = require("password", "Password is required", &self.password)?;
        Ok((first_name, last_name, user_name, email, password))
    }
}

/// Query parameters for the searchable book listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksParams {
    /// Optional search text, matched against title, author and genre.
    pub query: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
}

impl ListBooksParams {
    /// Validate and return `(query, page, limit)`.
    pub fn validate(&self) -> Result<(Option<&str>, u32, u32)> {
        let page = parse_positive("page", "Page", &self.page, 1)?;
        let limit = parse_positive("limit", "Limit", &self.limit, 10)?;
        Ok((self.query.as_deref(), page, limit))
    }
}

/// Plain pagination query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
}

impl PageParams {
    /// Validate and return `(page, limit)`.
    pub fn validate(&self) -> Result<(u32, u32)> {
        let page = parse_positive("page", "Page", &self.page, 1)?;
        let limit = parse_positive("limit", "Limit", &self.limit, 10)?;
        Ok((page, limit))
    }
}

/// Fields of the add-book multipart form (cover file handled separately).
#[derive(Debug, Clone, Default)]
pub struct NewBookRequest {
    /// Book title.
    pub title: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Genre label.
    pub genre: Option<String>,
    /// Publication year, as received from the form.
    pub publication_year: Option<String>,
}

impl NewBookRequest {
    /// Validate and return `(title, author, genre, publication_year)`.
    pub fn validate(&self) -> Result<(&str, &str, &str, i32)> {
        let title = require("title", "Title is required", &self.title)?;
        let author = require("author", "Author is required", &self.author)?;
        let genre = require("genre", "Genre is required", &self.genre)?;

        let raw_year = require(
            "publicationYear",
            "Publication year is required",
            &self.publication_year,
        )?;
        let year: i32 = raw_year.trim().parse().map_err(|_| AppError::Validation {
            field: "publicationYear",
            message: "Publication year must be a number".to_string(),
        })?;

        let current_year = Utc::now().year();
        if year < MIN_PUBLICATION_YEAR || year > current_year {
            return Err(AppError::Validation {
                field: "publicationYear",
                message: format!(
                    "Publication year must be between {} and {}",
                    MIN_PUBLICATION_YEAR, current_year
                ),
            });
        }

        Ok((title, author, genre, year))
    }
}

/// Toggle payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    /// The user whose mark is toggled.
    pub customer_id: Option<String>,
    /// The book being marked.
    pub book_id: Option<String>,
}

impl ToggleRequest {
    /// Validate and return `(customer_id, book_id)`.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let customer_id = require("customerId", "Customer ID is required", &self.customer_id)?;
        canonical_id("customerId", "Customer ID", customer_id)?;
        let book_id = require("bookId", "Book ID is required", &self.book_id)?;
        canonical_id("bookId", "Book ID", book_id)?;
        Ok((customer_id, book_id))
    }
}

/// Query parameters for the read/unread listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListParams {
    /// The user whose marks are listed.
    pub customer_id: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
}

impl StatusListParams {
    /// Validate and return `(customer_id, page, limit)`.
    pub fn validate(&self) -> Result<(&str, u32, u32)> {
        let customer_id = require("customerId", "Customer ID is required", &self.customer_id)?;
        canonical_id("customerId", "Customer ID", customer_id)?;
        let page = parse_positive("page", "Page", &self.page, 1)?;
        let limit = parse_positive("limit", "Limit", &self.limit, 10)?;
        Ok((customer_id, page, limit))
    }
}

/// Require a non-empty string field.
pub fn require<'a>(
    field: &'static str,
    message: &str,
    value: &'a Option<String>,
) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation {
            field,
            message: message.to_string(),
        }),
    }
}

/// Require a well-formed email address.
pub fn require_email<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    let email = require(field, "Email is required", value)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(AppError::Validation {
            field,
            message: "Email must be a valid email address".to_string(),
        });
    }

    Ok(email)
}

/// Parse an optional positive page/limit parameter, falling back to the
/// given default when absent.
fn parse_positive(
    field: &'static str,
    label: &str,
    value: &Option<String>,
    default: u32,
) -> Result<u32> {
    let raw = match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(default),
    };

    let parsed: u32 = raw.parse().map_err(|_| AppError::Validation {
        field,
        message: format!("{} must be a number", label),
    })?;

    if parsed < 1 {
        return Err(AppError::Validation {
            field,
            message: format!("{} must be at least 1", label),
        });
    }

    Ok(parsed)
}

/// Require a canonical UUID: the value must round-trip through the parser
/// back to the identical string. Rejects uppercase, braced, simple-hex and
/// urn forms even though the parser accepts them.
pub fn canonical_id(field: &'static str, label: &str, value: &str) -> Result<()> {
    let canonical = Uuid::parse_str(value)
        .map(|id| id.to_string())
        .map_err(|_| AppError::Validation {
            field,
            message: format!("{} must be a valid ID", label),
        })?;

    if canonical != value {
        return Err(AppError::Validation {
            field,
            message: format!("{} must be a valid ID", label),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_round_trip() {
        let id = Uuid::new_v4().to_string();
        assert!(canonical_id("id", "Book ID", &id).is_ok());

        // Parser-accepted but non-canonical forms are rejected.
        assert!(canonical_id("id", "Book ID", &id.to_uppercase()).is_err());
        assert!(canonical_id("id", "Book ID", &id.replace('-', "")).is_err());
        assert!(canonical_id("id", "Book ID", &format!("urn:uuid:{}", id)).is_err());
        assert!(canonical_id("id", "Book ID", "invalidid").is_err());
    }

    #[test]
    fn page_params_defaults_and_bounds() {
        let params = PageParams::default();
        assert_eq!(params.validate().unwrap(), (1, 10));

        let params = PageParams {
            page: Some("3".to_string()),
            limit: Some("25".to_string()),
        };
        assert_eq!(params.validate().unwrap(), (3, 25));

        let params = PageParams {
            page: Some("0".to_string()),
            limit: None,
        };
        assert!(params.validate().is_err());

        let params = PageParams {
            page: Some("abc".to_string()),
            limit: None,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn signup_first_error_wins() {
        let req = SignupRequest {
            first_name: None,
            last_name: None,
            user_name: None,
            email: None,
            password: None,
        };

        match req.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "firstName"),
            other => panic!("expected validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn email_shape() {
        let ok = Some("reader@example.com".to_string());
        assert!(require_email("email", &ok).is_ok());

        for bad in ["reader", "@example.com", "reader@example", "reader@.com"] {
            let value = Some(bad.to_string());
            assert!(require_email("email", &value).is_err(), "{}", bad);
        }
    }

    #[test]
    fn publication_year_range() {
        let base = NewBookRequest {
            title: Some("Dune".to_string()),
            author: Some("Herbert".to_string()),
            genre: Some("Sci-Fi".to_string()),
            publication_year: Some("1965".to_string()),
        };
        assert_eq!(base.validate().unwrap().3, 1965);

        let future = NewBookRequest {
            publication_year: Some("3000".to_string()),
            ..base.clone()
        };
        match future.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "publicationYear"),
            other => panic!("expected validation error, got {:?}", other.err()),
        }

        let ancient = NewBookRequest {
            publication_year: Some("999".to_string()),
            ..base
        };
        assert!(ancient.validate().is_err());
    }
}
