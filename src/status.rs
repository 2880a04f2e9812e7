//! Per-user read/unread tracking.

use crate::db::{BookWithFlag, Database, ReadMark, ReadState};
use crate::error::Result;
use crate::validate::{StatusListParams, ToggleRequest};
use serde::Serialize;

/// One page of a read/unread listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPage {
    /// Books on this page.
    pub data: Vec<BookWithFlag>,
    /// Total count of the user's marks with the requested value.
    pub total_items: u32,
    /// Total page count.
    pub total_pages: u32,
    /// The requested page.
    pub current_page: u32,
    /// Page size.
    pub page_size: u32,
}

/// Read-status service.
pub struct ReadStatusService {
    db: Database,
}

impl ReadStatusService {
    /// Create a new read-status service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Toggle the (customer, book) mark.
    ///
    /// First toggle creates the row marked read; each further toggle flips
    /// it, so the operation is its own inverse.
    pub fn toggle(&self, req: &ToggleRequest) -> Result<ReadState> {
        let (customer_id, book_id) = req.validate()?;
        self.db.toggle_read_state(customer_id, book_id)
    }

    /// Books the user has marked read.
    pub fn list_read(&self, params: &StatusListParams) -> Result<StatusPage> {
        self.list(params, ReadMark::Read)
    }

    /// Books the user has marked unread.
    pub fn list_unread(&self, params: &StatusListParams) -> Result<StatusPage> {
        self.list(params, ReadMark::Unread)
    }

    fn list(&self, params: &StatusListParams, mark: ReadMark) -> Result<StatusPage> {
        let (customer_id, page, limit) = params.validate()?;

        let data = self.db.list_marked_books(customer_id, mark, page, limit)?;
        let count = self.db.count_marked(customer_id, mark)?;

        Ok(StatusPage {
            data,
            total_items: count,
            total_pages: count.div_ceil(limit),
            current_page: page,
            page_size: limit,
        })
    }
}
