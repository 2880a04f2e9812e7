//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::catalog::CatalogService;
use crate::status::ReadStatusService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Book catalog service.
    pub catalog: Arc<CatalogService>,
    /// Read-status service.
    pub status: Arc<ReadStatusService>,
}

impl AppState {
    /// Create new application state.
    pub fn new(auth: AuthService, catalog: CatalogService, status: ReadStatusService) -> Self {
        Self {
            auth: Arc::new(auth),
            catalog: Arc::new(catalog),
            status: Arc::new(status),
        }
    }
}
