//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{CategoryRepository, ServiceRepository};
use crate::infrastructure::config::Config;
use crate::infrastructure::{SeaOrmCategoryRepository, SeaOrmServiceRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Category repository
    pub category_repo: Arc<dyn CategoryRepository>,
    /// Catalog service repository
    pub service_repo: Arc<dyn ServiceRepository>,
    /// VAT rate (percent) applied when an invoice request has none
    pub default_tax_rate: f64,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let category_repo = Arc::new(SeaOrmCategoryRepository::new(db.clone()));
        let service_repo = Arc::new(SeaOrmServiceRepository::new(db.clone()));

        Self {
            db,
            category_repo,
            service_repo,
            default_tax_rate: config.default_tax_rate,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
