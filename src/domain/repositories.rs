//! Repository trait definitions
//!
//! These traits define the contract for catalog data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::catalog::PricingType;
use super::DomainError;

/// Category of services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: String,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

/// Catalog entry that providers can offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogService {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub service_type: Option<String>,
    pub pricing_type: PricingType,
    pub base_price: f64,
    /// Hours
    pub estimated_duration: Option<f64>,
    pub is_active: bool,
    pub popularity_score: i32,
    pub created_at: String,
}

/// Input for creating a catalog service
#[derive(Debug, Clone, Deserialize)]
pub struct NewCatalogService {
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub service_type: Option<String>,
    pub pricing_type: PricingType,
    pub base_price: f64,
    pub estimated_duration: Option<f64>,
}

/// Filter criteria for catalog service queries
#[derive(Debug, Default, Clone)]
pub struct ServiceFilter {
    pub category_id: Option<String>,
    pub query: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Paginated result with total count
#[derive(Debug)]
pub struct PaginatedServices {
    pub services: Vec<CatalogService>,
    pub total: u64,
}

/// Repository trait for Category entity
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Active categories ordered by display order then name
    async fn find_all(&self) -> Result<Vec<Category>, DomainError>;

    /// Active categories without a parent
    async fn find_roots(&self) -> Result<Vec<Category>, DomainError>;

    /// Active direct children of a category
    async fn find_children(&self, parent_id: &str) -> Result<Vec<Category>, DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, DomainError>;

    async fn create(&self, input: NewCategory) -> Result<Category, DomainError>;
}

/// Repository trait for catalog services
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Active services matching the filter, with pagination support
    async fn find_all(&self, filter: ServiceFilter) -> Result<PaginatedServices, DomainError>;

    /// Active services with the highest popularity score first
    async fn find_popular(&self, limit: u64) -> Result<Vec<CatalogService>, DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogService>, DomainError>;

    async fn create(&self, input: NewCatalogService) -> Result<CatalogService, DomainError>;
}
