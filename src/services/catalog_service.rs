//! Catalog Service - categories, services and provider offerings

use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::account::{Actor, UserType};
use crate::domain::catalog::{effective_price, validate_price};
use crate::domain::history::{HistoryAction, LinkedObject};
use crate::domain::{
    CatalogService, Category, CategoryRepository, NewCatalogService, NewCategory,
    PaginatedServices, ServiceFilter, ServiceRepository,
};
use crate::models::provider_service::{self, Entity as ProviderService};
use crate::models::service::Entity as Service;
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339};

pub async fn create_category(
    repo: &dyn CategoryRepository,
    actor: &Actor,
    input: NewCategory,
) -> Result<Category, ServiceError> {
    actor.require_admin()?;
    let category = repo.create(input).await?;
    tracing::info!("Category '{}' created", category.slug);
    Ok(category)
}

pub async fn get_category(
    repo: &dyn CategoryRepository,
    id: &str,
) -> Result<Category, ServiceError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category"))
}

pub async fn category_children(
    repo: &dyn CategoryRepository,
    id: &str,
) -> Result<Vec<Category>, ServiceError> {
    let parent = get_category(repo, id).await?;
    repo.find_children(&parent.id).await
}

pub async fn create_service(
    db: &DatabaseConnection,
    repo: &dyn ServiceRepository,
    actor: &Actor,
    input: NewCatalogService,
) -> Result<CatalogService, ServiceError> {
    actor.require_admin()?;
    let service = repo.create(input).await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Create, format!("Service '{}' created", service.name))
            .by(actor.user_id.clone())
            .about(LinkedObject::Service(service.id.clone()))
            .tags(&["catalog"]),
    )
    .await;

    Ok(service)
}

pub async fn list_services(
    repo: &dyn ServiceRepository,
    filter: ServiceFilter,
) -> Result<PaginatedServices, ServiceError> {
    repo.find_all(filter).await
}

pub const POPULAR_SERVICES: u64 = 10;

/// Most booked active services
pub async fn popular_services(
    repo: &dyn ServiceRepository,
) -> Result<Vec<CatalogService>, ServiceError> {
    repo.find_popular(POPULAR_SERVICES).await
}

pub async fn get_service(
    repo: &dyn ServiceRepository,
    id: &str,
) -> Result<CatalogService, ServiceError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Service"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProviderService {
    pub service_id: String,
    pub custom_price: Option<f64>,
    #[serde(default)]
    pub experience_years: i32,
}

/// A provider offering with the price a client would pay
#[derive(Debug, Clone, Serialize)]
pub struct ProviderServiceView {
    #[serde(flatten)]
    pub offer: provider_service::Model,
    pub service_name: String,
    pub pricing_type: String,
    pub effective_price: f64,
}

/// The provider adds a catalog service to their offer
pub async fn create_provider_service(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewProviderService,
) -> Result<ProviderServiceView, ServiceError> {
    if actor.role != UserType::Provider {
        return Err(ServiceError::forbidden("only providers can offer services"));
    }
    if input.experience_years < 0 {
        return Err(ServiceError::invalid("experience_years must not be negative"));
    }
    let custom_price = input
        .custom_price
        .map(|p| validate_price(p, "custom_price"))
        .transpose()?;

    let service = Service::find_by_id(input.service_id.clone())
        .one(db)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ServiceError::not_found("Service"))?;

    let existing = ProviderService::find()
        .filter(provider_service::Column::ProviderId.eq(actor.user_id.as_str()))
        .filter(provider_service::Column::ServiceId.eq(service.id.as_str()))
        .count(db)
        .await?;
    if existing > 0 {
        return Err(ServiceError::invalid("you already offer this service"));
    }

    let offer = provider_service::ActiveModel {
        id: Set(new_id()),
        provider_id: Set(actor.user_id.clone()),
        service_id: Set(service.id.clone()),
        custom_price: Set(custom_price),
        experience_years: Set(input.experience_years),
        is_available: Set(true),
        created_at: Set(now_rfc3339()),
    }
    .insert(db)
    .await?;

    Ok(ProviderServiceView {
        effective_price: effective_price(offer.custom_price, service.base_price),
        service_name: service.name,
        pricing_type: service.pricing_type,
        offer,
    })
}

/// Offerings of one provider
pub async fn list_provider_services(
    db: &DatabaseConnection,
    provider_id: &str,
) -> Result<Vec<ProviderServiceView>, ServiceError> {
    let rows = ProviderService::find()
        .filter(provider_service::Column::ProviderId.eq(provider_id))
        .find_also_related(Service)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(offer, service)| {
            service.map(|s| ProviderServiceView {
                effective_price: effective_price(offer.custom_price, s.base_price),
                service_name: s.name,
                pricing_type: s.pricing_type,
                offer,
            })
        })
        .collect())
}
