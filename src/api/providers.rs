use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;

use crate::api::error::{ApiJson, ApiQuery};
use crate::domain::account::Actor;
use crate::domain::DomainError;
use crate::services::account_service::{self, ProviderSearch, UpdateProviderProfile};
use crate::services::{catalog_service, review_service};
use crate::utils::PageParams;

#[utoipa::path(
    get,
    path = "/api/v1/providers",
    params(
        ("is_available" = Option<bool>, Query, description = "Only available providers"),
        ("city" = Option<String>, Query, description = "City of the provider"),
        ("min_rating" = Option<f64>, Query, description = "Minimum average rating"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("page_size" = Option<u64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Providers, best rated first")
    )
)]
pub async fn search_providers(
    State(db): State<DatabaseConnection>,
    ApiQuery(search): ApiQuery<ProviderSearch>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(account_service::search_providers(&db, search, page).await?))
}

pub async fn get_provider(
    State(db): State<DatabaseConnection>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(account_service::get_provider(&db, &id).await?))
}

pub async fn update_my_provider_profile(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<UpdateProviderProfile>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        account_service::update_provider_profile(&db, &actor, payload).await?,
    ))
}

pub async fn list_provider_services(
    State(db): State<DatabaseConnection>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(catalog_service::list_provider_services(&db, &id).await?))
}

pub async fn provider_review_statistics(
    State(db): State<DatabaseConnection>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(review_service::statistics(&db, Some(&id)).await?))
}
