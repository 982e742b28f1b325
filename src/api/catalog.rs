use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::{ApiJson, ApiQuery};
use crate::domain::account::Actor;
use crate::domain::{DomainError, NewCatalogService, NewCategory, ServiceFilter};
use crate::infrastructure::AppState;
use crate::services::catalog_service::{self, NewProviderService};
use crate::utils::PageParams;

#[derive(Deserialize)]
pub struct ServiceQuery {
    pub category_id: Option<String>,
    pub q: Option<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DomainError> {
    let categories = state.category_repo.find_all().await?;
    Ok(Json(json!({
        "categories": categories,
        "total": categories.len()
    })))
}

pub async fn list_root_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.category_repo.find_roots().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        catalog_service::get_category(state.category_repo.as_ref(), &id).await?,
    ))
}

pub async fn list_category_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        catalog_service::category_children(state.category_repo.as_ref(), &id).await?,
    ))
}

pub async fn create_category(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewCategory>,
) -> Result<impl IntoResponse, DomainError> {
    let category =
        catalog_service::create_category(state.category_repo.as_ref(), &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/services",
    params(
        ("category_id" = Option<String>, Query, description = "Filter by category"),
        ("q" = Option<String>, Query, description = "Text search on name and description"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("page_size" = Option<u64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Active catalog services")
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    let filter = ServiceFilter {
        category_id: query.category_id,
        query: query.q,
        page: Some(page.page()),
        limit: Some(page.page_size()),
    };
    let result = catalog_service::list_services(state.service_repo.as_ref(), filter).await?;

    Ok(Json(json!({
        "results": result.services,
        "count": result.total,
        "page": page.page(),
        "page_size": page.page_size()
    })))
}

pub async fn popular_services(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DomainError> {
    let services = catalog_service::popular_services(state.service_repo.as_ref()).await?;
    Ok(Json(json!({
        "total": services.len(),
        "services": services,
    })))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        catalog_service::get_service(state.service_repo.as_ref(), &id).await?,
    ))
}

pub async fn create_service(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewCatalogService>,
) -> Result<impl IntoResponse, DomainError> {
    let service = catalog_service::create_service(
        state.db(),
        state.service_repo.as_ref(),
        &actor,
        payload,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn create_provider_service(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewProviderService>,
) -> Result<impl IntoResponse, DomainError> {
    let offer = catalog_service::create_provider_service(state.db(), &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}
