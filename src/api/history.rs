use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;

use crate::api::error::ApiQuery;
use crate::domain::account::Actor;
use crate::domain::history::LinkedObject;
use crate::domain::DomainError;
use crate::services::history_service::{self, HistoryFilter};
use crate::utils::PageParams;

#[utoipa::path(
    get,
    path = "/api/v1/history",
    params(
        ("action" = Option<String>, Query, description = "Action type"),
        ("user_id" = Option<String>, Query, description = "Acting user"),
        ("importance" = Option<String>, Query, description = "info, warning, critical or security"),
        ("date_from" = Option<String>, Query, description = "YYYY-MM-DD, inclusive"),
        ("date_to" = Option<String>, Query, description = "YYYY-MM-DD, inclusive"),
        ("tag" = Option<String>, Query, description = "Tag contained in the entry"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("page_size" = Option<u64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Audit trail, newest first"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer" = []))
)]
pub async fn list_history(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<HistoryFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        history_service::list_history(&db, &actor, filter, page).await?,
    ))
}

pub async fn history_statistics(
    State(db): State<DatabaseConnection>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(history_service::statistics(&db, &actor).await?))
}

pub async fn export_history(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<HistoryFilter>,
) -> Result<impl IntoResponse, DomainError> {
    let csv = history_service::export_csv(&db, &actor, filter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"history.csv\"",
            ),
        ],
        csv,
    ))
}

pub async fn object_history(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path((object_type, object_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, DomainError> {
    let object = LinkedObject::from_parts(Some(&object_type), Some(&object_id))?
        .ok_or_else(|| DomainError::invalid("object type and id are required"))?;
    Ok(Json(
        history_service::history_for_object(&db, &actor, &object).await?,
    ))
}
