use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::api::error::{ApiJson, ApiQuery};
use crate::domain::account::Actor;
use crate::domain::DomainError;
use crate::services::messaging_service::{self, NewMessage};
use crate::utils::PageParams;

pub async fn send_message(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewMessage>,
) -> Result<impl IntoResponse, DomainError> {
    let message = messaging_service::send_message(&db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(db): State<DatabaseConnection>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(messaging_service::list_conversations(&db, &actor).await?))
}

pub async fn conversation_messages(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        messaging_service::conversation_messages(&db, &actor, &conversation_id).await?,
    ))
}

pub async fn mark_message_read(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(messaging_service::mark_read(&db, &actor, &id).await?))
}

pub async fn archive_message(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(messaging_service::archive(&db, &actor, &id).await?))
}

pub async fn list_notifications(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        messaging_service::list_notifications(&db, &actor, page).await?,
    ))
}

pub async fn unread_count(
    State(db): State<DatabaseConnection>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    let count = messaging_service::unread_count(&db, &actor).await?;
    Ok(Json(json!({ "unread": count })))
}

pub async fn mark_notification_read(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        messaging_service::mark_notification_read(&db, &actor, &id).await?,
    ))
}
