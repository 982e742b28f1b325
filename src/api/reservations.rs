use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::{ApiJson, ApiQuery};
use crate::domain::account::Actor;
use crate::domain::reservation::{duration_display, ReservationStatus};
use crate::domain::DomainError;
use crate::services::reservation_service::{
    self, NewPhoto, NewReservation, ReservationFilter,
};
use crate::utils::PageParams;

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: ReservationStatus,
    pub reason: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("priority" = Option<String>, Query, description = "Filter by priority"),
        ("date_from" = Option<String>, Query, description = "Scheduled on or after (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Scheduled on or before (YYYY-MM-DD)"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("page_size" = Option<u64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Reservations visible to the caller"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_reservations(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<ReservationFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        reservation_service::list_reservations(&db, &actor, filter, page).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    responses(
        (status = 201, description = "Reservation created in 'pending'"),
        (status = 403, description = "Only clients can book")
    ),
    security(("bearer" = []))
)]
pub async fn create_reservation(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewReservation>,
) -> Result<impl IntoResponse, DomainError> {
    let reservation = reservation_service::create_reservation(&db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn get_reservation(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    let reservation = reservation_service::get_reservation(&db, &actor, &id).await?;
    let status: ReservationStatus = reservation.status.parse()?;

    Ok(Json(json!({
        "duration_display": duration_display(reservation.estimated_duration),
        "reservation": reservation,
        "is_active": status.is_active(),
        "is_terminal": status.is_terminal(),
        "can_be_cancelled": status.can_be_cancelled(),
        "next_statuses": status.next_statuses(),
    })))
}

pub async fn delete_reservation(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    reservation_service::delete_reservation(&db, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/transition",
    params(("id" = String, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation after the status change"),
        (status = 403, description = "Caller may not request this status"),
        (status = 409, description = "Status not reachable from the current one")
    ),
    security(("bearer" = []))
)]
pub async fn transition(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TransitionRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        reservation_service::transition(&db, &actor, &id, payload.status, payload.reason).await?,
    ))
}

async fn move_to(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    status: ReservationStatus,
) -> Result<Json<crate::models::reservation::Model>, DomainError> {
    Ok(Json(
        reservation_service::transition(db, actor, id, status, None).await?,
    ))
}

pub async fn confirm(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    move_to(&db, &actor, &id, ReservationStatus::Confirmed).await
}

pub async fn start(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    move_to(&db, &actor, &id, ReservationStatus::InProgress).await
}

pub async fn complete(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    move_to(&db, &actor, &id, ReservationStatus::Completed).await
}

pub async fn cancel(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    payload: Option<ApiJson<ReasonRequest>>,
) -> Result<impl IntoResponse, DomainError> {
    let reason = payload.and_then(|ApiJson(p)| p.reason);
    Ok(Json(
        reservation_service::cancel(&db, &actor, &id, reason).await?,
    ))
}

pub async fn status_history(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        reservation_service::status_history(&db, &actor, &id).await?,
    ))
}

pub async fn list_photos(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(reservation_service::list_photos(&db, &actor, &id).await?))
}

pub async fn add_photo(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NewPhoto>,
) -> Result<impl IntoResponse, DomainError> {
    let photo = reservation_service::add_photo(&db, &actor, &id, payload).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}
