use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::api::error::{ApiJson, ApiQuery};
use crate::domain::account::Actor;
use crate::domain::billing::PaymentStatus;
use crate::domain::DomainError;
use crate::services::billing_service::{self, NewPayment, PaymentFilter};
use crate::utils::PageParams;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: PaymentStatus,
}

pub async fn list_payments(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<PaymentFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::list_payments(&db, &actor, filter, page).await?,
    ))
}

pub async fn create_payment(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewPayment>,
) -> Result<impl IntoResponse, DomainError> {
    let payment = billing_service::create_payment(&db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn payment_statistics(
    State(db): State<DatabaseConnection>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(billing_service::payment_statistics(&db, &actor).await?))
}

pub async fn get_payment(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(billing_service::get_payment(&db, &actor, &id).await?))
}

pub async fn update_payment_status(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::update_payment_status(&db, &actor, &id, payload.status).await?,
    ))
}
