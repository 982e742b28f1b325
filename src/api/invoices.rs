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
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::services::billing_service::{self, InvoiceFilter, NewInvoice, UpdateInvoice};
use crate::utils::PageParams;

#[derive(Deserialize, Default)]
pub struct PayRequest {
    pub payment_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AttachPaymentRequest {
    pub payment_id: String,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::list_invoices(state.db(), &actor, filter, page).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    responses(
        (status = 201, description = "Invoice numbered FAC-YYYY-NNNNN with the VAT split"),
        (status = 400, description = "Reservation already invoiced or invalid amounts"),
        (status = 403, description = "Only the provider of the reservation or an admin")
    ),
    security(("bearer" = []))
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewInvoice>,
) -> Result<impl IntoResponse, DomainError> {
    let invoice =
        billing_service::issue_invoice(state.db(), &actor, payload, state.default_tax_rate).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn overdue_invoices(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    let invoices = billing_service::overdue_invoices(state.db(), &actor).await?;
    Ok(Json(json!({
        "invoices": invoices,
        "total": invoices.len()
    })))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(billing_service::get_invoice(state.db(), &actor, &id).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateInvoice>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::update_invoice(state.db(), &actor, &id, payload).await?,
    ))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(billing_service::mark_sent(state.db(), &actor, &id).await?))
}

pub async fn pay_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    payload: Option<ApiJson<PayRequest>>,
) -> Result<impl IntoResponse, DomainError> {
    let payment_id = payload.and_then(|ApiJson(p)| p.payment_id);
    Ok(Json(
        billing_service::mark_paid(state.db(), &actor, &id, payment_id).await?,
    ))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::cancel_invoice(state.db(), &actor, &id).await?,
    ))
}

pub async fn attach_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<AttachPaymentRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        billing_service::attach_payment(state.db(), &actor, &id, &payload.payment_id).await?,
    ))
}
