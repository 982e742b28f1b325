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
use crate::domain::DomainError;
use crate::services::review_service::{self, Moderation, NewReview, ReviewFilter, UpdateReview};
use crate::utils::PageParams;

#[derive(Deserialize)]
pub struct ResponseRequest {
    pub response: String,
}

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub recipient_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(
        ("recipient_id" = Option<String>, Query, description = "Reviews received by this user"),
        ("author_id" = Option<String>, Query, description = "Reviews written by this user"),
        ("reservation_id" = Option<String>, Query, description = "Reviews of one reservation"),
        ("rating" = Option<i32>, Query, description = "Exact rating"),
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("page_size" = Option<u64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Visible reviews, newest first")
    ),
    security(("bearer" = []))
)]
pub async fn list_reviews(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<ReviewFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::list_reviews(&db, &actor, filter, page).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    responses(
        (status = 201, description = "Review stored and provider rating refreshed"),
        (status = 400, description = "Rating out of range, self review or reservation not completed"),
        (status = 403, description = "Caller is not a party of the reservation"),
        (status = 409, description = "Reservation already reviewed by the caller")
    ),
    security(("bearer" = []))
)]
pub async fn create_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewReview>,
) -> Result<impl IntoResponse, DomainError> {
    let review = review_service::submit_review(&db, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn my_given_reviews(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(review_service::my_given_reviews(&db, &actor, page).await?))
}

pub async fn my_received_reviews(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::my_received_reviews(&db, &actor, page).await?,
    ))
}

pub async fn review_statistics(
    State(db): State<DatabaseConnection>,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::statistics(&db, query.recipient_id.as_deref()).await?,
    ))
}

pub async fn get_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(review_service::get_review(&db, &actor, &id).await?))
}

pub async fn update_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateReview>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::update_review(&db, &actor, &id, payload).await?,
    ))
}

pub async fn delete_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    review_service::delete_review(&db, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn moderate_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Moderation>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::moderate_review(&db, &actor, &id, payload).await?,
    ))
}

pub async fn respond_to_review(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ResponseRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        review_service::respond(&db, &actor, &id, payload.response).await?,
    ))
}
