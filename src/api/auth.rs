use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiJson;
use crate::domain::account::Actor;
use crate::domain::history::ClientInfo;
use crate::domain::DomainError;
use crate::models::UserSummary;
use crate::services::account_service::{self, LoginInput, RegisterInput, UpdateProfile};

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid input or email already used")
    )
)]
pub async fn register(
    State(db): State<DatabaseConnection>,
    ApiJson(payload): ApiJson<RegisterInput>,
) -> Result<impl IntoResponse, DomainError> {
    let user = account_service::register(&db, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully",
            "user": UserSummary::from(&user)
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    responses(
        (status = 200, description = "Access and refresh tokens"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    client: ClientInfo,
    ApiJson(payload): ApiJson<LoginInput>,
) -> Result<impl IntoResponse, DomainError> {
    tracing::info!("Login attempt for {}", payload.email);
    let tokens = account_service::login(&db, payload, &client).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(db): State<DatabaseConnection>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let tokens = account_service::refresh(&db, &payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account with its profile"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn get_me(
    State(db): State<DatabaseConnection>,
    actor: Actor,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(account_service::me(&db, &actor).await?))
}

pub async fn update_me(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<UpdateProfile>,
) -> Result<impl IntoResponse, DomainError> {
    account_service::update_profile(&db, &actor, payload).await?;
    Ok(Json(account_service::me(&db, &actor).await?))
}

pub async fn change_password(
    State(db): State<DatabaseConnection>,
    actor: Actor,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, DomainError> {
    account_service::change_password(&db, &actor, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
