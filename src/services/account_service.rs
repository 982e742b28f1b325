//! Account Service - registration, login and profiles

use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::account::{full_name, normalize_email, validate_password, Actor, UserType};
use crate::domain::catalog;
use crate::domain::history::{ClientInfo, HistoryAction, Importance, LinkedObject};
use crate::infrastructure::auth::{
    create_access_token, create_refresh_token, decode_jwt, hash_password, verify_password,
    ACCESS_TOKEN_MINUTES, REFRESH,
};
use crate::models::client_profile::{self, Entity as ClientProfile};
use crate::models::provider_profile::{self, Entity as ProviderProfile};
use crate::models::user::{self, Entity as User, UserSummary};
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, Page, PageParams};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub user_type: UserType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Seconds
    pub expires_in: i64,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Editable provider fields; rating fields are not part of it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProviderProfile {
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub service_radius_km: Option<i32>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSearch {
    pub is_available: Option<bool>,
    pub city: Option<String>,
    pub min_rating: Option<f64>,
}

/// User with the profile matching their type
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub user: user::Model,
    pub full_name: String,
    pub client_profile: Option<client_profile::Model>,
    pub provider_profile: Option<provider_profile::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderCard {
    pub user: UserSummary,
    pub city: Option<String>,
    pub profile: provider_profile::Model,
}

pub async fn register(
    db: &DatabaseConnection,
    input: RegisterInput,
) -> Result<user::Model, ServiceError> {
    if !input.user_type.is_self_service() {
        return Err(ServiceError::invalid("this account type cannot be self-registered"));
    }
    create_user(db, input).await
}

/// Create a user of any type together with its profile.
pub async fn create_user(
    db: &DatabaseConnection,
    input: RegisterInput,
) -> Result<user::Model, ServiceError> {
    let email = normalize_email(&input.email)?;
    validate_password(&input.password)?;
    if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(ServiceError::invalid("first_name and last_name are required"));
    }

    let taken = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(ServiceError::invalid("an account with this email already exists"));
    }

    let password_hash = hash_password(&input.password)?;
    let now = now_rfc3339();

    let txn = db.begin().await?;

    let user = user::ActiveModel {
        id: Set(new_id()),
        email: Set(email),
        password_hash: Set(password_hash),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        phone: Set(input.phone),
        user_type: Set(input.user_type.to_string()),
        address: Set(input.address),
        city: Set(input.city),
        postal_code: Set(input.postal_code),
        latitude: Set(None),
        longitude: Set(None),
        is_verified: Set(false),
        is_active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
    }
    .insert(&txn)
    .await?;

    match input.user_type {
        UserType::Client => {
            client_profile::ActiveModel {
                id: Set(new_id()),
                user_id: Set(user.id.clone()),
                preferred_radius_km: Set(20),
                total_reservations: Set(0),
                total_spent: Set(0.0),
                created_at: Set(now.clone()),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        UserType::Provider => {
            provider_profile::ActiveModel {
                id: Set(new_id()),
                user_id: Set(user.id.clone()),
                company_name: Set(input.company_name),
                description: Set(None),
                hourly_rate: Set(None),
                service_radius_km: Set(20),
                is_available: Set(true),
                is_verified: Set(false),
                total_jobs: Set(0),
                average_rating: Set(0.0),
                total_reviews: Set(0),
                created_at: Set(now.clone()),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        UserType::Admin => {}
    }

    txn.commit().await?;

    tracing::info!("Registered {} account {}", user.user_type, user.id);
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Create, "Account created")
            .by(user.id.clone())
            .about(LinkedObject::User(user.id.clone()))
            .tags(&["account"]),
    )
    .await;

    Ok(user)
}

fn issue_tokens(user: &user::Model) -> Result<AuthTokens, ServiceError> {
    let role: UserType = user.user_type.parse()?;
    Ok(AuthTokens {
        access_token: create_access_token(&user.id, role)?,
        refresh_token: create_refresh_token(&user.id, role)?,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_MINUTES * 60,
        user: UserSummary::from(user),
    })
}

/// Check credentials and issue tokens; both outcomes are recorded with the client address.
pub async fn login(
    db: &DatabaseConnection,
    input: LoginInput,
    client: &ClientInfo,
) -> Result<AuthTokens, ServiceError> {
    let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());
    let email = normalize_email(&input.email).map_err(|_| invalid())?;

    let user = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active || !verify_password(&input.password, &user.password_hash)? {
        tracing::warn!("Failed login for {}", user.id);
        log_action(
            db,
            HistoryEntry::new(HistoryAction::Login, "Failed login")
                .by(user.id.clone())
                .about(LinkedObject::User(user.id.clone()))
                .importance(Importance::Security)
                .client(client)
                .tags(&["auth", "failure"]),
        )
        .await;
        return Err(invalid());
    }

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Login, "Login")
            .by(user.id.clone())
            .about(LinkedObject::User(user.id.clone()))
            .client(client)
            .tags(&["auth"]),
    )
    .await;

    issue_tokens(&user)
}

/// Trade a refresh token for a fresh token pair.
pub async fn refresh(
    db: &DatabaseConnection,
    refresh_token: &str,
) -> Result<AuthTokens, ServiceError> {
    let claims = decode_jwt(refresh_token)?;
    if claims.token_type != REFRESH {
        return Err(ServiceError::Unauthorized("A refresh token is required".to_string()));
    }

    let user = User::find_by_id(claims.sub)
        .one(db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ServiceError::Unauthorized("Unknown user".to_string()))?;

    issue_tokens(&user)
}

async fn find_user(db: &DatabaseConnection, id: &str) -> Result<user::Model, ServiceError> {
    User::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))
}

pub async fn account(db: &DatabaseConnection, user_id: &str) -> Result<AccountView, ServiceError> {
    let user = find_user(db, user_id).await?;
    let client_profile = ClientProfile::find()
        .filter(client_profile::Column::UserId.eq(user.id.as_str()))
        .one(db)
        .await?;
    let provider_profile = ProviderProfile::find()
        .filter(provider_profile::Column::UserId.eq(user.id.as_str()))
        .one(db)
        .await?;

    Ok(AccountView {
        full_name: full_name(&user.first_name, &user.last_name),
        user,
        client_profile,
        provider_profile,
    })
}

pub async fn me(db: &DatabaseConnection, actor: &Actor) -> Result<AccountView, ServiceError> {
    account(db, &actor.user_id).await
}

pub async fn change_password(
    db: &DatabaseConnection,
    actor: &Actor,
    old_password: &str,
    new_password: &str,
) -> Result<(), ServiceError> {
    let user = find_user(db, &actor.user_id).await?;
    if !verify_password(old_password, &user.password_hash)? {
        return Err(ServiceError::invalid("current password is incorrect"));
    }
    validate_password(new_password)?;

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(new_password)?);
    active.updated_at = Set(now_rfc3339());
    active.update(db).await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Update, "Password changed")
            .by(actor.user_id.clone())
            .about(LinkedObject::User(actor.user_id.clone()))
            .importance(Importance::Security)
            .tags(&["account", "password"]),
    )
    .await;

    Ok(())
}

pub async fn update_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    input: UpdateProfile,
) -> Result<user::Model, ServiceError> {
    let user = find_user(db, &actor.user_id).await?;
    let mut active: user::ActiveModel = user.into();

    if let Some(first_name) = input.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = input.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(phone) = input.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = input.address {
        active.address = Set(Some(address));
    }
    if let Some(city) = input.city {
        active.city = Set(Some(city));
    }
    if let Some(postal_code) = input.postal_code {
        active.postal_code = Set(Some(postal_code));
    }
    if let Some(latitude) = input.latitude {
        active.latitude = Set(Some(latitude));
    }
    if let Some(longitude) = input.longitude {
        active.longitude = Set(Some(longitude));
    }
    active.updated_at = Set(now_rfc3339());

    Ok(active.update(db).await?)
}

pub async fn update_provider_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    input: UpdateProviderProfile,
) -> Result<provider_profile::Model, ServiceError> {
    let profile = ProviderProfile::find()
        .filter(provider_profile::Column::UserId.eq(actor.user_id.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Provider profile"))?;

    let mut active: provider_profile::ActiveModel = profile.into();
    if let Some(company_name) = input.company_name {
        active.company_name = Set(Some(company_name));
    }
    if let Some(description) = input.description {
        active.description = Set(Some(description));
    }
    if let Some(rate) = input.hourly_rate {
        active.hourly_rate = Set(Some(catalog::validate_price(rate, "hourly_rate")?));
    }
    if let Some(radius) = input.service_radius_km {
        if radius < 0 {
            return Err(ServiceError::invalid("service_radius_km must not be negative"));
        }
        active.service_radius_km = Set(radius);
    }
    if let Some(available) = input.is_available {
        active.is_available = Set(available);
    }
    active.updated_at = Set(now_rfc3339());

    Ok(active.update(db).await?)
}

/// Providers ordered by average rating, best first
pub async fn search_providers(
    db: &DatabaseConnection,
    search: ProviderSearch,
    params: PageParams,
) -> Result<Page<ProviderCard>, ServiceError> {
    let mut condition = Condition::all();
    if let Some(available) = search.is_available {
        condition = condition.add(provider_profile::Column::IsAvailable.eq(available));
    }
    if let Some(min_rating) = search.min_rating {
        condition = condition.add(provider_profile::Column::AverageRating.gte(min_rating));
    }
    if let Some(city) = &search.city {
        condition = condition.add(user::Column::City.eq(city.as_str()));
    }

    let paginator = ProviderProfile::find()
        .find_also_related(User)
        .filter(condition)
        .order_by_desc(provider_profile::Column::AverageRating)
        .order_by_desc(provider_profile::Column::TotalReviews)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(params.index()).await?;

    let cards = rows
        .into_iter()
        .filter_map(|(profile, user)| {
            user.map(|u| ProviderCard {
                user: UserSummary::from(&u),
                city: u.city.clone(),
                profile,
            })
        })
        .collect();

    Ok(Page::new(cards, count, params))
}

pub async fn get_provider(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<ProviderCard, ServiceError> {
    let (profile, user) = ProviderProfile::find()
        .filter(provider_profile::Column::UserId.eq(user_id))
        .find_also_related(User)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Provider"))?;
    let user = user.ok_or_else(|| ServiceError::not_found("Provider"))?;

    Ok(ProviderCard {
        user: UserSummary::from(&user),
        city: user.city.clone(),
        profile,
    })
}
