//! Reservation Service - booking and the status state machine

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::domain::account::{Actor, UserType};
use crate::domain::catalog;
use crate::domain::history::{HistoryAction, Importance, LinkedObject};
use crate::domain::messaging::NotificationType;
use crate::domain::reservation::{
    check_transition, party_for, LifecycleStamp, Party, PhotoType, Priority, ReservationStatus,
};
use crate::models::client_profile::{self, Entity as ClientProfile};
use crate::models::provider_profile::{self, Entity as ProviderProfile};
use crate::models::provider_service::Entity as ProviderService;
use crate::models::reservation::{self, Entity as Reservation};
use crate::models::reservation_photo::{self, Entity as ReservationPhoto};
use crate::models::reservation_status_history::{self, Entity as StatusHistory};
use crate::models::service::{self, Entity as Service};
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::messaging_service::{notify, NewNotification};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, time, Page, PageParams};

/// Input for booking a provider service
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub provider_service_id: String,
    /// RFC 3339 timestamp
    pub scheduled_at: String,
    /// Hours, defaults to the catalog estimate or 1
    pub estimated_duration: Option<f64>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub priority: Option<Priority>,
    pub estimated_price: Option<f64>,
}

/// Filter parameters for listing reservations
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub priority: Option<Priority>,
    /// `YYYY-MM-DD`, inclusive
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPhoto {
    pub image_path: String,
    pub photo_type: Option<PhotoType>,
    pub description: Option<String>,
}

pub(crate) fn is_party(actor: &Actor, reservation: &reservation::Model) -> bool {
    actor.user_id == reservation.client_id || actor.user_id == reservation.provider_id
}

pub(crate) fn status_of(reservation: &reservation::Model) -> Result<ReservationStatus, ServiceError> {
    reservation.status.parse()
}

pub(crate) async fn find_reservation<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<reservation::Model, ServiceError> {
    Reservation::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Reservation"))
}

/// Reservation visible to the actor (a party or an admin)
pub async fn get_reservation(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<reservation::Model, ServiceError> {
    let reservation = find_reservation(db, id).await?;
    if !actor.is_admin() && !is_party(actor, &reservation) {
        return Err(ServiceError::forbidden("not a party to this reservation"));
    }
    Ok(reservation)
}

/// Book a provider service. Only clients can book.
pub async fn create_reservation(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewReservation,
) -> Result<reservation::Model, ServiceError> {
    if actor.role != UserType::Client {
        return Err(ServiceError::forbidden("only clients can create reservations"));
    }

    let scheduled_at = time::normalize_timestamp(&input.scheduled_at)?;
    if input.address.trim().is_empty() {
        return Err(ServiceError::invalid("address is required"));
    }
    if input.description.trim().is_empty() {
        return Err(ServiceError::invalid("description is required"));
    }

    let (offer, service) = ProviderService::find_by_id(input.provider_service_id.clone())
        .find_also_related(Service)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Provider service"))?;
    let service = service.ok_or_else(|| ServiceError::not_found("Service"))?;

    if !offer.is_available || !service.is_active {
        return Err(ServiceError::invalid("this service is not available"));
    }
    if offer.provider_id == actor.user_id {
        return Err(ServiceError::invalid("you cannot book your own service"));
    }

    let estimated_price = match input.estimated_price {
        Some(price) => catalog::validate_price(price, "estimated_price")?,
        None => catalog::effective_price(offer.custom_price, service.base_price),
    };
    let estimated_duration = input
        .estimated_duration
        .or(service.estimated_duration)
        .unwrap_or(1.0);
    if estimated_duration <= 0.0 {
        return Err(ServiceError::invalid("estimated_duration must be positive"));
    }

    let now = now_rfc3339();
    let status = ReservationStatus::Pending;

    let txn = db.begin().await?;

    let reservation = reservation::ActiveModel {
        id: Set(new_id()),
        client_id: Set(actor.user_id.clone()),
        provider_id: Set(offer.provider_id.clone()),
        provider_service_id: Set(offer.id.clone()),
        scheduled_at: Set(scheduled_at),
        estimated_duration: Set(estimated_duration),
        address: Set(input.address),
        latitude: Set(input.latitude),
        longitude: Set(input.longitude),
        description: Set(input.description),
        estimated_price: Set(Some(estimated_price)),
        final_price: Set(None),
        status: Set(status.to_string()),
        priority: Set(input.priority.unwrap_or(Priority::Medium).to_string()),
        confirmed_at: Set(None),
        started_at: Set(None),
        completed_at: Set(None),
        cancelled_at: Set(None),
        cancelled_by: Set(None),
        cancellation_reason: Set(None),
        internal_notes: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
    }
    .insert(&txn)
    .await?;

    reservation_status_history::ActiveModel {
        reservation_id: Set(reservation.id.clone()),
        old_status: Set(None),
        new_status: Set(status.to_string()),
        changed_by: Set(Some(actor.user_id.clone())),
        reason: Set(Some("Reservation created".to_string())),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    ClientProfile::update_many()
        .col_expr(
            client_profile::Column::TotalReservations,
            Expr::col(client_profile::Column::TotalReservations).add(1),
        )
        .filter(client_profile::Column::UserId.eq(actor.user_id.as_str()))
        .exec(&txn)
        .await?;

    Service::update_many()
        .col_expr(
            service::Column::PopularityScore,
            Expr::col(service::Column::PopularityScore).add(1),
        )
        .filter(service::Column::Id.eq(service.id.as_str()))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        "Reservation {} created by client {} for provider {}",
        reservation.id,
        reservation.client_id,
        reservation.provider_id
    );

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Reservation, "Reservation created")
            .by(actor.user_id.clone())
            .about(LinkedObject::Reservation(reservation.id.clone()))
            .context(json!({ "provider_service_id": reservation.provider_service_id }))
            .tags(&["reservation", "create"]),
    )
    .await;

    notify(
        db,
        NewNotification::new(
            &reservation.provider_id,
            NotificationType::Reservation,
            "New reservation request",
            format!("A client booked your service for {}", reservation.scheduled_at),
        )
        .about(LinkedObject::Reservation(reservation.id.clone())),
    )
    .await;

    Ok(reservation)
}

fn check_party(
    actor: &Actor,
    reservation: &reservation::Model,
    status: ReservationStatus,
) -> Result<(), ServiceError> {
    if actor.is_admin() {
        return Ok(());
    }
    let allowed = match party_for(status) {
        Some(Party::Client) => actor.user_id == reservation.client_id,
        Some(Party::Provider) => actor.user_id == reservation.provider_id,
        None => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!(
            "you are not allowed to set this reservation to '{}'",
            status
        )))
    }
}

/// Move a reservation along the state machine.
///
/// The status change, its lifecycle timestamp, the history row and the
/// counters touched by completion are written in one transaction. An illegal
/// edge leaves the stored reservation untouched.
pub async fn transition(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    new_status: ReservationStatus,
    reason: Option<String>,
) -> Result<reservation::Model, ServiceError> {
    let current = find_reservation(db, id).await?;
    if !actor.is_admin() && !is_party(actor, &current) {
        return Err(ServiceError::forbidden("not a party to this reservation"));
    }

    let old_status = status_of(&current)?;
    let stamp = match check_transition(old_status, new_status) {
        Ok(stamp) => stamp,
        Err(e) => {
            tracing::warn!(
                "Rejected transition of reservation {}: {} -> {}",
                id,
                old_status,
                new_status
            );
            return Err(e);
        }
    };
    check_party(actor, &current, new_status)?;

    let now = now_rfc3339();
    let mut changes = reservation::ActiveModel {
        status: Set(new_status.to_string()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };
    match stamp {
        Some(LifecycleStamp::ConfirmedAt) => changes.confirmed_at = Set(Some(now.clone())),
        Some(LifecycleStamp::StartedAt) => changes.started_at = Set(Some(now.clone())),
        Some(LifecycleStamp::CompletedAt) => changes.completed_at = Set(Some(now.clone())),
        Some(LifecycleStamp::CancelledAt) => {
            changes.cancelled_at = Set(Some(now.clone()));
            changes.cancelled_by = Set(Some(actor.user_id.clone()));
            changes.cancellation_reason = Set(reason.clone());
        }
        None => {}
    }

    let final_price = current.final_price.or(current.estimated_price).unwrap_or(0.0);
    if new_status == ReservationStatus::Completed {
        changes.final_price = Set(Some(final_price));
    }

    let txn = db.begin().await?;

    // Guarded on the status we validated against
    let result = Reservation::update_many()
        .set(changes)
        .filter(reservation::Column::Id.eq(id))
        .filter(reservation::Column::Status.eq(old_status.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(ServiceError::InvalidTransition {
            from: old_status.to_string(),
            to: new_status.to_string(),
        });
    }

    reservation_status_history::ActiveModel {
        reservation_id: Set(current.id.clone()),
        old_status: Set(Some(old_status.to_string())),
        new_status: Set(new_status.to_string()),
        changed_by: Set(Some(actor.user_id.clone())),
        reason: Set(reason.clone()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if new_status == ReservationStatus::Completed {
        ProviderProfile::update_many()
            .col_expr(
                provider_profile::Column::TotalJobs,
                Expr::col(provider_profile::Column::TotalJobs).add(1),
            )
            .filter(provider_profile::Column::UserId.eq(current.provider_id.as_str()))
            .exec(&txn)
            .await?;

        ClientProfile::update_many()
            .col_expr(
                client_profile::Column::TotalSpent,
                Expr::col(client_profile::Column::TotalSpent).add(final_price),
            )
            .filter(client_profile::Column::UserId.eq(current.client_id.as_str()))
            .exec(&txn)
            .await?;
    }

    let updated = find_reservation(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(
        "Reservation {} moved {} -> {} by {}",
        id,
        old_status,
        new_status,
        actor.user_id
    );

    let action = if new_status.is_cancellation() {
        HistoryAction::Cancellation
    } else {
        HistoryAction::Update
    };
    log_action(
        db,
        HistoryEntry::new(action, format!("Reservation status {} -> {}", old_status, new_status))
            .by(actor.user_id.clone())
            .about(LinkedObject::Reservation(updated.id.clone()))
            .importance(if new_status.is_cancellation() {
                Importance::Warning
            } else {
                Importance::Info
            })
            .change(
                Some(json!({ "status": old_status })),
                Some(json!({ "status": new_status, "reason": reason })),
            )
            .tags(&["reservation", "status"]),
    )
    .await;

    let recipient = if actor.user_id == updated.client_id {
        &updated.provider_id
    } else {
        &updated.client_id
    };
    notify(
        db,
        NewNotification::new(
            recipient,
            NotificationType::Reservation,
            "Reservation updated",
            format!("Reservation status changed to {}", new_status),
        )
        .about(LinkedObject::Reservation(updated.id.clone())),
    )
    .await;

    Ok(updated)
}

/// Cancel on behalf of whichever side the actor is on.
pub async fn cancel(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    reason: Option<String>,
) -> Result<reservation::Model, ServiceError> {
    let reservation = find_reservation(db, id).await?;
    let status = if actor.user_id == reservation.provider_id {
        ReservationStatus::CancelledByProvider
    } else {
        ReservationStatus::Cancelled
    };
    transition(db, actor, id, status, reason).await
}

/// Reservations of the actor: bookings for clients, jobs for providers, all for admins
pub async fn list_reservations(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: ReservationFilter,
    params: PageParams,
) -> Result<Page<reservation::Model>, ServiceError> {
    let mut condition = Condition::all();

    match actor.role {
        UserType::Client => {
            condition = condition.add(reservation::Column::ClientId.eq(actor.user_id.as_str()))
        }
        UserType::Provider => {
            condition = condition.add(reservation::Column::ProviderId.eq(actor.user_id.as_str()))
        }
        UserType::Admin => {}
    }

    if let Some(status) = filter.status {
        condition = condition.add(reservation::Column::Status.eq(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        condition = condition.add(reservation::Column::Priority.eq(priority.as_str()));
    }
    if let Some(from) = &filter.date_from {
        let from = time::parse_date(from)?;
        condition = condition.add(
            reservation::Column::ScheduledAt.gte(from.format("%Y-%m-%d").to_string()),
        );
    }
    if let Some(to) = &filter.date_to {
        let end = time::parse_date(to)? + chrono::Duration::days(1);
        condition = condition
            .add(reservation::Column::ScheduledAt.lt(end.format("%Y-%m-%d").to_string()));
    }

    let paginator = Reservation::find()
        .filter(condition)
        .order_by_desc(reservation::Column::ScheduledAt)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(results, count, params))
}

/// Status log of a reservation, oldest first
pub async fn status_history(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<Vec<reservation_status_history::Model>, ServiceError> {
    let reservation = get_reservation(db, actor, id).await?;

    Ok(StatusHistory::find()
        .filter(reservation_status_history::Column::ReservationId.eq(reservation.id))
        .order_by_asc(reservation_status_history::Column::Id)
        .all(db)
        .await?)
}

/// Attach a photo reference (no file upload)
pub async fn add_photo(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    input: NewPhoto,
) -> Result<reservation_photo::Model, ServiceError> {
    let reservation = get_reservation(db, actor, id).await?;
    if input.image_path.trim().is_empty() {
        return Err(ServiceError::invalid("image_path is required"));
    }

    let photo = reservation_photo::ActiveModel {
        id: Set(new_id()),
        reservation_id: Set(reservation.id),
        image_path: Set(input.image_path),
        photo_type: Set(input.photo_type.unwrap_or(PhotoType::Other).to_string()),
        description: Set(input.description),
        uploaded_by: Set(actor.user_id.clone()),
        created_at: Set(now_rfc3339()),
    }
    .insert(db)
    .await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Upload, "Photo added to reservation")
            .by(actor.user_id.clone())
            .about(LinkedObject::Reservation(photo.reservation_id.clone()))
            .tags(&["reservation", "photo"]),
    )
    .await;

    Ok(photo)
}

pub async fn list_photos(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<Vec<reservation_photo::Model>, ServiceError> {
    let reservation = get_reservation(db, actor, id).await?;

    Ok(ReservationPhoto::find()
        .filter(reservation_photo::Column::ReservationId.eq(reservation.id))
        .order_by_asc(reservation_photo::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Administrative deletion; photos, history, reviews, payments, invoice and
/// messages go with it.
pub async fn delete_reservation(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<(), ServiceError> {
    actor.require_admin()?;

    let result = Reservation::delete_by_id(id.to_owned()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::not_found("Reservation"));
    }

    tracing::info!("Reservation {} deleted by admin {}", id, actor.user_id);
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Delete, "Reservation deleted")
            .by(actor.user_id.clone())
            .about(LinkedObject::Reservation(id.to_string()))
            .importance(Importance::Critical),
    )
    .await;

    Ok(())
}
