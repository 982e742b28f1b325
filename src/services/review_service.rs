//! Review Service - reviews and the provider rating they feed
//!
//! The provider's `average_rating` / `total_reviews` pair is never edited
//! directly: every mutation that can change the set of visible
//! client -> provider reviews calls [`recompute_provider_rating`] inside the
//! same transaction.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::account::Actor;
use crate::domain::history::{HistoryAction, Importance, LinkedObject};
use crate::domain::messaging::NotificationType;
use crate::domain::reservation::ReservationStatus;
use crate::domain::review::{
    comment_preview, distribution, resolve_parties, summarize, validate_rating, RatingSummary,
    ReviewDirection,
};
use crate::models::provider_profile::{self, Entity as ProviderProfile};
use crate::models::review::{self, Entity as Review};
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::messaging_service::{notify, NewNotification};
use crate::services::reservation_service::{find_reservation, status_of};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, Page, PageParams};

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub reservation_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

/// Review as shown in lists, with a shortened comment
#[derive(Debug, Clone, Serialize)]
pub struct ReviewListItem {
    #[serde(flatten)]
    pub review: review::Model,
    pub comment_preview: String,
}

impl From<review::Model> for ReviewListItem {
    fn from(review: review::Model) -> Self {
        let comment_preview = comment_preview(&review.comment);
        Self {
            review,
            comment_preview,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Moderation {
    pub is_visible: bool,
    #[serde(default = "default_true")]
    pub is_moderated: bool,
    pub moderation_reason: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Filter parameters for listing reviews
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReviewFilter {
    pub recipient_id: Option<String>,
    pub author_id: Option<String>,
    pub reservation_id: Option<String>,
    pub rating: Option<i32>,
    pub direction: Option<ReviewDirection>,
}

/// Recompute and store the rating of a provider from its visible
/// client -> provider reviews. Running it twice on the same set of reviews
/// stores the same values.
pub async fn recompute_provider_rating<C: ConnectionTrait>(
    db: &C,
    provider_user_id: &str,
) -> Result<RatingSummary, ServiceError> {
    let ratings: Vec<i32> = Review::find()
        .filter(review::Column::RecipientId.eq(provider_user_id))
        .filter(review::Column::Direction.eq(ReviewDirection::ClientToProvider.as_str()))
        .filter(review::Column::IsVisible.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let summary = summarize(&ratings);

    ProviderProfile::update_many()
        .col_expr(
            provider_profile::Column::AverageRating,
            sea_orm::sea_query::Expr::value(summary.average_rating),
        )
        .col_expr(
            provider_profile::Column::TotalReviews,
            sea_orm::sea_query::Expr::value(summary.total_reviews),
        )
        .filter(provider_profile::Column::UserId.eq(provider_user_id))
        .exec(db)
        .await?;

    tracing::debug!(
        "Provider {} rating recomputed: {:.2} over {} review(s)",
        provider_user_id,
        summary.average_rating,
        summary.total_reviews
    );

    Ok(summary)
}

async fn recompute_if_needed<C: ConnectionTrait>(
    db: &C,
    review: &review::Model,
) -> Result<(), ServiceError> {
    if review.direction == ReviewDirection::ClientToProvider.as_str() {
        recompute_provider_rating(db, &review.recipient_id).await?;
    }
    Ok(())
}

async fn find_review<C: ConnectionTrait>(db: &C, id: &str) -> Result<review::Model, ServiceError> {
    Review::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Review"))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    )
}

/// Submit a review for a completed reservation.
pub async fn submit_review(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewReview,
) -> Result<review::Model, ServiceError> {
    validate_rating(input.rating)?;

    let reservation = find_reservation(db, &input.reservation_id).await?;
    let parties = resolve_parties(
        &actor.user_id,
        &reservation.client_id,
        &reservation.provider_id,
    )?;

    if status_of(&reservation)? != ReservationStatus::Completed {
        return Err(ServiceError::invalid(
            "only completed reservations can be reviewed",
        ));
    }

    let existing = Review::find()
        .filter(review::Column::ReservationId.eq(reservation.id.as_str()))
        .filter(review::Column::AuthorId.eq(actor.user_id.as_str()))
        .filter(review::Column::Direction.eq(parties.direction.as_str()))
        .count(db)
        .await?;
    if existing > 0 {
        tracing::warn!(
            "Duplicate review by {} on reservation {}",
            actor.user_id,
            reservation.id
        );
        return Err(ServiceError::DuplicateReview);
    }

    let now = now_rfc3339();
    let txn = db.begin().await?;

    let inserted = review::ActiveModel {
        id: Set(new_id()),
        reservation_id: Set(reservation.id.clone()),
        author_id: Set(actor.user_id.clone()),
        recipient_id: Set(parties.recipient_id.clone()),
        direction: Set(parties.direction.to_string()),
        rating: Set(input.rating),
        comment: Set(input.comment.trim().to_string()),
        is_visible: Set(true),
        is_moderated: Set(false),
        moderation_reason: Set(None),
        response: Set(None),
        response_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await;

    let review = match inserted {
        Ok(review) => review,
        // Lost a race against a concurrent submission
        Err(e) if is_unique_violation(&e) => {
            txn.rollback().await?;
            return Err(ServiceError::DuplicateReview);
        }
        Err(e) => return Err(e.into()),
    };

    recompute_if_needed(&txn, &review).await?;
    txn.commit().await?;

    tracing::info!(
        "Review {} ({}) submitted on reservation {}",
        review.id,
        review.direction,
        review.reservation_id
    );

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Review, "Review submitted")
            .by(actor.user_id.clone())
            .about(LinkedObject::Review(review.id.clone()))
            .context(json!({ "rating": review.rating, "direction": review.direction }))
            .tags(&["review"]),
    )
    .await;

    notify(
        db,
        NewNotification::new(
            &review.recipient_id,
            NotificationType::Review,
            "New review",
            format!("You received a {}-star review", review.rating),
        )
        .about(LinkedObject::Review(review.id.clone()))
        .link(format!("/reviews/{}", review.id)),
    )
    .await;

    Ok(review)
}

/// Author edits rating and/or comment
pub async fn update_review(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    input: UpdateReview,
) -> Result<review::Model, ServiceError> {
    let review = find_review(db, id).await?;
    if review.author_id != actor.user_id {
        return Err(ServiceError::forbidden("only the author can edit a review"));
    }
    if let Some(rating) = input.rating {
        validate_rating(rating)?;
    }

    let txn = db.begin().await?;

    let mut active: review::ActiveModel = review.into();
    if let Some(rating) = input.rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = input.comment {
        active.comment = Set(comment.trim().to_string());
    }
    active.updated_at = Set(now_rfc3339());
    let updated = active.update(&txn).await?;

    recompute_if_needed(&txn, &updated).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Author or admin; the provider rating is recomputed without it.
pub async fn delete_review(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<(), ServiceError> {
    let review = find_review(db, id).await?;
    if !actor.is_or_admin(&review.author_id) {
        return Err(ServiceError::forbidden(
            "only the author or an administrator can delete a review",
        ));
    }

    let txn = db.begin().await?;
    Review::delete_by_id(review.id.clone()).exec(&txn).await?;
    recompute_if_needed(&txn, &review).await?;
    txn.commit().await?;

    tracing::info!("Review {} deleted by {}", review.id, actor.user_id);
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Delete, "Review deleted")
            .by(actor.user_id.clone())
            .about(LinkedObject::Review(review.id.clone()))
            .change(Some(json!({ "rating": review.rating })), None)
            .tags(&["review"]),
    )
    .await;

    Ok(())
}

/// Admin visibility / moderation flags
pub async fn moderate_review(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    moderation: Moderation,
) -> Result<review::Model, ServiceError> {
    actor.require_admin()?;

    let txn = db.begin().await?;
    let review = find_review(&txn, id).await?;
    let was_visible = review.is_visible;

    let mut active: review::ActiveModel = review.into();
    active.is_visible = Set(moderation.is_visible);
    active.is_moderated = Set(moderation.is_moderated);
    active.moderation_reason = Set(moderation.moderation_reason.clone());
    active.updated_at = Set(now_rfc3339());
    let updated = active.update(&txn).await?;

    if was_visible != updated.is_visible {
        recompute_if_needed(&txn, &updated).await?;
    }
    txn.commit().await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Validation, "Review moderated")
            .by(actor.user_id.clone())
            .about(LinkedObject::Review(updated.id.clone()))
            .importance(Importance::Warning)
            .change(
                Some(json!({ "is_visible": was_visible })),
                Some(json!({
                    "is_visible": updated.is_visible,
                    "reason": moderation.moderation_reason,
                })),
            )
            .tags(&["review", "moderation"]),
    )
    .await;

    Ok(updated)
}

/// The recipient answers a review, once.
pub async fn respond(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    response: String,
) -> Result<review::Model, ServiceError> {
    let review = find_review(db, id).await?;
    if review.recipient_id != actor.user_id {
        return Err(ServiceError::forbidden("only the reviewed user can respond"));
    }
    if review.response.is_some() {
        return Err(ServiceError::invalid("this review already has a response"));
    }
    let response = response.trim().to_string();
    if response.is_empty() {
        return Err(ServiceError::invalid("response is required"));
    }

    let now = now_rfc3339();
    let mut active: review::ActiveModel = review.into();
    active.response = Set(Some(response));
    active.response_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

pub async fn get_review(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<review::Model, ServiceError> {
    let review = find_review(db, id).await?;
    let own = review.author_id == actor.user_id || review.recipient_id == actor.user_id;
    if !review.is_visible && !own && !actor.is_admin() {
        return Err(ServiceError::not_found("Review"));
    }
    Ok(review)
}

/// Visible reviews plus the actor's own (all reviews for admins)
pub async fn list_reviews(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: ReviewFilter,
    params: PageParams,
) -> Result<Page<ReviewListItem>, ServiceError> {
    let mut condition = Condition::all();

    if !actor.is_admin() {
        condition = condition.add(
            Condition::any()
                .add(review::Column::IsVisible.eq(true))
                .add(review::Column::AuthorId.eq(actor.user_id.as_str()))
                .add(review::Column::RecipientId.eq(actor.user_id.as_str())),
        );
    }
    if let Some(recipient_id) = &filter.recipient_id {
        condition = condition.add(review::Column::RecipientId.eq(recipient_id.as_str()));
    }
    if let Some(author_id) = &filter.author_id {
        condition = condition.add(review::Column::AuthorId.eq(author_id.as_str()));
    }
    if let Some(reservation_id) = &filter.reservation_id {
        condition = condition.add(review::Column::ReservationId.eq(reservation_id.as_str()));
    }
    if let Some(rating) = filter.rating {
        validate_rating(rating)?;
        condition = condition.add(review::Column::Rating.eq(rating));
    }
    if let Some(direction) = filter.direction {
        condition = condition.add(review::Column::Direction.eq(direction.as_str()));
    }

    let paginator = Review::find()
        .filter(condition)
        .order_by_desc(review::Column::CreatedAt)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(results, count, params).map(ReviewListItem::from))
}

pub async fn my_given_reviews(
    db: &DatabaseConnection,
    actor: &Actor,
    params: PageParams,
) -> Result<Page<ReviewListItem>, ServiceError> {
    let filter = ReviewFilter {
        author_id: Some(actor.user_id.clone()),
        ..Default::default()
    };
    list_reviews(db, actor, filter, params).await
}

pub async fn my_received_reviews(
    db: &DatabaseConnection,
    actor: &Actor,
    params: PageParams,
) -> Result<Page<ReviewListItem>, ServiceError> {
    let filter = ReviewFilter {
        recipient_id: Some(actor.user_id.clone()),
        ..Default::default()
    };
    list_reviews(db, actor, filter, params).await
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingDistribution {
    #[serde(rename = "1")]
    pub one: u64,
    #[serde(rename = "2")]
    pub two: u64,
    #[serde(rename = "3")]
    pub three: u64,
    #[serde(rename = "4")]
    pub four: u64,
    #[serde(rename = "5")]
    pub five: u64,
}

impl From<[u64; 5]> for RatingDistribution {
    fn from(b: [u64; 5]) -> Self {
        Self {
            one: b[0],
            two: b[1],
            three: b[2],
            four: b[3],
            five: b[4],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewStatistics {
    pub total_reviews: i32,
    pub average_rating: f64,
    pub distribution: RatingDistribution,
    pub with_response: u64,
}

/// Statistics over visible reviews, optionally for one recipient
pub async fn statistics(
    db: &DatabaseConnection,
    recipient_id: Option<&str>,
) -> Result<ReviewStatistics, ServiceError> {
    let mut query = Review::find().filter(review::Column::IsVisible.eq(true));
    if let Some(recipient_id) = recipient_id {
        query = query.filter(review::Column::RecipientId.eq(recipient_id));
    }
    let reviews = query.all(db).await?;

    let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
    let summary = summarize(&ratings);

    Ok(ReviewStatistics {
        total_reviews: summary.total_reviews,
        average_rating: summary.average_rating,
        distribution: distribution(&ratings).into(),
        with_response: reviews.iter().filter(|r| r.response.is_some()).count() as u64,
    })
}
