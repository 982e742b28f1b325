mod common;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tabali::domain::account::UserType;
use tabali::domain::DomainError;
use tabali::models::provider_profile;
use tabali::services::review_service::{self, Moderation, NewReview, UpdateReview};

use common::{book, completed_reservation, setup};

async fn provider_rating(db: &DatabaseConnection, provider_id: &str) -> (f64, i32) {
    let profile = provider_profile::Entity::find()
        .filter(provider_profile::Column::UserId.eq(provider_id))
        .one(db)
        .await
        .unwrap()
        .unwrap();
    (profile.average_rating, profile.total_reviews)
}

fn review(reservation_id: &str, rating: i32) -> NewReview {
    NewReview {
        reservation_id: reservation_id.to_string(),
        rating,
        comment: "Punctual and careful".to_string(),
    }
}

#[tokio::test]
async fn client_reviews_update_the_provider_average() {
    let fx = setup().await;
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (0.0, 0));

    let first = completed_reservation(&fx).await;
    let r = review_service::submit_review(&fx.db, &fx.client, review(&first.id, 4))
        .await
        .unwrap();
    assert_eq!(r.direction, "client_provider");
    assert_eq!(r.recipient_id, fx.provider.user_id);
    assert!(r.is_visible);
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (4.0, 1));

    let second = completed_reservation(&fx).await;
    review_service::submit_review(&fx.db, &fx.client, review(&second.id, 2))
        .await
        .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (3.0, 2));
}

#[tokio::test]
async fn provider_reviews_of_clients_do_not_count() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;

    let given = review_service::submit_review(&fx.db, &fx.provider, review(&r.id, 1))
        .await
        .unwrap();
    assert_eq!(given.direction, "provider_client");
    assert_eq!(given.recipient_id, fx.client.user_id);
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (0.0, 0));

    // The other direction on the same reservation is still allowed
    review_service::submit_review(&fx.db, &fx.client, review(&r.id, 5))
        .await
        .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (5.0, 1));
}

#[tokio::test]
async fn second_review_of_the_same_reservation_is_rejected() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;

    review_service::submit_review(&fx.db, &fx.client, review(&r.id, 4))
        .await
        .unwrap();
    let again = review_service::submit_review(&fx.db, &fx.client, review(&r.id, 1)).await;
    assert!(matches!(again, Err(DomainError::DuplicateReview)));
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (4.0, 1));
}

#[tokio::test]
async fn invalid_reviews_are_rejected() {
    let fx = setup().await;
    let done = completed_reservation(&fx).await;
    let pending = book(&fx).await;

    let out_of_range = review_service::submit_review(&fx.db, &fx.client, review(&done.id, 6)).await;
    assert!(matches!(out_of_range, Err(DomainError::Validation(_))));

    let not_done = review_service::submit_review(&fx.db, &fx.client, review(&pending.id, 4)).await;
    assert!(matches!(not_done, Err(DomainError::Validation(_))));

    let outsider = common::create_actor(&fx.db, "outsider@test.local", UserType::Client).await;
    let foreign = review_service::submit_review(&fx.db, &outsider, review(&done.id, 4)).await;
    assert!(matches!(foreign, Err(DomainError::Permission(_))));

    let missing = review_service::submit_review(&fx.db, &fx.client, review("nope", 4)).await;
    assert!(matches!(missing, Err(DomainError::NotFound(_))));

    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (0.0, 0));
}

#[tokio::test]
async fn hidden_and_deleted_reviews_leave_the_average() {
    let fx = setup().await;
    let a = completed_reservation(&fx).await;
    let b = completed_reservation(&fx).await;

    let five = review_service::submit_review(&fx.db, &fx.client, review(&a.id, 5))
        .await
        .unwrap();
    let two = review_service::submit_review(&fx.db, &fx.client, review(&b.id, 2))
        .await
        .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (3.5, 2));

    let hide = Moderation {
        is_visible: false,
        is_moderated: true,
        moderation_reason: Some("Offensive".to_string()),
    };
    let not_admin = review_service::moderate_review(&fx.db, &fx.client, &two.id, hide.clone()).await;
    assert!(matches!(not_admin, Err(DomainError::Permission(_))));

    review_service::moderate_review(&fx.db, &fx.admin, &two.id, hide)
        .await
        .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (5.0, 1));

    review_service::delete_review(&fx.db, &fx.client, &five.id)
        .await
        .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (0.0, 0));
}

#[tokio::test]
async fn editing_a_rating_recomputes_the_average() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;
    let submitted = review_service::submit_review(&fx.db, &fx.client, review(&r.id, 2))
        .await
        .unwrap();

    let by_provider = review_service::update_review(
        &fx.db,
        &fx.provider,
        &submitted.id,
        UpdateReview {
            rating: Some(5),
            comment: None,
        },
    )
    .await;
    assert!(matches!(by_provider, Err(DomainError::Permission(_))));

    review_service::update_review(
        &fx.db,
        &fx.client,
        &submitted.id,
        UpdateReview {
            rating: Some(5),
            comment: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (5.0, 1));
}

#[tokio::test]
async fn recipients_respond_once() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;
    let submitted = review_service::submit_review(&fx.db, &fx.client, review(&r.id, 3))
        .await
        .unwrap();

    let by_author =
        review_service::respond(&fx.db, &fx.client, &submitted.id, "Thanks".to_string()).await;
    assert!(matches!(by_author, Err(DomainError::Permission(_))));

    let answered = review_service::respond(
        &fx.db,
        &fx.provider,
        &submitted.id,
        "Thank you for the feedback".to_string(),
    )
    .await
    .unwrap();
    assert_eq!(answered.response.as_deref(), Some("Thank you for the feedback"));
    assert!(answered.response_at.is_some());

    let twice =
        review_service::respond(&fx.db, &fx.provider, &submitted.id, "Again".to_string()).await;
    assert!(matches!(twice, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn statistics_bucket_visible_ratings() {
    let fx = setup().await;
    for rating in [5, 4, 4] {
        let r = completed_reservation(&fx).await;
        review_service::submit_review(&fx.db, &fx.client, review(&r.id, rating))
            .await
            .unwrap();
    }

    let stats = review_service::statistics(&fx.db, Some(&fx.provider.user_id))
        .await
        .unwrap();
    assert_eq!(stats.total_reviews, 3);
    assert_eq!(stats.average_rating, 4.33);
    assert_eq!(stats.distribution.four, 2);
    assert_eq!(stats.distribution.five, 1);
    assert_eq!(provider_rating(&fx.db, &fx.provider.user_id).await, (4.33, 3));
}

#[tokio::test]
async fn review_lists_carry_a_short_comment() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;
    let long = "Very thorough work on every room. ".repeat(10);
    review_service::submit_review(
        &fx.db,
        &fx.client,
        NewReview {
            comment: long.clone(),
            ..review(&r.id, 5)
        },
    )
    .await
    .unwrap();

    let page = review_service::my_received_reviews(&fx.db, &fx.provider, Default::default())
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    let item = &page.results[0];
    assert_eq!(item.review.comment, long);
    assert_eq!(item.comment_preview.chars().count(), 150);
    assert!(item.comment_preview.ends_with("..."));
}
