//! Review rules and rating aggregation

use rust_decimal::Decimal;
use serde::Serialize;

use super::{money, DomainError};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

string_enum! {
    pub enum ReviewDirection {
        ClientToProvider => "client_provider",
        ProviderToClient => "provider_client",
    }
}

pub fn validate_rating(rating: i32) -> Result<(), DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

/// Direction and recipient derived from who wrote the review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewParties {
    pub direction: ReviewDirection,
    pub recipient_id: String,
}

/// The author must be one side of the reservation; the recipient is the other.
pub fn resolve_parties(
    author_id: &str,
    client_user_id: &str,
    provider_user_id: &str,
) -> Result<ReviewParties, DomainError> {
    let parties = if author_id == client_user_id {
        ReviewParties {
            direction: ReviewDirection::ClientToProvider,
            recipient_id: provider_user_id.to_string(),
        }
    } else if author_id == provider_user_id {
        ReviewParties {
            direction: ReviewDirection::ProviderToClient,
            recipient_id: client_user_id.to_string(),
        }
    } else {
        return Err(DomainError::forbidden(
            "only the client or the provider of a reservation can review it",
        ));
    };

    if parties.recipient_id == author_id {
        return Err(DomainError::SelfReview);
    }
    Ok(parties)
}

/// Denormalized rating stored on the provider profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i32,
}

impl RatingSummary {
    pub const EMPTY: RatingSummary = RatingSummary {
        average_rating: 0.0,
        total_reviews: 0,
    };
}

/// Arithmetic mean rounded to two decimals; order of the input does not matter.
pub fn summarize(ratings: &[i32]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary::EMPTY;
    }

    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as i64);

    RatingSummary {
        average_rating: money::to_f64(mean),
        total_reviews: ratings.len() as i32,
    }
}

/// Count of ratings per star value, index 0 holding one-star reviews.
pub fn distribution(ratings: &[i32]) -> [u64; 5] {
    let mut buckets = [0u64; 5];
    for rating in ratings {
        if (MIN_RATING..=MAX_RATING).contains(rating) {
            buckets[(*rating - MIN_RATING) as usize] += 1;
        }
    }
    buckets
}

/// Comment shortened for list views.
pub fn comment_preview(comment: &str) -> String {
    if comment.chars().count() > 150 {
        let head: String = comment.chars().take(147).collect();
        format!("{}...", head)
    } else {
        comment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(matches!(validate_rating(0), Err(DomainError::Validation(_))));
        assert!(matches!(validate_rating(6), Err(DomainError::Validation(_))));
    }

    #[test]
    fn client_author_reviews_the_provider() {
        let parties = resolve_parties("c", "c", "p").unwrap();
        assert_eq!(parties.direction, ReviewDirection::ClientToProvider);
        assert_eq!(parties.recipient_id, "p");

        let parties = resolve_parties("p", "c", "p").unwrap();
        assert_eq!(parties.direction, ReviewDirection::ProviderToClient);
        assert_eq!(parties.recipient_id, "c");
    }

    #[test]
    fn outsiders_and_self_reviews_are_rejected() {
        assert!(matches!(
            resolve_parties("x", "c", "p"),
            Err(DomainError::Permission(_))
        ));
        assert!(matches!(
            resolve_parties("u", "u", "u"),
            Err(DomainError::SelfReview)
        ));
    }

    #[test]
    fn summary_is_a_rounded_mean() {
        assert_eq!(summarize(&[]), RatingSummary::EMPTY);
        assert_eq!(summarize(&[4]).average_rating, 4.0);
        assert_eq!(summarize(&[4, 2]).average_rating, 3.0);

        let s = summarize(&[5, 4, 4]);
        assert_eq!(s.average_rating, 4.33);
        assert_eq!(s.total_reviews, 3);
        assert_eq!(summarize(&[4, 4, 5]), s);
    }

    #[test]
    fn distribution_buckets() {
        assert_eq!(distribution(&[1, 5, 5, 3]), [1, 0, 1, 0, 2]);
    }

    #[test]
    fn long_comments_are_truncated() {
        let long = "a".repeat(200);
        let preview = comment_preview(&long);
        assert_eq!(preview.chars().count(), 150);
        assert!(preview.ends_with("..."));
        assert_eq!(comment_preview("short"), "short");
    }
}
