//! Reservation lifecycle rules
//!
//! ```text
//! pending ──> confirmed ──> in_progress ──> completed
//!    │            │
//!    └────────────┴──> cancelled | cancelled_by_provider
//! ```

use super::DomainError;

string_enum! {
    pub enum ReservationStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        CancelledByProvider => "cancelled_by_provider",
    }
}

string_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

string_enum! {
    pub enum PhotoType {
        Before => "before",
        After => "after",
        Problem => "problem",
        Solution => "solution",
        Other => "other",
    }
}

/// Lifecycle timestamp column touched by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStamp {
    ConfirmedAt,
    StartedAt,
    CompletedAt,
    CancelledAt,
}

impl ReservationStatus {
    /// Not cancelled and not finished.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed | ReservationStatus::InProgress
        )
    }

    pub fn can_be_cancelled(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn is_cancellation(self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::CancelledByProvider
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReservationStatus::Completed) || self.is_cancellation()
    }

    /// Edge table of the state machine.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;

        match (self, next) {
            (Pending, Confirmed) | (Confirmed, InProgress) | (InProgress, Completed) => true,
            (from, to) if to.is_cancellation() => from.can_be_cancelled(),
            _ => false,
        }
    }

    /// Statuses reachable in one step from `self`.
    pub fn next_statuses(self) -> Vec<ReservationStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    pub fn stamp(self) -> Option<LifecycleStamp> {
        match self {
            ReservationStatus::Pending => None,
            ReservationStatus::Confirmed => Some(LifecycleStamp::ConfirmedAt),
            ReservationStatus::InProgress => Some(LifecycleStamp::StartedAt),
            ReservationStatus::Completed => Some(LifecycleStamp::CompletedAt),
            ReservationStatus::Cancelled | ReservationStatus::CancelledByProvider => {
                Some(LifecycleStamp::CancelledAt)
            }
        }
    }
}

/// Validate a move and return the timestamp column it sets.
pub fn check_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<Option<LifecycleStamp>, DomainError> {
    if !from.can_transition_to(to) {
        return Err(DomainError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(to.stamp())
}

/// Which party of a reservation is allowed to request a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Client,
    Provider,
}

pub fn party_for(status: ReservationStatus) -> Option<Party> {
    match status {
        ReservationStatus::Pending => None,
        ReservationStatus::Cancelled => Some(Party::Client),
        ReservationStatus::Confirmed
        | ReservationStatus::InProgress
        | ReservationStatus::Completed
        | ReservationStatus::CancelledByProvider => Some(Party::Provider),
    }
}

/// "1h30" style rendering of a duration given in decimal hours.
pub fn duration_display(hours: f64) -> String {
    let whole = hours.trunc() as i64;
    let minutes = ((hours - hours.trunc()) * 60.0).round() as i64;
    if minutes > 0 {
        format!("{}h{:02}", whole, minutes)
    } else {
        format!("{}h", whole)
    }
}

#[cfg(test)]
mod tests {
    use super::ReservationStatus::*;
    use super::*;

    #[test]
    fn happy_path_edges_are_allowed() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn cancellation_only_from_the_two_earliest_states() {
        for from in ReservationStatus::ALL {
            for to in [Cancelled, CancelledByProvider] {
                assert_eq!(
                    from.can_transition_to(to),
                    from.can_be_cancelled(),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn every_other_edge_is_rejected() {
        let legal = [
            (Pending, Confirmed),
            (Confirmed, InProgress),
            (InProgress, Completed),
            (Pending, Cancelled),
            (Pending, CancelledByProvider),
            (Confirmed, Cancelled),
            (Confirmed, CancelledByProvider),
        ];
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let expected = legal.contains(&(*from, *to));
                assert_eq!(check_transition(*from, *to).is_ok(), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn invalid_transition_reports_both_ends() {
        match check_transition(Completed, Pending) {
            Err(DomainError::InvalidTransition { from, to }) => {
                assert_eq!(from, "completed");
                assert_eq!(to, "pending");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn active_and_terminal_flags() {
        assert!(InProgress.is_active());
        assert!(!InProgress.can_be_cancelled());
        assert!(Completed.is_terminal());
        assert!(CancelledByProvider.is_terminal());
        assert!(Completed.next_statuses().is_empty());
        assert_eq!(Pending.next_statuses(), vec![Confirmed, Cancelled, CancelledByProvider]);
    }

    #[test]
    fn stamps_follow_target_status() {
        assert_eq!(Confirmed.stamp(), Some(LifecycleStamp::ConfirmedAt));
        assert_eq!(CancelledByProvider.stamp(), Some(LifecycleStamp::CancelledAt));
        assert_eq!(Pending.stamp(), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!("in_progress".parse::<ReservationStatus>().unwrap(), InProgress);
        assert!("done".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn durations_render_like_a_clock() {
        assert_eq!(duration_display(1.5), "1h30");
        assert_eq!(duration_display(2.0), "2h");
        assert_eq!(duration_display(0.25), "0h15");
    }
}
