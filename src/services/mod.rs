//! Services Layer
//!
//! This module contains the business operations behind the HTTP handlers.
//! Every mutation takes the acting user explicitly; side effects (status
//! history, rating recompute, audit trail, notifications) are invoked here.

pub mod account_service;
pub mod billing_service;
pub mod catalog_service;
pub mod history_service;
pub mod messaging_service;
pub mod reservation_service;
pub mod review_service;

pub use crate::domain::account::Actor;

/// Error type for service operations
pub type ServiceError = crate::domain::DomainError;
