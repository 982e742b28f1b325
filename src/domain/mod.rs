//! Domain layer - Pure business rules
//!
//! No Axum here; SeaORM only shows up in the error conversion.
//! Status enums, transition tables, rating and invoice math, repository
//! traits and domain error types.

#[macro_use]
mod macros;

pub mod account;
pub mod billing;
pub mod catalog;
pub mod errors;
pub mod history;
pub mod messaging;
pub mod money;
pub mod repositories;
pub mod reservation;
pub mod review;

pub use errors::DomainError;
pub use repositories::*;
