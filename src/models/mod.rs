pub mod category;
pub mod client_profile;
pub mod history;
pub mod invoice;
pub mod invoice_sequence;
pub mod message;
pub mod notification;
pub mod payment;
pub mod provider_profile;
pub mod provider_service;
pub mod reservation;
pub mod reservation_photo;
pub mod reservation_status_history;
pub mod review;
pub mod service;
pub mod user;

pub use user::UserSummary;
