pub mod auth;
pub mod catalog;
pub mod error;
pub mod health;
pub mod history;
pub mod invoices;
pub mod messaging;
pub mod payments;
pub mod providers;
pub mod reservations;
pub mod reviews;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/refresh", post(auth::refresh))
        .route("/v1/auth/me", get(auth::get_me).put(auth::update_me))
        .route("/v1/auth/password", post(auth::change_password))
        // Providers
        .route("/v1/providers", get(providers::search_providers))
        .route(
            "/v1/providers/me",
            put(providers::update_my_provider_profile),
        )
        .route("/v1/providers/:id", get(providers::get_provider))
        .route(
            "/v1/providers/:id/services",
            get(providers::list_provider_services),
        )
        .route(
            "/v1/providers/:id/reviews/statistics",
            get(providers::provider_review_statistics),
        )
        // Catalog
        .route(
            "/v1/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/v1/categories/roots", get(catalog::list_root_categories))
        .route("/v1/categories/:id", get(catalog::get_category))
        .route(
            "/v1/categories/:id/children",
            get(catalog::list_category_children),
        )
        .route(
            "/v1/services",
            get(catalog::list_services).post(catalog::create_service),
        )
        .route("/v1/services/popular", get(catalog::popular_services))
        .route("/v1/services/:id", get(catalog::get_service))
        .route(
            "/v1/provider-services",
            post(catalog::create_provider_service),
        )
        // Reservations
        .route(
            "/v1/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/v1/reservations/:id",
            get(reservations::get_reservation).delete(reservations::delete_reservation),
        )
        .route(
            "/v1/reservations/:id/transition",
            post(reservations::transition),
        )
        .route("/v1/reservations/:id/confirm", post(reservations::confirm))
        .route("/v1/reservations/:id/start", post(reservations::start))
        .route("/v1/reservations/:id/complete", post(reservations::complete))
        .route("/v1/reservations/:id/cancel", post(reservations::cancel))
        .route(
            "/v1/reservations/:id/history",
            get(reservations::status_history),
        )
        .route(
            "/v1/reservations/:id/photos",
            get(reservations::list_photos).post(reservations::add_photo),
        )
        // Reviews
        .route(
            "/v1/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/v1/reviews/mine/given", get(reviews::my_given_reviews))
        .route("/v1/reviews/mine/received", get(reviews::my_received_reviews))
        .route("/v1/reviews/statistics", get(reviews::review_statistics))
        .route(
            "/v1/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route("/v1/reviews/:id/moderate", post(reviews::moderate_review))
        .route("/v1/reviews/:id/respond", post(reviews::respond_to_review))
        // Payments
        .route(
            "/v1/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/v1/payments/statistics", get(payments::payment_statistics))
        .route("/v1/payments/:id", get(payments::get_payment))
        .route(
            "/v1/payments/:id/status",
            post(payments::update_payment_status),
        )
        // Invoices
        .route(
            "/v1/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/v1/invoices/overdue", get(invoices::overdue_invoices))
        .route(
            "/v1/invoices/:id",
            get(invoices::get_invoice).patch(invoices::update_invoice),
        )
        .route("/v1/invoices/:id/send", post(invoices::send_invoice))
        .route("/v1/invoices/:id/pay", post(invoices::pay_invoice))
        .route("/v1/invoices/:id/cancel", post(invoices::cancel_invoice))
        .route("/v1/invoices/:id/payment", post(invoices::attach_payment))
        // Messaging
        .route("/v1/messages", post(messaging::send_message))
        .route("/v1/messages/:id/read", post(messaging::mark_message_read))
        .route("/v1/messages/:id/archive", post(messaging::archive_message))
        .route("/v1/conversations", get(messaging::list_conversations))
        .route(
            "/v1/conversations/:id",
            get(messaging::conversation_messages),
        )
        .route("/v1/notifications", get(messaging::list_notifications))
        .route(
            "/v1/notifications/unread-count",
            get(messaging::unread_count),
        )
        .route(
            "/v1/notifications/:id/read",
            post(messaging::mark_notification_read),
        )
        // History
        .route("/v1/history", get(history::list_history))
        .route("/v1/history/statistics", get(history::history_statistics))
        .route("/v1/history/export", get(history::export_history))
        .route(
            "/v1/history/object/:object_type/:id",
            get(history::object_history),
        )
        .with_state(state)
}
