#![allow(dead_code)]

use sea_orm::DatabaseConnection;
use tabali::db;
use tabali::domain::account::{Actor, UserType};
use tabali::domain::catalog::PricingType;
use tabali::domain::reservation::ReservationStatus;
use tabali::domain::{CategoryRepository, NewCatalogService, NewCategory, ServiceRepository};
use tabali::infrastructure::{SeaOrmCategoryRepository, SeaOrmServiceRepository};
use tabali::models::reservation;
use tabali::services::account_service::{self, RegisterInput};
use tabali::services::catalog_service::{self, NewProviderService};
use tabali::services::reservation_service::{self, NewReservation};

pub const PASSWORD: &str = "correct-horse";

pub struct Fixture {
    pub db: DatabaseConnection,
    pub admin: Actor,
    pub client: Actor,
    pub provider: Actor,
    pub category_id: String,
    /// Catalog service "Deep cleaning", base price 100.00
    pub service_id: String,
    /// Provider service offered at 120.00
    pub offer_id: String,
}

pub async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

pub fn register_input(email: &str, user_type: UserType) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone: None,
        user_type,
        address: None,
        city: Some("Rabat".to_string()),
        postal_code: None,
        company_name: None,
    }
}

pub async fn create_actor(db: &DatabaseConnection, email: &str, user_type: UserType) -> Actor {
    let user = account_service::create_user(db, register_input(email, user_type))
        .await
        .expect("Failed to create user");
    Actor::new(user.id, user_type)
}

pub async fn setup() -> Fixture {
    setup_with(setup_test_db().await).await
}

/// Same fixture on a SQLite file, for tests that need several connections
pub async fn setup_on_file(path: &std::path::Path) -> Fixture {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = db::init_db(&url).await.expect("Failed to init file DB");
    setup_with(db).await
}

async fn setup_with(db: DatabaseConnection) -> Fixture {

    let admin = create_actor(&db, "admin@test.local", UserType::Admin).await;
    let client = create_actor(&db, "client@test.local", UserType::Client).await;
    let provider = create_actor(&db, "provider@test.local", UserType::Provider).await;

    let category = SeaOrmCategoryRepository::new(db.clone())
        .create(NewCategory {
            name: "Cleaning".to_string(),
            description: None,
            parent_id: None,
            display_order: 0,
        })
        .await
        .expect("Failed to create category");

    let service = SeaOrmServiceRepository::new(db.clone())
        .create(NewCatalogService {
            name: "Deep cleaning".to_string(),
            description: None,
            category_id: category.id.clone(),
            service_type: None,
            pricing_type: PricingType::Fixed,
            base_price: 100.0,
            estimated_duration: Some(2.0),
        })
        .await
        .expect("Failed to create service");

    let offer = catalog_service::create_provider_service(
        &db,
        &provider,
        NewProviderService {
            service_id: service.id.clone(),
            custom_price: Some(120.0),
            experience_years: 4,
        },
    )
    .await
    .expect("Failed to create provider service");

    Fixture {
        db,
        admin,
        client,
        provider,
        category_id: category.id,
        service_id: service.id,
        offer_id: offer.offer.id,
    }
}

pub fn new_reservation(offer_id: &str) -> NewReservation {
    NewReservation {
        provider_service_id: offer_id.to_string(),
        scheduled_at: "2025-06-01T09:00:00Z".to_string(),
        estimated_duration: None,
        address: "12 rue des Lilas".to_string(),
        latitude: None,
        longitude: None,
        description: "Two bedroom flat".to_string(),
        priority: None,
        estimated_price: None,
    }
}

pub async fn book(fx: &Fixture) -> reservation::Model {
    reservation_service::create_reservation(&fx.db, &fx.client, new_reservation(&fx.offer_id))
        .await
        .expect("Failed to create reservation")
}

/// Book and drive a reservation to `completed`
pub async fn completed_reservation(fx: &Fixture) -> reservation::Model {
    let r = book(fx).await;
    for status in [
        ReservationStatus::Confirmed,
        ReservationStatus::InProgress,
        ReservationStatus::Completed,
    ] {
        reservation_service::transition(&fx.db, &fx.provider, &r.id, status, None)
            .await
            .expect("Failed to move reservation");
    }
    reservation_service::get_reservation(&fx.db, &fx.admin, &r.id)
        .await
        .expect("Failed to reload reservation")
}
