use sea_orm::*;

use crate::domain::account::UserType;
use crate::domain::catalog::PricingType;
use crate::domain::{DomainError, NewCatalogService, NewCategory};
use crate::domain::{CategoryRepository, ServiceRepository};
use crate::infrastructure::{SeaOrmCategoryRepository, SeaOrmServiceRepository};
use crate::models::provider_service;
use crate::models::user::{self, Entity as User};
use crate::services::account_service::{create_user, RegisterInput};
use crate::utils::{new_id, now_rfc3339};

const DEMO_PASSWORD: &str = "tabali-demo";

fn demo_user(email: &str, first_name: &str, last_name: &str, user_type: UserType) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        password: DEMO_PASSWORD.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone: None,
        user_type,
        address: None,
        city: Some("Casablanca".to_string()),
        postal_code: None,
        company_name: None,
    }
}

/// Demo accounts and a small catalog. Does nothing when the admin exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    let already = User::find()
        .filter(user::Column::Email.eq("admin@tabali.test"))
        .count(db)
        .await?;
    if already > 0 {
        tracing::info!("Demo data already present, skipping");
        return Ok(());
    }

    create_user(db, demo_user("admin@tabali.test", "Admin", "Tabali", UserType::Admin)).await?;
    create_user(db, demo_user("client@tabali.test", "Salma", "Benali", UserType::Client)).await?;
    let provider = create_user(
        db,
        demo_user("provider@tabali.test", "Youssef", "Amrani", UserType::Provider),
    )
    .await?;

    let categories = SeaOrmCategoryRepository::new(db.clone());
    let services = SeaOrmServiceRepository::new(db.clone());

    let home = categories
        .create(NewCategory {
            name: "Home".to_string(),
            description: Some("Repairs and maintenance".to_string()),
            parent_id: None,
            display_order: 0,
        })
        .await?;
    let plumbing = categories
        .create(NewCategory {
            name: "Plumbing".to_string(),
            description: None,
            parent_id: Some(home.id.clone()),
            display_order: 1,
        })
        .await?;

    let catalog = [
        ("Leak repair", PricingType::Fixed, 60.0, Some(1.0)),
        ("Bathroom installation", PricingType::Quote, 0.0, None),
        ("Plumbing hourly work", PricingType::Hourly, 35.0, Some(2.0)),
    ];

    for (index, (name, pricing_type, base_price, duration)) in catalog.into_iter().enumerate() {
        let service = services
            .create(NewCatalogService {
                name: name.to_string(),
                description: None,
                category_id: plumbing.id.clone(),
                service_type: Some("plumbing".to_string()),
                pricing_type,
                base_price,
                estimated_duration: duration,
            })
            .await?;

        // The demo provider offers the first service at a custom price
        provider_service::ActiveModel {
            id: Set(new_id()),
            provider_id: Set(provider.id.clone()),
            service_id: Set(service.id),
            custom_price: Set(if index == 0 { Some(55.0) } else { None }),
            experience_years: Set(5),
            is_available: Set(true),
            created_at: Set(now_rfc3339()),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}
