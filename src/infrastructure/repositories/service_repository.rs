//! SeaORM implementation of ServiceRepository

use async_trait::async_trait;
use sea_orm::*;

use crate::domain::catalog::{validate_price, PricingType};
use crate::domain::{
    CatalogService, DomainError, NewCatalogService, PaginatedServices, ServiceFilter,
    ServiceRepository,
};
use crate::models::category::Entity as CategoryEntity;
use crate::models::service::{self, ActiveModel, Entity as ServiceEntity};
use crate::utils::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::{new_id, now_rfc3339};

/// SeaORM-based implementation of ServiceRepository
pub struct SeaOrmServiceRepository {
    db: DatabaseConnection,
}

impl SeaOrmServiceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(s: service::Model) -> Result<CatalogService, DomainError> {
    Ok(CatalogService {
        pricing_type: s.pricing_type.parse::<PricingType>()?,
        id: s.id,
        name: s.name,
        description: s.description,
        category_id: s.category_id,
        service_type: s.service_type,
        base_price: s.base_price,
        estimated_duration: s.estimated_duration,
        is_active: s.is_active,
        popularity_score: s.popularity_score,
        created_at: s.created_at,
    })
}

#[async_trait]
impl ServiceRepository for SeaOrmServiceRepository {
    async fn find_all(&self, filter: ServiceFilter) -> Result<PaginatedServices, DomainError> {
        let mut condition = Condition::all().add(service::Column::IsActive.eq(true));

        if let Some(category_id) = &filter.category_id {
            condition = condition.add(service::Column::CategoryId.eq(category_id.as_str()));
        }

        if let Some(q) = &filter.query {
            let q = q.trim();
            if !q.is_empty() {
                condition = condition.add(
                    Condition::any()
                        .add(service::Column::Name.contains(q))
                        .add(service::Column::Description.contains(q)),
                );
            }
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.unwrap_or(1).max(1);

        let paginator = ServiceEntity::find()
            .filter(condition)
            .order_by_desc(service::Column::PopularityScore)
            .order_by_asc(service::Column::Name)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await?;
        let services = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedServices { services, total })
    }

    async fn find_popular(&self, limit: u64) -> Result<Vec<CatalogService>, DomainError> {
        ServiceEntity::find()
            .filter(service::Column::IsActive.eq(true))
            .order_by_desc(service::Column::PopularityScore)
            .order_by_asc(service::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogService>, DomainError> {
        ServiceEntity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn create(&self, input: NewCatalogService) -> Result<CatalogService, DomainError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid("service name is required"));
        }
        let base_price = validate_price(input.base_price, "base_price")?;
        if let Some(duration) = input.estimated_duration {
            if duration <= 0.0 {
                return Err(DomainError::invalid("estimated_duration must be positive"));
            }
        }

        CategoryEntity::find_by_id(input.category_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Category"))?;

        let now = now_rfc3339();
        let service = ActiveModel {
            id: Set(new_id()),
            name: Set(name),
            description: Set(input.description),
            category_id: Set(input.category_id),
            service_type: Set(input.service_type),
            pricing_type: Set(input.pricing_type.to_string()),
            base_price: Set(base_price),
            estimated_duration: Set(input.estimated_duration),
            is_active: Set(true),
            popularity_score: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let result = service.insert(&self.db).await?;
        to_domain(result)
    }
}
