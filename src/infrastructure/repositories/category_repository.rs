//! SeaORM implementation of CategoryRepository

use async_trait::async_trait;
use sea_orm::*;

use crate::domain::catalog::slugify;
use crate::domain::{Category, CategoryRepository, DomainError, NewCategory};
use crate::models::category::{self, ActiveModel, Entity as CategoryEntity};
use crate::utils::{new_id, now_rfc3339};

/// SeaORM-based implementation of CategoryRepository
pub struct SeaOrmCategoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn active_where(&self, condition: Condition) -> Result<Vec<Category>, DomainError> {
        let categories = CategoryEntity::find()
            .filter(category::Column::IsActive.eq(true))
            .filter(condition)
            .order_by_asc(category::Column::DisplayOrder)
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;

        Ok(categories.into_iter().map(to_domain).collect())
    }
}

fn to_domain(c: category::Model) -> Category {
    Category {
        id: c.id,
        name: c.name,
        slug: c.slug,
        description: c.description,
        parent_id: c.parent_id,
        display_order: c.display_order,
        is_active: c.is_active,
        created_at: c.created_at,
    }
}

#[async_trait]
impl CategoryRepository for SeaOrmCategoryRepository {
    async fn find_all(&self) -> Result<Vec<Category>, DomainError> {
        self.active_where(Condition::all()).await
    }

    async fn find_roots(&self) -> Result<Vec<Category>, DomainError> {
        self.active_where(Condition::all().add(category::Column::ParentId.is_null()))
            .await
    }

    async fn find_children(&self, parent_id: &str) -> Result<Vec<Category>, DomainError> {
        self.active_where(Condition::all().add(category::Column::ParentId.eq(parent_id)))
            .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, DomainError> {
        let category = CategoryEntity::find_by_id(id.to_owned()).one(&self.db).await?;
        Ok(category.map(to_domain))
    }

    async fn create(&self, input: NewCategory) -> Result<Category, DomainError> {
        let name = input.name.trim().to_string();
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(DomainError::invalid("category name is required"));
        }

        if let Some(parent_id) = &input.parent_id {
            if self.find_by_id(parent_id).await?.is_none() {
                return Err(DomainError::not_found("Parent category"));
            }
        }

        let taken = CategoryEntity::find()
            .filter(
                Condition::any()
                    .add(category::Column::Name.eq(name.as_str()))
                    .add(category::Column::Slug.eq(slug.as_str())),
            )
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(DomainError::invalid(format!("category '{}' already exists", name)));
        }

        let category = ActiveModel {
            id: Set(new_id()),
            name: Set(name),
            slug: Set(slug),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            display_order: Set(input.display_order),
            is_active: Set(true),
            created_at: Set(now_rfc3339()),
        };

        let result = category.insert(&self.db).await?;
        Ok(to_domain(result))
    }
}
