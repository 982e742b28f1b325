use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub service_type: Option<String>,
    pub pricing_type: String, // 'fixed', 'hourly', 'quote'
    pub base_price: f64,
    pub estimated_duration: Option<f64>,
    pub is_active: bool,
    /// Number of reservations made for this service
    pub popularity_score: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "super::provider_service::Entity")]
    ProviderService,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::provider_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderService.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
