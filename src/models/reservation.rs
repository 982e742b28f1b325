use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// User ids of both parties
    pub client_id: String,
    pub provider_id: String,
    pub provider_service_id: String,
    pub scheduled_at: String,
    /// Hours
    pub estimated_duration: f64,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub estimated_price: Option<f64>,
    pub final_price: Option<f64>,
    pub status: String,
    pub priority: String, // 'low', 'medium', 'high', 'urgent'
    pub confirmed_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub internal_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClientId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ProviderId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Provider,
    #[sea_orm(
        belongs_to = "super::provider_service::Entity",
        from = "Column::ProviderServiceId",
        to = "super::provider_service::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ProviderService,
    #[sea_orm(has_many = "super::reservation_status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::reservation_photo::Entity")]
    Photo,
}

impl Related<super::provider_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderService.def()
    }
}

impl Related<super::reservation_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::reservation_photo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
