use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit trail row
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub description: String,
    /// JSON text
    pub context: Option<String>,
    pub importance: String, // 'info', 'warning', 'critical', 'security'
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub data_before: Option<String>,
    pub data_after: Option<String>,
    pub tags: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
