//! Audit trail - recording and admin read access
//!
//! Writes go through [`log_action`], which never fails the calling
//! operation: a failed insert is logged and swallowed.

use std::collections::BTreeMap;

use chrono::Duration;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::account::Actor;
use crate::domain::history::{
    join_tags, parse_tags, ClientInfo, HistoryAction, Importance, LinkedObject,
};
use crate::models::history::{self, Entity as History};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, time, Page, PageParams};

/// A history row before it is written
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub user_id: Option<String>,
    pub object: Option<LinkedObject>,
    pub description: String,
    pub context: Option<Value>,
    pub importance: Importance,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub data_before: Option<Value>,
    pub data_after: Option<Value>,
    pub tags: Vec<String>,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, description: impl Into<String>) -> Self {
        Self {
            action,
            user_id: None,
            object: None,
            description: description.into(),
            context: None,
            importance: Importance::Info,
            ip_address: None,
            user_agent: None,
            data_before: None,
            data_after: None,
            tags: Vec::new(),
        }
    }

    pub fn by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn about(mut self, object: LinkedObject) -> Self {
        self.object = Some(object);
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.ip_address = client.ip_address.clone();
        self.user_agent = client.user_agent.clone();
        self
    }

    pub fn change(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        self.data_before = before;
        self.data_after = after;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Insert a history row.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    entry: HistoryEntry,
) -> Result<history::Model, ServiceError> {
    let (object_type, object_id) = match &entry.object {
        Some(obj) => (Some(obj.kind().to_string()), Some(obj.id().to_string())),
        None => (None, None),
    };

    let row = history::ActiveModel {
        id: Set(new_id()),
        action: Set(entry.action.to_string()),
        user_id: Set(entry.user_id),
        object_type: Set(object_type),
        object_id: Set(object_id),
        description: Set(entry.description),
        context: Set(entry.context.map(|v| v.to_string())),
        importance: Set(entry.importance.to_string()),
        ip_address: Set(entry.ip_address),
        user_agent: Set(entry.user_agent),
        data_before: Set(entry.data_before.map(|v| v.to_string())),
        data_after: Set(entry.data_after.map(|v| v.to_string())),
        tags: Set(join_tags(&entry.tags)),
        created_at: Set(now_rfc3339()),
    };

    Ok(row.insert(db).await?)
}

/// Best-effort [`record`]; failures are only logged.
pub async fn log_action<C: ConnectionTrait>(db: &C, entry: HistoryEntry) {
    let action = entry.action;
    if let Err(e) = record(db, entry).await {
        tracing::warn!("Failed to write history entry '{}': {}", action, e);
    }
}

/// History row as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub description: String,
    pub context: Option<Value>,
    pub importance: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub data_before: Option<Value>,
    pub data_after: Option<Value>,
    pub tags: Vec<String>,
    pub created_at: String,
}

fn parse_json(raw: Option<String>) -> Option<Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

impl From<history::Model> for HistoryView {
    fn from(m: history::Model) -> Self {
        Self {
            tags: parse_tags(&m.tags),
            id: m.id,
            action: m.action,
            user_id: m.user_id,
            object_type: m.object_type,
            object_id: m.object_id,
            description: m.description,
            context: parse_json(m.context),
            importance: m.importance,
            ip_address: m.ip_address,
            user_agent: m.user_agent,
            data_before: parse_json(m.data_before),
            data_after: parse_json(m.data_after),
            created_at: m.created_at,
        }
    }
}

/// Filter parameters for listing history
#[derive(Debug, Default, Clone, Deserialize)]
pub struct HistoryFilter {
    pub action: Option<HistoryAction>,
    pub user_id: Option<String>,
    pub importance: Option<Importance>,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub date_to: Option<String>,
    pub tag: Option<String>,
}

fn build_condition(filter: &HistoryFilter) -> Result<Condition, ServiceError> {
    let mut condition = Condition::all();

    if let Some(action) = filter.action {
        condition = condition.add(history::Column::Action.eq(action.as_str()));
    }
    if let Some(user_id) = &filter.user_id {
        condition = condition.add(history::Column::UserId.eq(user_id.as_str()));
    }
    if let Some(importance) = filter.importance {
        condition = condition.add(history::Column::Importance.eq(importance.as_str()));
    }
    if let Some(object_type) = &filter.object_type {
        condition = condition.add(history::Column::ObjectType.eq(object_type.as_str()));
    }
    if let Some(object_id) = &filter.object_id {
        condition = condition.add(history::Column::ObjectId.eq(object_id.as_str()));
    }
    if let Some(from) = &filter.date_from {
        let from = time::parse_date(from)?;
        condition = condition.add(history::Column::CreatedAt.gte(from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = &filter.date_to {
        let end = time::parse_date(to)? + Duration::days(1);
        condition = condition.add(history::Column::CreatedAt.lt(end.format("%Y-%m-%d").to_string()));
    }
    if let Some(tag) = &filter.tag {
        condition = condition.add(history::Column::Tags.contains(tag.trim()));
    }

    Ok(condition)
}

/// List history rows, newest first (admin only)
pub async fn list_history(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: HistoryFilter,
    params: PageParams,
) -> Result<Page<HistoryView>, ServiceError> {
    actor.require_admin()?;

    let paginator = History::find()
        .filter(build_condition(&filter)?)
        .order_by_desc(history::Column::CreatedAt)
        .order_by_desc(history::Column::Id)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(rows, count, params).map(HistoryView::from))
}

/// Every row about one object, oldest first (admin only)
pub async fn history_for_object(
    db: &DatabaseConnection,
    actor: &Actor,
    object: &LinkedObject,
) -> Result<Vec<HistoryView>, ServiceError> {
    actor.require_admin()?;

    let rows = History::find()
        .filter(history::Column::ObjectType.eq(object.kind().as_str()))
        .filter(history::Column::ObjectId.eq(object.id()))
        .order_by_asc(history::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(HistoryView::from).collect())
}

#[derive(Debug, Serialize)]
pub struct HistoryStatistics {
    pub total: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_importance: BTreeMap<String, u64>,
    pub distinct_users: u64,
}

pub async fn statistics(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<HistoryStatistics, ServiceError> {
    actor.require_admin()?;

    let rows = History::find().all(db).await?;

    let mut by_action = BTreeMap::new();
    let mut by_importance = BTreeMap::new();
    let mut users = std::collections::HashSet::new();

    for row in &rows {
        *by_action.entry(row.action.clone()).or_insert(0) += 1;
        *by_importance.entry(row.importance.clone()).or_insert(0) += 1;
        if let Some(user_id) = &row.user_id {
            users.insert(user_id.clone());
        }
    }

    Ok(HistoryStatistics {
        total: rows.len() as u64,
        by_action,
        by_importance,
        distinct_users: users.len() as u64,
    })
}

/// CSV export of the filtered history (admin only)
pub async fn export_csv(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: HistoryFilter,
) -> Result<String, ServiceError> {
    actor.require_admin()?;

    let rows = History::find()
        .filter(build_condition(&filter)?)
        .order_by_desc(history::Column::CreatedAt)
        .all(db)
        .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "created_at",
            "action",
            "user_id",
            "object_type",
            "object_id",
            "importance",
            "description",
            "ip_address",
            "tags",
        ])
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    for row in rows {
        writer
            .write_record([
                row.id.as_str(),
                row.created_at.as_str(),
                row.action.as_str(),
                row.user_id.as_deref().unwrap_or(""),
                row.object_type.as_deref().unwrap_or(""),
                row.object_id.as_deref().unwrap_or(""),
                row.importance.as_str(),
                row.description.as_str(),
                row.ip_address.as_deref().unwrap_or(""),
                row.tags.as_str(),
            ])
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Internal(e.to_string()))
}
