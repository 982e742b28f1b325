//! Messaging Service - direct messages and in-app notifications

use std::collections::HashMap;

use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::account::Actor;
use crate::domain::history::{HistoryAction, LinkedObject};
use crate::domain::messaging::{preview, MessageStatus, NotificationStatus, NotificationType};
use crate::models::message::{self, Entity as Message};
use crate::models::notification::{self, Entity as Notification};
use crate::models::user::Entity as User;
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::reservation_service::find_reservation;
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, Page, PageParams};

/// Notification before it is written
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub action_url: Option<String>,
    pub object: Option<LinkedObject>,
}

impl NewNotification {
    pub fn new(
        user_id: &str,
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            notification_type,
            title: title.into(),
            content: content.into(),
            action_url: None,
            object: None,
        }
    }

    pub fn about(mut self, object: LinkedObject) -> Self {
        self.object = Some(object);
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}

pub async fn create_notification<C: ConnectionTrait>(
    db: &C,
    input: NewNotification,
) -> Result<notification::Model, ServiceError> {
    let (object_type, object_id) = match &input.object {
        Some(obj) => (Some(obj.kind().to_string()), Some(obj.id().to_string())),
        None => (None, None),
    };

    let row = notification::ActiveModel {
        id: Set(new_id()),
        user_id: Set(input.user_id),
        notification_type: Set(input.notification_type.to_string()),
        title: Set(input.title),
        content: Set(input.content),
        action_url: Set(input.action_url),
        object_type: Set(object_type),
        object_id: Set(object_id),
        status: Set(NotificationStatus::Unread.to_string()),
        read_at: Set(None),
        created_at: Set(now_rfc3339()),
    };

    Ok(row.insert(db).await?)
}

/// Best-effort [`create_notification`]; failures are only logged.
pub async fn notify<C: ConnectionTrait>(db: &C, input: NewNotification) {
    let user_id = input.user_id.clone();
    if let Err(e) = create_notification(db, input).await {
        tracing::warn!("Failed to notify user {}: {}", user_id, e);
    }
}

/// Input for sending a message
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub recipient_id: String,
    pub reservation_id: Option<String>,
    pub content: String,
}

/// Conversation id shared by every message between two users on the same
/// reservation scope, in either direction. A fresh id when none exists.
pub async fn get_or_create_conversation<C: ConnectionTrait>(
    db: &C,
    user_a: &str,
    user_b: &str,
    reservation_id: Option<&str>,
) -> Result<String, ServiceError> {
    let between = Condition::any()
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(user_a))
                .add(message::Column::RecipientId.eq(user_b)),
        )
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(user_b))
                .add(message::Column::RecipientId.eq(user_a)),
        );

    let scope = match reservation_id {
        Some(id) => message::Column::ReservationId.eq(id),
        None => message::Column::ReservationId.is_null(),
    };

    let existing = Message::find()
        .filter(between)
        .filter(scope)
        .order_by_asc(message::Column::CreatedAt)
        .one(db)
        .await?;

    Ok(existing
        .map(|m| m.conversation_id)
        .unwrap_or_else(new_id))
}

pub async fn send_message(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewMessage,
) -> Result<message::Model, ServiceError> {
    let content = input.content.trim().to_string();
    if content.is_empty() {
        return Err(ServiceError::invalid("message content is required"));
    }
    if input.recipient_id == actor.user_id {
        return Err(ServiceError::invalid("you cannot send a message to yourself"));
    }

    User::find_by_id(input.recipient_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipient"))?;

    if let Some(reservation_id) = &input.reservation_id {
        let reservation = find_reservation(db, reservation_id).await?;
        let parties = [reservation.client_id.as_str(), reservation.provider_id.as_str()];
        if !parties.contains(&input.recipient_id.as_str())
            || (!actor.is_admin() && !parties.contains(&actor.user_id.as_str()))
        {
            return Err(ServiceError::forbidden(
                "messages about a reservation are limited to its parties",
            ));
        }
    }

    let txn = db.begin().await?;

    let conversation_id = get_or_create_conversation(
        &txn,
        &actor.user_id,
        &input.recipient_id,
        input.reservation_id.as_deref(),
    )
    .await?;

    let message = message::ActiveModel {
        id: Set(new_id()),
        sender_id: Set(actor.user_id.clone()),
        recipient_id: Set(input.recipient_id),
        reservation_id: Set(input.reservation_id),
        conversation_id: Set(conversation_id),
        content: Set(content),
        status: Set(MessageStatus::Sent.to_string()),
        read_at: Set(None),
        created_at: Set(now_rfc3339()),
    }
    .insert(&txn)
    .await?;

    create_notification(
        &txn,
        NewNotification::new(
            &message.recipient_id,
            NotificationType::Message,
            "New message",
            preview(&message.content),
        )
        .about(LinkedObject::Message(message.id.clone())),
    )
    .await?;

    txn.commit().await?;

    tracing::debug!(
        "Message {} sent in conversation {}",
        message.id,
        message.conversation_id
    );
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Message, "Message sent")
            .by(actor.user_id.clone())
            .about(LinkedObject::Message(message.id.clone()))
            .tags(&["message"]),
    )
    .await;

    Ok(message)
}

async fn find_message(db: &DatabaseConnection, id: &str) -> Result<message::Model, ServiceError> {
    Message::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Message"))
}

/// Recipient only; reading twice keeps the first read timestamp.
pub async fn mark_read(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<message::Model, ServiceError> {
    let message = find_message(db, id).await?;
    if message.recipient_id != actor.user_id {
        return Err(ServiceError::forbidden("only the recipient can mark a message as read"));
    }
    if message.read_at.is_some() {
        return Ok(message);
    }

    let mut active: message::ActiveModel = message.into();
    active.status = Set(MessageStatus::Read.to_string());
    active.read_at = Set(Some(now_rfc3339()));
    Ok(active.update(db).await?)
}

pub async fn archive(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<message::Model, ServiceError> {
    let message = find_message(db, id).await?;
    if message.recipient_id != actor.user_id && message.sender_id != actor.user_id {
        return Err(ServiceError::forbidden("not a participant of this conversation"));
    }

    let mut active: message::ActiveModel = message.into();
    active.status = Set(MessageStatus::Archived.to_string());
    Ok(active.update(db).await?)
}

/// One line of the inbox
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub other_user_id: String,
    pub reservation_id: Option<String>,
    pub last_message: String,
    pub last_message_at: String,
    pub unread_count: u64,
}

/// Conversations of the actor, most recent first
pub async fn list_conversations(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<ConversationSummary>, ServiceError> {
    let messages = Message::find()
        .filter(
            Condition::any()
                .add(message::Column::SenderId.eq(actor.user_id.as_str()))
                .add(message::Column::RecipientId.eq(actor.user_id.as_str())),
        )
        .order_by_desc(message::Column::CreatedAt)
        .all(db)
        .await?;

    let mut order: Vec<String> = Vec::new();
    let mut summaries: HashMap<String, ConversationSummary> = HashMap::new();

    for m in messages {
        let unread = m.recipient_id == actor.user_id && m.read_at.is_none();
        match summaries.get_mut(&m.conversation_id) {
            Some(summary) => {
                if unread {
                    summary.unread_count += 1;
                }
            }
            None => {
                let other_user_id = if m.sender_id == actor.user_id {
                    m.recipient_id.clone()
                } else {
                    m.sender_id.clone()
                };
                order.push(m.conversation_id.clone());
                summaries.insert(
                    m.conversation_id.clone(),
                    ConversationSummary {
                        conversation_id: m.conversation_id,
                        other_user_id,
                        reservation_id: m.reservation_id,
                        last_message: preview(&m.content),
                        last_message_at: m.created_at,
                        unread_count: u64::from(unread),
                    },
                );
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| summaries.remove(&id))
        .collect())
}

/// Messages of one conversation, oldest first (participants only)
pub async fn conversation_messages(
    db: &DatabaseConnection,
    actor: &Actor,
    conversation_id: &str,
) -> Result<Vec<message::Model>, ServiceError> {
    let messages = Message::find()
        .filter(message::Column::ConversationId.eq(conversation_id))
        .order_by_asc(message::Column::CreatedAt)
        .all(db)
        .await?;

    if messages.is_empty() {
        return Err(ServiceError::not_found("Conversation"));
    }
    let participant = messages
        .iter()
        .any(|m| m.sender_id == actor.user_id || m.recipient_id == actor.user_id);
    if !participant && !actor.is_admin() {
        return Err(ServiceError::forbidden("not a participant of this conversation"));
    }

    Ok(messages)
}

pub async fn list_notifications(
    db: &DatabaseConnection,
    actor: &Actor,
    params: PageParams,
) -> Result<Page<notification::Model>, ServiceError> {
    let paginator = Notification::find()
        .filter(notification::Column::UserId.eq(actor.user_id.as_str()))
        .order_by_desc(notification::Column::CreatedAt)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(results, count, params))
}

pub async fn mark_notification_read(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<notification::Model, ServiceError> {
    let notification = Notification::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Notification"))?;

    if notification.user_id != actor.user_id {
        return Err(ServiceError::forbidden("not your notification"));
    }
    if notification.read_at.is_some() {
        return Ok(notification);
    }

    let mut active: notification::ActiveModel = notification.into();
    active.status = Set(NotificationStatus::Read.to_string());
    active.read_at = Set(Some(now_rfc3339()));
    Ok(active.update(db).await?)
}

pub async fn unread_count(db: &DatabaseConnection, actor: &Actor) -> Result<u64, ServiceError> {
    Ok(Notification::find()
        .filter(notification::Column::UserId.eq(actor.user_id.as_str()))
        .filter(notification::Column::Status.eq(NotificationStatus::Unread.as_str()))
        .count(db)
        .await?)
}
