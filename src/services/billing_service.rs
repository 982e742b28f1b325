//! Billing Service - payments and invoices
//!
//! Invoice numbers come from the `invoice_sequences` row of the issue year,
//! bumped atomically in the same transaction as the invoice insert.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use sea_orm::sea_query::{Query, SimpleExpr};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::account::{Actor, UserType};
use crate::domain::billing::{
    format_invoice_number, split_gross, InvoiceStatus, PaymentMethod, PaymentStatus,
};
use crate::domain::history::{HistoryAction, Importance, LinkedObject};
use crate::domain::messaging::NotificationType;
use crate::domain::money;
use crate::models::invoice::{self, Entity as Invoice};
use crate::models::payment::{self, Entity as Payment};
use crate::models::reservation::{self, Entity as Reservation};
use crate::services::history_service::{log_action, HistoryEntry};
use crate::services::messaging_service::{notify, NewNotification};
use crate::services::reservation_service::{find_reservation, is_party};
use crate::services::ServiceError;
use crate::utils::{new_id, now_rfc3339, time, Page, PageParams};

pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub reservation_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub reservation_id: Option<String>,
    pub user_id: Option<String>,
}

/// Reservations the actor may see billing for: own bookings, own jobs, or all
fn scope_to_reservations(actor: &Actor, column: impl ColumnTrait) -> Option<SimpleExpr> {
    let owner = match actor.role {
        UserType::Admin => return None,
        UserType::Client => reservation::Column::ClientId,
        UserType::Provider => reservation::Column::ProviderId,
    };
    Some(
        column.in_subquery(
            Query::select()
                .column(reservation::Column::Id)
                .from(Reservation)
                .and_where(owner.eq(actor.user_id.as_str()))
                .to_owned(),
        ),
    )
}

pub async fn create_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewPayment,
) -> Result<payment::Model, ServiceError> {
    let amount = money::ensure_non_negative(input.amount, "amount")?;
    let reservation = find_reservation(db, &input.reservation_id).await?;
    if !actor.is_or_admin(&reservation.client_id) {
        return Err(ServiceError::forbidden(
            "only the client of a reservation can pay for it",
        ));
    }

    let now = now_rfc3339();
    let payment = payment::ActiveModel {
        id: Set(new_id()),
        reservation_id: Set(reservation.id.clone()),
        user_id: Set(actor.user_id.clone()),
        amount: Set(money::to_f64(amount)),
        status: Set(PaymentStatus::Pending.to_string()),
        method: Set(input.method.to_string()),
        transaction_id: Set(input.transaction_id),
        paid_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(
        "Payment {} of {:.2} created for reservation {}",
        payment.id,
        payment.amount,
        payment.reservation_id
    );
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Payment, "Payment created")
            .by(actor.user_id.clone())
            .about(LinkedObject::Payment(payment.id.clone()))
            .context(json!({ "amount": payment.amount, "method": payment.method }))
            .tags(&["payment"]),
    )
    .await;

    Ok(payment)
}

async fn find_payment(db: &DatabaseConnection, id: &str) -> Result<payment::Model, ServiceError> {
    Payment::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Payment"))
}

pub async fn get_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<payment::Model, ServiceError> {
    let payment = find_payment(db, id).await?;
    let reservation = find_reservation(db, &payment.reservation_id).await?;
    if !actor.is_admin() && !is_party(actor, &reservation) {
        return Err(ServiceError::forbidden("not a party to this payment"));
    }
    Ok(payment)
}

/// Confirm, fail, cancel (from pending) or refund (from confirmed).
pub async fn update_payment_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    status: PaymentStatus,
) -> Result<payment::Model, ServiceError> {
    let payment = get_payment(db, actor, id).await?;
    let current: PaymentStatus = payment.status.parse()?;

    if !current.can_transition_to(status) {
        return Err(ServiceError::invalid(format!(
            "payment cannot move from '{}' to '{}'",
            current, status
        )));
    }

    let now = now_rfc3339();
    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(status.to_string());
    if status == PaymentStatus::Confirmed {
        active.paid_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Payment, format!("Payment {} -> {}", current, status))
            .by(actor.user_id.clone())
            .about(LinkedObject::Payment(updated.id.clone()))
            .importance(match status {
                PaymentStatus::Failed | PaymentStatus::Refunded => Importance::Warning,
                _ => Importance::Info,
            })
            .tags(&["payment", "status"]),
    )
    .await;

    Ok(updated)
}

pub async fn list_payments(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PaymentFilter,
    params: PageParams,
) -> Result<Page<payment::Model>, ServiceError> {
    let mut condition = Condition::all();
    if let Some(scope) = scope_to_reservations(actor, payment::Column::ReservationId) {
        condition = condition.add(scope);
    }
    if let Some(status) = filter.status {
        condition = condition.add(payment::Column::Status.eq(status.as_str()));
    }
    if let Some(reservation_id) = &filter.reservation_id {
        condition = condition.add(payment::Column::ReservationId.eq(reservation_id.as_str()));
    }
    if let Some(user_id) = &filter.user_id {
        condition = condition.add(payment::Column::UserId.eq(user_id.as_str()));
    }

    let paginator = Payment::find()
        .filter(condition)
        .order_by_desc(payment::Column::CreatedAt)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(results, count, params))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatistics {
    pub count: u64,
    pub total_amount: f64,
    pub confirmed_amount: f64,
    pub by_status: BTreeMap<String, u64>,
    pub methods: BTreeSet<String>,
}

pub async fn payment_statistics(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<PaymentStatistics, ServiceError> {
    let mut query = Payment::find();
    if let Some(scope) = scope_to_reservations(actor, payment::Column::ReservationId) {
        query = query.filter(scope);
    }
    let payments = query.all(db).await?;

    let mut total = rust_decimal::Decimal::ZERO;
    let mut confirmed = rust_decimal::Decimal::ZERO;
    let mut by_status = BTreeMap::new();
    let mut methods = BTreeSet::new();

    for p in &payments {
        let amount = money::to_decimal(p.amount)?;
        total += amount;
        if p.status == PaymentStatus::Confirmed.as_str() {
            confirmed += amount;
        }
        *by_status.entry(p.status.clone()).or_insert(0) += 1;
        methods.insert(p.method.clone());
    }

    Ok(PaymentStatistics {
        count: payments.len() as u64,
        total_amount: money::to_f64(total),
        confirmed_amount: money::to_f64(confirmed),
        by_status,
        methods,
    })
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub reservation_id: String,
    /// Defaults to the final (or estimated) price of the reservation
    pub gross_amount: Option<f64>,
    /// Percent, defaults to the configured rate
    pub tax_rate: Option<f64>,
    /// `YYYY-MM-DD`, defaults to 30 days after issue
    pub due_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    pub gross_amount: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub reservation_id: Option<String>,
}

/// Next `FAC-YYYY-NNNNN` for `year`.
///
/// The first call of a year seeds the counter from the invoices already
/// stored for that year.
pub async fn next_invoice_number<C: ConnectionTrait>(
    db: &C,
    year: i32,
) -> Result<String, ServiceError> {
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            r#"
            INSERT INTO invoice_sequences (year, last_value)
            VALUES (?, (SELECT COUNT(*) FROM invoices WHERE substr(issue_date, 1, 4) = ?) + 1)
            ON CONFLICT(year) DO UPDATE SET last_value = invoice_sequences.last_value + 1
            RETURNING last_value
            "#,
            [year.into(), format!("{:04}", year).into()],
        ))
        .await?
        .ok_or_else(|| ServiceError::Internal("invoice sequence returned no row".to_string()))?;

    let sequence: i64 = row.try_get("", "last_value")?;
    Ok(format_invoice_number(year, sequence))
}

fn can_bill(actor: &Actor, reservation: &reservation::Model) -> bool {
    actor.is_or_admin(&reservation.provider_id)
}

/// Issue today's invoice for a reservation.
pub async fn issue_invoice(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewInvoice,
    default_tax_rate: f64,
) -> Result<invoice::Model, ServiceError> {
    issue_invoice_on(db, actor, input, default_tax_rate, time::today()).await
}

/// Issue an invoice dated `issue_date`; its year selects the number sequence.
pub async fn issue_invoice_on(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewInvoice,
    default_tax_rate: f64,
    issue_date: NaiveDate,
) -> Result<invoice::Model, ServiceError> {
    let reservation = find_reservation(db, &input.reservation_id).await?;
    if !can_bill(actor, &reservation) {
        return Err(ServiceError::forbidden(
            "only the provider of a reservation can invoice it",
        ));
    }

    let gross = input
        .gross_amount
        .or(reservation.final_price)
        .or(reservation.estimated_price)
        .ok_or_else(|| ServiceError::invalid("gross_amount is required"))?;
    let breakdown = split_gross(gross, input.tax_rate.unwrap_or(default_tax_rate))?;

    let due_date = match &input.due_date {
        Some(raw) => time::parse_date(raw)?,
        None => issue_date + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
    };
    if due_date < issue_date {
        return Err(ServiceError::invalid("due_date cannot be before the issue date"));
    }

    let already = Invoice::find()
        .filter(invoice::Column::ReservationId.eq(reservation.id.as_str()))
        .count(db)
        .await?;
    if already > 0 {
        return Err(ServiceError::invalid("this reservation already has an invoice"));
    }

    let txn = db.begin().await?;

    let number = next_invoice_number(&txn, issue_date.year()).await?;
    let now = now_rfc3339();

    let inserted = invoice::ActiveModel {
        id: Set(new_id()),
        invoice_number: Set(number),
        reservation_id: Set(reservation.id.clone()),
        payment_id: Set(None),
        issue_date: Set(issue_date.format("%Y-%m-%d").to_string()),
        due_date: Set(due_date.format("%Y-%m-%d").to_string()),
        gross_amount: Set(breakdown.gross_f64()),
        net_amount: Set(breakdown.net_f64()),
        tax_amount: Set(breakdown.tax_f64()),
        tax_rate: Set(breakdown.rate_f64()),
        status: Set(InvoiceStatus::Draft.to_string()),
        description: Set(input.description),
        paid_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await;

    let invoice = match inserted {
        Ok(invoice) => invoice,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            txn.rollback().await?;
            return Err(ServiceError::invalid("this reservation already has an invoice"));
        }
        Err(e) => return Err(e.into()),
    };

    txn.commit().await?;

    tracing::info!(
        "Invoice {} issued for reservation {} (gross {:.2}, net {:.2}, tax {:.2})",
        invoice.invoice_number,
        invoice.reservation_id,
        invoice.gross_amount,
        invoice.net_amount,
        invoice.tax_amount
    );
    log_action(
        db,
        HistoryEntry::new(HistoryAction::Create, format!("Invoice {} issued", invoice.invoice_number))
            .by(actor.user_id.clone())
            .about(LinkedObject::Invoice(invoice.id.clone()))
            .context(json!({
                "gross_amount": invoice.gross_amount,
                "tax_rate": invoice.tax_rate,
            }))
            .tags(&["invoice"]),
    )
    .await;

    notify(
        db,
        NewNotification::new(
            &reservation.client_id,
            NotificationType::Payment,
            "New invoice",
            format!("Invoice {} is available", invoice.invoice_number),
        )
        .about(LinkedObject::Invoice(invoice.id.clone())),
    )
    .await;

    Ok(invoice)
}

async fn find_invoice(db: &DatabaseConnection, id: &str) -> Result<invoice::Model, ServiceError> {
    Invoice::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Invoice"))
}

pub async fn get_invoice(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<invoice::Model, ServiceError> {
    let invoice = find_invoice(db, id).await?;
    let reservation = find_reservation(db, &invoice.reservation_id).await?;
    if !actor.is_admin() && !is_party(actor, &reservation) {
        return Err(ServiceError::forbidden("not a party to this invoice"));
    }
    Ok(invoice)
}

/// Invoice the actor is allowed to change (provider of the reservation or admin)
async fn billable_invoice(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<invoice::Model, ServiceError> {
    let invoice = get_invoice(db, actor, id).await?;
    let reservation = find_reservation(db, &invoice.reservation_id).await?;
    if !can_bill(actor, &reservation) {
        return Err(ServiceError::forbidden(
            "only the provider of a reservation can change its invoice",
        ));
    }
    Ok(invoice)
}

async fn set_invoice_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    status: InvoiceStatus,
    payment_id: Option<String>,
) -> Result<invoice::Model, ServiceError> {
    let invoice = billable_invoice(db, actor, id).await?;
    let current: InvoiceStatus = invoice.status.parse()?;
    if !current.can_transition_to(status) {
        return Err(ServiceError::invalid(format!(
            "invoice cannot move from '{}' to '{}'",
            current, status
        )));
    }

    let now = now_rfc3339();
    let mut active: invoice::ActiveModel = invoice.into();
    active.status = Set(status.to_string());
    if status == InvoiceStatus::Paid {
        active.paid_at = Set(Some(now.clone()));
    }
    if let Some(payment_id) = payment_id {
        active.payment_id = Set(Some(payment_id));
    }
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    log_action(
        db,
        HistoryEntry::new(
            HistoryAction::Update,
            format!("Invoice {} {} -> {}", updated.invoice_number, current, status),
        )
        .by(actor.user_id.clone())
        .about(LinkedObject::Invoice(updated.id.clone()))
        .tags(&["invoice", "status"]),
    )
    .await;

    Ok(updated)
}

pub async fn mark_sent(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<invoice::Model, ServiceError> {
    set_invoice_status(db, actor, id, InvoiceStatus::Sent, None).await
}

pub async fn mark_paid(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    payment_id: Option<String>,
) -> Result<invoice::Model, ServiceError> {
    let invoice = billable_invoice(db, actor, id).await?;
    if let Some(payment_id) = &payment_id {
        check_payment_matches(db, &invoice, payment_id).await?;
    }
    set_invoice_status(db, actor, id, InvoiceStatus::Paid, payment_id).await
}

pub async fn cancel_invoice(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
) -> Result<invoice::Model, ServiceError> {
    set_invoice_status(db, actor, id, InvoiceStatus::Cancelled, None).await
}

async fn check_payment_matches(
    db: &DatabaseConnection,
    invoice: &invoice::Model,
    payment_id: &str,
) -> Result<(), ServiceError> {
    let payment = find_payment(db, payment_id).await?;
    if payment.reservation_id != invoice.reservation_id {
        return Err(ServiceError::invalid(
            "payment and invoice belong to different reservations",
        ));
    }
    Ok(())
}

pub async fn attach_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    payment_id: &str,
) -> Result<invoice::Model, ServiceError> {
    let invoice = billable_invoice(db, actor, id).await?;
    check_payment_matches(db, &invoice, payment_id).await?;

    let mut active: invoice::ActiveModel = invoice.into();
    active.payment_id = Set(Some(payment_id.to_string()));
    active.updated_at = Set(now_rfc3339());
    Ok(active.update(db).await?)
}

/// Change gross amount or description. Net and tax stay as issued.
pub async fn update_invoice(
    db: &DatabaseConnection,
    actor: &Actor,
    id: &str,
    input: UpdateInvoice,
) -> Result<invoice::Model, ServiceError> {
    let invoice = billable_invoice(db, actor, id).await?;
    let status: InvoiceStatus = invoice.status.parse()?;
    if matches!(status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Err(ServiceError::invalid(format!(
            "a {} invoice cannot be edited",
            status
        )));
    }

    let before = json!({ "gross_amount": invoice.gross_amount });
    let mut active: invoice::ActiveModel = invoice.into();
    if let Some(gross) = input.gross_amount {
        let gross = money::ensure_non_negative(gross, "gross_amount")?;
        active.gross_amount = Set(money::to_f64(gross));
    }
    if let Some(description) = input.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(now_rfc3339());
    let updated = active.update(db).await?;

    log_action(
        db,
        HistoryEntry::new(HistoryAction::Update, format!("Invoice {} edited", updated.invoice_number))
            .by(actor.user_id.clone())
            .about(LinkedObject::Invoice(updated.id.clone()))
            .change(Some(before), Some(json!({ "gross_amount": updated.gross_amount })))
            .tags(&["invoice"]),
    )
    .await;

    Ok(updated)
}

pub async fn list_invoices(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: InvoiceFilter,
    params: PageParams,
) -> Result<Page<invoice::Model>, ServiceError> {
    let mut condition = Condition::all();
    if let Some(scope) = scope_to_reservations(actor, invoice::Column::ReservationId) {
        condition = condition.add(scope);
    }
    if let Some(status) = filter.status {
        condition = condition.add(invoice::Column::Status.eq(status.as_str()));
    }
    if let Some(reservation_id) = &filter.reservation_id {
        condition = condition.add(invoice::Column::ReservationId.eq(reservation_id.as_str()));
    }

    let paginator = Invoice::find()
        .filter(condition)
        .order_by_desc(invoice::Column::IssueDate)
        .order_by_desc(invoice::Column::CreatedAt)
        .paginate(db, params.page_size());

    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.index()).await?;

    Ok(Page::new(results, count, params))
}

/// Sent or overdue invoices whose due date has passed
pub async fn overdue_invoices(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<invoice::Model>, ServiceError> {
    let today = time::today().format("%Y-%m-%d").to_string();
    let awaiting: Vec<&str> = InvoiceStatus::ALL
        .iter()
        .filter(|s| s.awaits_payment())
        .map(|s| s.as_str())
        .collect();

    let mut query = Invoice::find()
        .filter(invoice::Column::DueDate.lt(today))
        .filter(invoice::Column::Status.is_in(awaiting));
    if let Some(scope) = scope_to_reservations(actor, invoice::Column::ReservationId) {
        query = query.filter(scope);
    }

    Ok(query
        .order_by_asc(invoice::Column::DueDate)
        .all(db)
        .await?)
}
