mod common;

use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use tabali::domain::account::UserType;
use tabali::domain::billing::{PaymentMethod, PaymentStatus};
use tabali::domain::DomainError;
use tabali::services::billing_service::{self, NewInvoice, NewPayment, UpdateInvoice};
use tabali::utils::new_id;

use common::{book, completed_reservation, create_actor, setup, setup_on_file};

const RATE: f64 = 20.0;

fn march_2025() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn invoice_for(reservation_id: &str) -> NewInvoice {
    NewInvoice {
        reservation_id: reservation_id.to_string(),
        gross_amount: None,
        tax_rate: None,
        due_date: None,
        description: None,
    }
}

#[tokio::test]
async fn first_invoice_of_the_year_is_numbered_one() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;

    let invoice = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        invoice_for(&r.id),
        RATE,
        march_2025(),
    )
    .await
    .unwrap();

    assert_eq!(invoice.invoice_number, "FAC-2025-00001");
    assert_eq!(invoice.gross_amount, 120.0);
    assert_eq!(invoice.net_amount, 100.0);
    assert_eq!(invoice.tax_amount, 20.0);
    assert_eq!(invoice.tax_rate, 20.0);
    assert_eq!(invoice.status, "draft");
    assert_eq!(invoice.issue_date, "2025-03-10");
    assert_eq!(invoice.due_date, "2025-04-09");
}

#[tokio::test]
async fn numbers_follow_each_other_within_a_year() {
    let fx = setup().await;
    let mut numbers = Vec::new();
    for _ in 0..3 {
        let r = completed_reservation(&fx).await;
        let invoice = billing_service::issue_invoice_on(
            &fx.db,
            &fx.provider,
            invoice_for(&r.id),
            RATE,
            march_2025(),
        )
        .await
        .unwrap();
        numbers.push(invoice.invoice_number);
    }
    assert_eq!(
        numbers,
        vec!["FAC-2025-00001", "FAC-2025-00002", "FAC-2025-00003"]
    );

    let r = completed_reservation(&fx).await;
    let next_year = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        invoice_for(&r.id),
        RATE,
        NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(next_year.invoice_number, "FAC-2026-00001");
}

#[tokio::test]
async fn explicit_amount_and_rate_are_split() {
    let fx = setup().await;
    let r = book(&fx).await;

    let invoice = billing_service::issue_invoice_on(
        &fx.db,
        &fx.admin,
        NewInvoice {
            gross_amount: Some(99.99),
            tax_rate: Some(5.5),
            due_date: Some("2025-03-31".to_string()),
            ..invoice_for(&r.id)
        },
        RATE,
        march_2025(),
    )
    .await
    .unwrap();

    assert_eq!(invoice.net_amount, 94.78);
    assert_eq!(invoice.tax_amount, 5.21);
    assert_eq!(invoice.tax_rate, 5.5);
    assert_eq!(invoice.due_date, "2025-03-31");
}

#[tokio::test]
async fn a_reservation_is_invoiced_once_and_by_its_provider() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;

    let by_client = billing_service::issue_invoice_on(
        &fx.db,
        &fx.client,
        invoice_for(&r.id),
        RATE,
        march_2025(),
    )
    .await;
    assert!(matches!(by_client, Err(DomainError::Permission(_))));

    billing_service::issue_invoice_on(&fx.db, &fx.provider, invoice_for(&r.id), RATE, march_2025())
        .await
        .unwrap();
    let again = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        invoice_for(&r.id),
        RATE,
        march_2025(),
    )
    .await;
    assert!(matches!(again, Err(DomainError::Validation(_))));

    // A rejected request does not burn a number
    let other = completed_reservation(&fx).await;
    let next = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        invoice_for(&other.id),
        RATE,
        march_2025(),
    )
    .await
    .unwrap();
    assert_eq!(next.invoice_number, "FAC-2025-00002");
}

#[tokio::test]
async fn invalid_amounts_and_dates_are_rejected() {
    let fx = setup().await;
    let r = book(&fx).await;

    let negative = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        NewInvoice {
            gross_amount: Some(-5.0),
            ..invoice_for(&r.id)
        },
        RATE,
        march_2025(),
    )
    .await;
    assert!(matches!(negative, Err(DomainError::Validation(_))));

    let backwards = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        NewInvoice {
            due_date: Some("2025-01-01".to_string()),
            ..invoice_for(&r.id)
        },
        RATE,
        march_2025(),
    )
    .await;
    assert!(matches!(backwards, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn invoice_status_follows_its_lifecycle() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;
    let invoice = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        invoice_for(&r.id),
        RATE,
        march_2025(),
    )
    .await
    .unwrap();

    let edited = billing_service::update_invoice(
        &fx.db,
        &fx.provider,
        &invoice.id,
        UpdateInvoice {
            gross_amount: Some(150.0),
            description: Some("Extra hour".to_string()),
        },
    )
    .await
    .unwrap();
    // Net and tax keep their issued values
    assert_eq!(edited.gross_amount, 150.0);
    assert_eq!(edited.net_amount, 100.0);
    assert_eq!(edited.tax_amount, 20.0);

    let sent = billing_service::mark_sent(&fx.db, &fx.provider, &invoice.id)
        .await
        .unwrap();
    assert_eq!(sent.status, "sent");

    let payment = billing_service::create_payment(
        &fx.db,
        &fx.client,
        NewPayment {
            reservation_id: r.id.clone(),
            amount: 150.0,
            method: PaymentMethod::Card,
            transaction_id: Some("tx-1".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(payment.status, "pending");

    let confirmed =
        billing_service::update_payment_status(&fx.db, &fx.client, &payment.id, PaymentStatus::Confirmed)
            .await
            .unwrap();
    assert!(confirmed.paid_at.is_some());

    let paid = billing_service::mark_paid(&fx.db, &fx.provider, &invoice.id, Some(payment.id.clone()))
        .await
        .unwrap();
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.payment_id.as_deref(), Some(payment.id.as_str()));
    assert!(paid.paid_at.is_some());

    let cancel = billing_service::cancel_invoice(&fx.db, &fx.provider, &invoice.id).await;
    assert!(matches!(cancel, Err(DomainError::Validation(_))));

    let confirm_twice = billing_service::update_payment_status(
        &fx.db,
        &fx.client,
        &payment.id,
        PaymentStatus::Confirmed,
    )
    .await;
    assert!(matches!(confirm_twice, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn counter_continues_after_existing_invoices() {
    let fx = setup().await;
    let issued_2024 = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
    for _ in 0..2 {
        let r = completed_reservation(&fx).await;
        billing_service::issue_invoice_on(&fx.db, &fx.provider, invoice_for(&r.id), RATE, issued_2024)
            .await
            .unwrap();
    }

    // Invoices stored without a counter row, e.g. restored from a backup
    fx.db
        .execute_unprepared("DELETE FROM invoice_sequences")
        .await
        .unwrap();

    let next = billing_service::next_invoice_number(&fx.db, 2024).await.unwrap();
    assert_eq!(next, "FAC-2024-00003");
    let after = billing_service::next_invoice_number(&fx.db, 2024).await.unwrap();
    assert_eq!(after, "FAC-2024-00004");

    // Other years are not affected by the 2024 rows
    let other = billing_service::next_invoice_number(&fx.db, 2023).await.unwrap();
    assert_eq!(other, "FAC-2023-00001");
}

#[tokio::test]
async fn oversized_amount_is_rejected_without_storing_anything() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;

    let huge = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        NewInvoice {
            gross_amount: Some(1.0e17),
            ..invoice_for(&r.id)
        },
        RATE,
        march_2025(),
    )
    .await;
    assert!(matches!(huge, Err(DomainError::Validation(_))));

    let invoice = billing_service::issue_invoice_on(
        &fx.db,
        &fx.provider,
        NewInvoice {
            gross_amount: Some(99_999_999.99),
            ..invoice_for(&r.id)
        },
        RATE,
        march_2025(),
    )
    .await
    .unwrap();
    assert_eq!(invoice.invoice_number, "FAC-2025-00001");
    assert_eq!(invoice.gross_amount, 99_999_999.99);
    assert_eq!(invoice.net_amount, 83_333_333.33);
    assert_eq!(invoice.tax_amount, 16_666_666.66);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_never_reuses_a_number() {
    let path = std::env::temp_dir().join(format!("tabali-invoices-{}.db", new_id()));
    let fx = setup_on_file(&path).await;

    let mut reservations = Vec::new();
    for _ in 0..20 {
        reservations.push(completed_reservation(&fx).await);
    }

    let handles: Vec<_> = reservations
        .into_iter()
        .map(|r| {
            let db = fx.db.clone();
            let provider = fx.provider.clone();
            tokio::spawn(async move {
                billing_service::issue_invoice_on(&db, &provider, invoice_for(&r.id), RATE, march_2025())
                    .await
            })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        let invoice = handle.await.unwrap().unwrap();
        numbers.push(invoice.invoice_number);
    }
    numbers.sort();

    let expected: Vec<String> = (1..=20).map(|n| format!("FAC-2025-{:05}", n)).collect();
    assert_eq!(numbers, expected);

    drop(fx);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

#[tokio::test]
async fn newest_invoice_is_listed_first_past_five_digits() {
    let fx = setup().await;
    fx.db
        .execute_unprepared("INSERT INTO invoice_sequences (year, last_value) VALUES (2025, 99998)")
        .await
        .unwrap();

    let mut issued = Vec::new();
    for day in [10, 11] {
        let r = completed_reservation(&fx).await;
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let invoice =
            billing_service::issue_invoice_on(&fx.db, &fx.provider, invoice_for(&r.id), RATE, date)
                .await
                .unwrap();
        issued.push(invoice.invoice_number);
    }
    assert_eq!(issued, ["FAC-2025-99999", "FAC-2025-100000"]);

    let page = billing_service::list_invoices(&fx.db, &fx.provider, Default::default(), Default::default())
        .await
        .unwrap();
    let listed: Vec<&str> = page.results.iter().map(|i| i.invoice_number.as_str()).collect();
    assert_eq!(listed, ["FAC-2025-100000", "FAC-2025-99999"]);
}

#[tokio::test]
async fn outsiders_cannot_probe_payments_through_an_invoice() {
    let fx = setup().await;
    let r = completed_reservation(&fx).await;
    let invoice =
        billing_service::issue_invoice_on(&fx.db, &fx.provider, invoice_for(&r.id), RATE, march_2025())
            .await
            .unwrap();
    let stranger = create_actor(&fx.db, "stranger@test.local", UserType::Client).await;

    let result = billing_service::mark_paid(
        &fx.db,
        &stranger,
        &invoice.id,
        Some("no-such-payment".to_string()),
    )
    .await;
    assert!(matches!(result, Err(DomainError::Permission(_))));

    // The client may read the invoice but still not settle it
    let result = billing_service::mark_paid(
        &fx.db,
        &fx.client,
        &invoice.id,
        Some("no-such-payment".to_string()),
    )
    .await;
    assert!(matches!(result, Err(DomainError::Permission(_))));

    let result =
        billing_service::mark_paid(&fx.db, &fx.provider, &invoice.id, Some("no-such-payment".to_string()))
            .await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}
