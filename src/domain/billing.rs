//! Invoice numbering, VAT split and payment states

use rust_decimal::Decimal;

use super::{money, DomainError};

pub const INVOICE_PREFIX: &str = "FAC";
pub const DEFAULT_TAX_RATE: f64 = 20.0;

string_enum! {
    pub enum InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

string_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Failed => "failed",
        Refunded => "refunded",
        Cancelled => "cancelled",
    }
}

string_enum! {
    pub enum PaymentMethod {
        Card => "card",
        Transfer => "transfer",
        Paypal => "paypal",
        Stripe => "stripe",
        Cash => "cash",
    }
}

/// `FAC-2025-00001`
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("{}-{}-{:05}", INVOICE_PREFIX, year, sequence)
}

/// Gross amount split into net and VAT at a given rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxBreakdown {
    pub gross: Decimal,
    pub net: Decimal,
    pub tax: Decimal,
    pub rate: Decimal,
}

impl TaxBreakdown {
    pub fn gross_f64(&self) -> f64 {
        money::to_f64(self.gross)
    }

    pub fn net_f64(&self) -> f64 {
        money::to_f64(self.net)
    }

    pub fn tax_f64(&self) -> f64 {
        money::to_f64(self.tax)
    }

    pub fn rate_f64(&self) -> f64 {
        money::to_f64(self.rate)
    }
}

/// net = gross / (1 + rate/100), tax = gross - net.
///
/// The net amount is rounded to cents first so that `net + tax == gross`.
pub fn split_gross(gross: f64, rate_percent: f64) -> Result<TaxBreakdown, DomainError> {
    let gross = money::ensure_non_negative(gross, "amount")?;
    let rate = money::ensure_non_negative(rate_percent, "tax rate")?;

    let divisor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    let net = money::round_cents(gross / divisor);
    let tax = gross - net;

    Ok(TaxBreakdown {
        gross,
        net,
        tax,
        rate,
    })
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Failed) | (Pending, Cancelled) | (Confirmed, Refunded)
        )
    }
}

impl InvoiceStatus {
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;

        match (self, next) {
            (Draft, Sent) | (Sent, Overdue) => true,
            (Draft | Sent | Overdue, Paid) => true,
            (Draft | Sent | Overdue, Cancelled) => true,
            _ => false,
        }
    }

    /// Statuses for which a past due date means the invoice is late.
    pub fn awaits_payment(self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_format() {
        assert_eq!(format_invoice_number(2025, 1), "FAC-2025-00001");
        assert_eq!(format_invoice_number(2025, 123456), "FAC-2025-123456");
    }

    #[test]
    fn vat_split_of_a_round_amount() {
        let t = split_gross(120.0, 20.0).unwrap();
        assert_eq!(t.net_f64(), 100.0);
        assert_eq!(t.tax_f64(), 20.0);
        assert_eq!(t.gross_f64(), 120.0);
    }

    #[test]
    fn vat_split_keeps_gross_intact() {
        let t = split_gross(99.99, 5.5).unwrap();
        // 99.99 / 1.055 = 94.777...
        assert_eq!(t.net_f64(), 94.78);
        assert_eq!(t.tax_f64(), 5.21);
        assert_eq!(t.net + t.tax, t.gross);
    }

    #[test]
    fn zero_rate_means_no_tax() {
        let t = split_gross(50.0, 0.0).unwrap();
        assert_eq!(t.net_f64(), 50.0);
        assert_eq!(t.tax_f64(), 0.0);
    }

    #[test]
    fn negative_inputs_fail_validation() {
        assert!(matches!(split_gross(-1.0, 20.0), Err(DomainError::Validation(_))));
        assert!(matches!(split_gross(10.0, -5.0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn oversized_gross_fails_validation() {
        assert!(matches!(split_gross(1.0e17, 20.0), Err(DomainError::Validation(_))));
        let t = split_gross(99_999_999.99, 20.0).unwrap();
        assert_eq!(t.gross_f64(), 99_999_999.99);
        assert_eq!(t.net + t.tax, t.gross);
    }

    #[test]
    fn payment_state_edges() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Confirmed));
        assert!(PaymentStatus::Confirmed.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Confirmed));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn invoice_state_edges() {
        assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Sent));
        assert!(InvoiceStatus::Overdue.awaits_payment());
    }
}
