//! Service catalog rules

use super::{money, DomainError};

string_enum! {
    pub enum PricingType {
        Fixed => "fixed",
        Hourly => "hourly",
        Quote => "quote",
    }
}

/// The provider's custom price wins over the catalog base price.
pub fn effective_price(custom_price: Option<f64>, base_price: f64) -> f64 {
    custom_price.unwrap_or(base_price)
}

pub fn validate_price(price: f64, field: &str) -> Result<f64, DomainError> {
    money::ensure_non_negative(price, field).map(money::to_f64)
}

/// Lowercase ASCII slug; runs of other characters collapse to one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_price_overrides_base() {
        assert_eq!(effective_price(Some(45.0), 60.0), 45.0);
        assert_eq!(effective_price(None, 60.0), 60.0);
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Plumbing & Heating"), "plumbing-heating");
        assert_eq!(slugify("  Garden--Care "), "garden-care");
        assert_eq!(slugify("IT 2.0"), "it-2-0");
    }

    #[test]
    fn prices_must_be_positive_or_zero() {
        assert_eq!(validate_price(12.345, "base_price").unwrap(), 12.35);
        assert!(validate_price(-3.0, "base_price").is_err());
    }
}
