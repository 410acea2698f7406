use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An exact decimal amount in a currency.
///
/// Amounts serialize as strings (`"100.01"`) so no JSON number ever passes
/// through `f64` on the way in or out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    /// ISO 4217 code, upper case.
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl AsRef<str>) -> Self {
        Self {
            amount,
            currency: normalize_currency(currency.as_ref()),
        }
    }

    /// `true` if this amount is in `currency` (case-insensitive).
    pub fn is_in(&self, currency: &str) -> bool {
        normalize_currency(&self.currency) == normalize_currency(currency)
    }
}

fn normalize_currency(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
