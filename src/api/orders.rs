use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Largest rupee amount accepted from clients or the catalog. Larger amounts are
/// rejected before the float -> paise conversion loses precision.
pub const MAX_RUPEES: f64 = 1e12;

// ==================== create-order ====================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Order amount in rupees; ignored when `items` is non-empty
    pub amount: Option<f64>,
    /// Catalog items priced server-side
    pub items: Option<Vec<LineItem>>,
    /// ISO currency code, defaults to the configured currency
    pub currency: Option<String>,
    pub receipt: Option<String>,
    pub notes: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    /// Catalog document id
    pub id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Convert a client-supplied rupee amount to paise. `None` for missing,
/// non-positive, non-finite or absurdly large amounts.
pub fn rupees_to_paise(amount: Option<f64>) -> Option<u64> {
    let amount = amount?;
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_RUPEES {
        return None;
    }
    let paise = (amount * 100.0).round() as u64;
    (paise > 0).then_some(paise)
}

/// Normalize an ISO 4217 code, falling back to `default` when absent.
pub fn resolve_currency(requested: Option<&str>, default: &str) -> Result<String> {
    let code = requested.unwrap_or(default).trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::BadRequest(format!("Invalid currency: {code}")));
    }
    Ok(code)
}
