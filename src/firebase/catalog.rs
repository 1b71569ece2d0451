use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::api::{LineItem, MAX_RUPEES};
use crate::config::{base_url, CatalogConfig};
use crate::error::{AppError, Result};

/// Read-only view of the product catalog kept in the document store.
pub struct CatalogStore {
    http: Client,
    base: Url,
    project_id: String,
    collection: String,
    price_field: String,
    access_token: Option<String>,
}

impl CatalogStore {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::new(),
            base: base_url(&config.base_url)?,
            project_id: config.project_id.clone(),
            collection: config.collection.clone(),
            price_field: config.price_field.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Unit price of one catalog item, in paise.
    pub async fn price_of(&self, item_id: &str) -> Result<u64> {
        if !is_document_id(item_id) {
            return Err(AppError::BadRequest(format!("Invalid item id: {item_id:?}")));
        }

        let path = format!(
            "v1/projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, self.collection, item_id
        );
        let url = self
            .base
            .join(&path)
            .map_err(|e| AppError::Internal(format!("Bad catalog URL: {e}")))?;

        let mut req = self
            .http
            .get(url)
            .timeout(std::time::Duration::from_secs(10));
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!("Item not found: {item_id}")));
            }
            status if !status.is_success() => {
                return Err(AppError::Upstream(format!(
                    "Catalog lookup for {item_id} failed: {status}"
                )));
            }
            _ => {}
        }

        let doc: Value = resp.json().await?;
        parse_price(&doc, &self.price_field)
            .ok_or_else(|| AppError::BadRequest(format!("Item {item_id} has no valid price")))
    }

    /// Sum `price * quantity` over the items, fetching each price in turn.
    pub async fn total(&self, items: &[LineItem]) -> Result<u64> {
        if items.is_empty() {
            return Err(AppError::BadRequest("No items".into()));
        }

        let mut total: u64 = 0;
        for item in items {
            if item.quantity == 0 {
                return Err(AppError::BadRequest(format!(
                    "Quantity for {} must be at least 1",
                    item.id
                )));
            }
            let unit = self.price_of(&item.id).await?;
            total = unit
                .checked_mul(u64::from(item.quantity))
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| AppError::BadRequest("Order total too large".into()))?;
            tracing::debug!(item = %item.id, unit, quantity = item.quantity, "Priced line item");
        }

        Ok(total)
    }
}

fn is_document_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(|c: char| matches!(c, '/' | '?' | '#' | '%') || c.is_control())
}

/// Read a rupee price from a typed document field and convert it to paise.
/// Integer fields arrive as decimal strings, doubles as JSON numbers. Prices
/// above `MAX_RUPEES` are rejected rather than saturated.
fn parse_price(doc: &Value, field: &str) -> Option<u64> {
    let value = &doc["fields"][field];

    let integer = match &value["integerValue"] {
        Value::String(raw) => Some(raw.parse::<u64>().ok()?),
        Value::Number(n) => Some(n.as_u64()?),
        _ => None,
    };

    if let Some(rupees) = integer {
        if rupees as f64 > MAX_RUPEES {
            return None;
        }
        return rupees.checked_mul(100);
    }

    let rupees = value["doubleValue"].as_f64()?;
    if !rupees.is_finite() || rupees < 0.0 || rupees > MAX_RUPEES {
        return None;
    }
    Some((rupees * 100.0).round() as u64)
}
