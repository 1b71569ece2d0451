use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::config::{base_url, RazorpayConfig};
use crate::error::{AppError, Result};
use crate::payment::signature::verify_payment_signature;

pub struct RazorpayClient {
    http: Client,
    base: Url,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::new(),
            base: base_url(&config.api_base)?,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    /// Create a gateway order. The order object is returned as the gateway sent it.
    pub async fn create_order(
        &self,
        amount_paise: u64,
        currency: &str,
        receipt: Option<&str>,
        notes: Option<&Value>,
    ) -> Result<Value> {
        let mut body = json!({
            "amount": amount_paise,
            "currency": currency,
        });
        if let Some(receipt) = receipt {
            body["receipt"] = json!(receipt);
        }
        if let Some(notes) = notes {
            body["notes"] = notes.clone();
        }

        self.post("v1/orders", &body).await
    }

    /// Refund a captured payment; `None` refunds the full amount.
    pub async fn refund(
        &self,
        payment_id: &str,
        amount_paise: Option<u64>,
        notes: Option<&Value>,
    ) -> Result<Value> {
        if !is_gateway_id(payment_id) {
            return Err(AppError::BadRequest("Invalid payment id".into()));
        }

        let mut body = json!({});
        if let Some(amount) = amount_paise {
            body["amount"] = json!(amount);
        }
        if let Some(notes) = notes {
            body["notes"] = notes.clone();
        }

        self.post(&format!("v1/payments/{payment_id}/refund"), &body)
            .await
    }

    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self
            .base
            .join(path)
            .map_err(|e| AppError::Internal(format!("Bad gateway URL: {e}")))?;

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await?;

        let status = resp.status();
        let payload: Value = resp.json().await?;

        if !status.is_success() {
            let description = error_description(&payload);
            tracing::warn!(%status, path, %description, "Razorpay request rejected");
            return Err(AppError::Upstream(format!("Razorpay {status}: {description}")));
        }

        Ok(payload)
    }
}

/// Gateway ids look like `pay_29QQoUBi66xm2f`.
fn is_gateway_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn error_description(payload: &Value) -> String {
    payload["error"]["description"]
        .as_str()
        .unwrap_or("no description")
        .to_string()
}
