//! Payment notification emails sent through a transactional-email HTTP API.

use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::config::MailConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailOutcome {
    Sent,
    /// Mail is switched off or has no API key; nothing was sent
    Disabled,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
    html: String,
}

pub struct Mailer {
    http: Client,
    enabled: bool,
    api_url: Url,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| anyhow::anyhow!("Invalid mail.api_url {}: {e}", config.api_url))?;
        Ok(Self {
            http: Client::new(),
            enabled: config.enabled,
            api_url,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }

    pub async fn send_payment_success(
        &self,
        to: &str,
        order_id: &str,
        payment_id: &str,
    ) -> Result<MailOutcome> {
        let api_key = match (self.enabled, self.api_key.as_deref()) {
            (true, Some(key)) => key,
            (true, None) => {
                tracing::warn!(to, "Mail enabled but no API key configured, skipping");
                return Ok(MailOutcome::Disabled);
            }
            (false, _) => {
                tracing::debug!(to, order_id, "Mail disabled, skipping payment notification");
                return Ok(MailOutcome::Disabled);
            }
        };

        let request = payment_success_email(&self.from, to, order_id, payment_id);

        let resp = self
            .http
            .post(self.api_url.clone())
            .bearer_auth(api_key)
            .json(&request)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Mail API {status}: {body}")));
        }

        tracing::info!(to, order_id, payment_id, "Payment notification sent");
        Ok(MailOutcome::Sent)
    }
}

fn payment_success_email<'a>(
    from: &'a str,
    to: &'a str,
    order_id: &str,
    payment_id: &str,
) -> SendEmailRequest<'a> {
    let subject = format!("Payment received for order {order_id}");
    let (order_html, payment_html) = (escape_html(order_id), escape_html(payment_id));
    let text = format!(
        "Your payment was successful.\n\nOrder: {order_id}\nPayment: {payment_id}\n\nThank you for your purchase."
    );
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Payment successful</h2>
<p>Order: <code>{order_html}</code></p>
<p>Payment: <code>{payment_html}</code></p>
<p style="color: #666;">Thank you for your purchase.</p>
</body>
</html>"#
    );

    SendEmailRequest {
        from,
        to: vec![to],
        subject,
        text,
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
