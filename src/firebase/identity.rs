use std::collections::HashSet;

use base64::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::auth::AuthUser;
use crate::config::{base_url, IdentityConfig};
use crate::error::{AppError, Result};

const ADMIN_CLAIMS: &str = r#"{"admin":true}"#;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    disabled: bool,
    /// JSON object serialized as a string
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    exp: Option<i64>,
}

pub struct IdentityClient {
    http: Client,
    base: Url,
    api_key: String,
    access_token: Option<String>,
    bootstrap_admins: HashSet<String>,
}

impl IdentityClient {
    pub fn new(config: &IdentityConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: Client::new(),
            base: base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
            bootstrap_admins: config.bootstrap_admins.iter().cloned().collect(),
        })
    }

    /// Resolve an ID token to the account it was issued for.
    pub async fn verify_token(&self, id_token: &str) -> Result<AuthUser> {
        precheck_token(id_token, chrono::Utc::now().timestamp())?;

        let mut url = self.endpoint("v1/accounts:lookup")?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let resp = self
            .http
            .post(url)
            .json(&json!({ "idToken": id_token }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        if status.is_client_error() {
            let body: Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["message"].as_str().unwrap_or_default();
            if is_token_error(message) {
                tracing::debug!(%status, message, "Identity provider rejected token");
            } else {
                // usually a bad or restricted API key, so every caller is turned away
                tracing::warn!(%status, message, "Account lookup failed, check identity config");
            }
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!("Account lookup failed: {status}")));
        }

        let lookup: LookupResponse = resp.json().await?;
        let account = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AppError::Unauthorized)?;

        if account.disabled {
            tracing::info!(uid = %account.local_id, "Rejected token for disabled account");
            return Err(AppError::Unauthorized);
        }

        let admin = has_admin_claim(account.custom_attributes.as_deref())
            || self.bootstrap_admins.contains(&account.local_id);

        Ok(AuthUser {
            uid: account.local_id,
            email: account.email,
            admin,
        })
    }

    /// Replace the account's custom claims with `{"admin": true}`.
    pub async fn set_admin_claim(&self, uid: &str) -> Result<()> {
        let token = self.access_token.as_deref().ok_or_else(|| {
            AppError::Internal("identity.access_token is not configured".into())
        })?;

        let url = self.endpoint("v1/accounts:update")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "localId": uid, "customAttributes": ADMIN_CLAIMS }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body: Value = resp.json().await.unwrap_or_default();
        let message = body["error"]["message"].as_str().unwrap_or_default();
        if message.starts_with("USER_NOT_FOUND") {
            return Err(AppError::NotFound(format!("User not found: {uid}")));
        }
        Err(AppError::Upstream(format!(
            "Account update failed: {status} {message}"
        )))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::Internal(format!("Bad identity URL: {e}")))
    }
}

/// Cheap local rejection of tokens that cannot be valid: not a three-part JWT,
/// undecodable payload, or an `exp` already in the past. The signature is
/// checked by the identity provider, not here.
fn precheck_token(token: &str, now: i64) -> Result<()> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AppError::Unauthorized)?;
    let claims: UnverifiedClaims =
        serde_json::from_slice(&bytes).map_err(|_| AppError::Unauthorized)?;

    match claims.exp {
        Some(exp) if exp <= now => Err(AppError::Unauthorized),
        _ => Ok(()),
    }
}

/// Lookup errors that describe the caller's token rather than our own setup.
fn is_token_error(message: &str) -> bool {
    ["INVALID_ID_TOKEN", "TOKEN_EXPIRED", "USER_NOT_FOUND", "USER_DISABLED"]
        .iter()
        .any(|code| message.starts_with(code))
}

fn has_admin_claim(custom_attributes: Option<&str>) -> bool {
    custom_attributes
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|claims| claims["admin"].as_bool())
        .unwrap_or(false)
}
