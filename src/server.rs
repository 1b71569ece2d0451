use std::sync::Arc;

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use serde_json::Value;

use crate::api::*;
use crate::auth::{identify_caller, require_user, AuthUser, Caller};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::firebase::{CatalogStore, IdentityClient};
use crate::mailer::Mailer;
use crate::payment::RazorpayClient;

pub struct AppState {
    pub config: Arc<Config>,
    pub razorpay: RazorpayClient,
    pub catalog: CatalogStore,
    pub identity: IdentityClient,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let razorpay = RazorpayClient::new(&config.razorpay)?;
        let catalog = CatalogStore::new(&config.catalog)?;
        let identity = IdentityClient::new(&config.identity)?;
        let mailer = Arc::new(Mailer::new(&config.mail)?);

        if !config.mail.enabled {
            tracing::info!("Mail disabled, payment notifications will only be logged");
        }

        Ok(Self {
            config: Arc::new(config),
            razorpay,
            catalog,
            identity,
            mailer,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let signed_in = Router::new()
        .route("/create-order", post(create_order))
        .route("/refund", post(refund))
        .route("/make-admin/{uid}", get(make_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let open = Router::new()
        .route("/verify-payment", post(verify_payment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identify_caller,
        ));

    Router::new()
        .route("/", get(health))
        .merge(signed_in)
        .merge(open)
        .with_state(state)
}

// ==================== Public ====================

async fn health() -> &'static str {
    "Backend is running"
}

async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Json<VerifyPaymentResponse> {
    let verified = state.razorpay.verify(
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    );

    if !verified {
        tracing::warn!(
            order_id = %req.razorpay_order_id,
            payment_id = %req.razorpay_payment_id,
            "Payment signature mismatch"
        );
        return Json(VerifyPaymentResponse {
            status: PaymentStatus::Failed,
        });
    }

    tracing::info!(
        order_id = %req.razorpay_order_id,
        payment_id = %req.razorpay_payment_id,
        "Payment verified"
    );

    if let Some(email) = caller.and_then(|user| user.email) {
        let mailer = state.mailer.clone();
        let order_id = req.razorpay_order_id;
        let payment_id = req.razorpay_payment_id;
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_payment_success(&email, &order_id, &payment_id)
                .await
            {
                tracing::warn!(%order_id, "Payment notification failed: {e}");
            }
        });
    }

    Json(VerifyPaymentResponse {
        status: PaymentStatus::Success,
    })
}

// ==================== Signed in ====================

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Value>> {
    let amount = match req.items.as_deref() {
        Some(items) if !items.is_empty() => state.catalog.total(items).await?,
        _ => rupees_to_paise(req.amount)
            .ok_or_else(|| AppError::BadRequest("Amount required".into()))?,
    };
    let currency = resolve_currency(req.currency.as_deref(), &state.config.razorpay.currency)?;

    let order = state
        .razorpay
        .create_order(amount, &currency, req.receipt.as_deref(), req.notes.as_ref())
        .await?;

    tracing::info!(
        uid = %user.uid,
        order_id = order["id"].as_str().unwrap_or_default(),
        amount,
        %currency,
        "Order created"
    );

    Ok(Json(order))
}

async fn refund(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<Value>> {
    user.require_admin()?;

    let amount = match req.amount {
        None => None,
        some => Some(
            rupees_to_paise(some)
                .ok_or_else(|| AppError::BadRequest("Invalid refund amount".into()))?,
        ),
    };

    let refund = state
        .razorpay
        .refund(&req.payment_id, amount, req.notes.as_ref())
        .await?;

    tracing::info!(
        uid = %user.uid,
        payment_id = %req.payment_id,
        refund_id = refund["id"].as_str().unwrap_or_default(),
        ?amount,
        "Refund issued"
    );

    Ok(Json(refund))
}

async fn make_admin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<MakeAdminResponse>> {
    user.require_admin()?;

    state.identity.set_admin_claim(&uid).await?;
    tracing::info!(granted_by = %user.uid, %uid, "Admin claim granted");

    Ok(Json(MakeAdminResponse {
        status: "success",
        uid,
    }))
}
