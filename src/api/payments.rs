use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==================== verify-payment ====================

/// Fields posted back by the checkout widget after payment.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: PaymentStatus,
}

// ==================== refund ====================

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub payment_id: String,
    /// Partial refund in rupees; omitted for a full refund
    pub amount: Option<f64>,
    pub notes: Option<Value>,
}
