pub mod razorpay;
pub mod signature;

pub use razorpay::RazorpayClient;
pub use signature::{sign_payment, verify_payment_signature};
