use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn payment_mac(secret: &str, order_id: &str, payment_id: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// Hex-encoded HMAC-SHA256 of `order_id|payment_id`, as the gateway signs checkout callbacks.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> String {
    hex::encode(payment_mac(secret, order_id, payment_id).finalize().into_bytes())
}

/// Check a checkout callback signature. Anything other than the exact
/// 64-character lowercase hex digest is a mismatch.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    if !is_lowercase_digest(signature) {
        return false;
    }
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    payment_mac(secret, order_id, payment_id)
        .verify_slice(&provided)
        .is_ok()
}

fn is_lowercase_digest(signature: &str) -> bool {
    signature.len() == 64
        && signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
