//! Payment-gateway callback boundary. The gateway itself is an external
//! collaborator; the only logic owned here is signature verification for
//! the confirmation callback.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use validator::Validate;

type HmacSha256 = Hmac<Sha256>;

/// Body of the gateway's payment-confirmation callback.
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackPayload {
    #[validate(length(min = 1))]
    pub order_id: String,
    #[validate(length(min = 1))]
    pub payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

/// Hex-encoded HMAC-SHA256 over `"{order_id}|{payment_id}"`.
pub fn expected_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex_encode(&mac.finalize().into_bytes())
}

/// Constant-time comparison against the expected signature.
pub fn verify_signature(payload: &CallbackPayload, secret: &str) -> bool {
    let expected = expected_signature(&payload.order_id, &payload.payment_id, secret);
    constant_time_eq(expected.as_bytes(), payload.signature.trim().as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_hex_sha256_length() {
        let sig = expected_signature("order_1", "pay_1", "secret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn valid_signature_verifies() {
        let secret = "webhook-secret";
        let payload = CallbackPayload {
            order_id: "order_42".to_string(),
            payment_id: "pay_42".to_string(),
            signature: expected_signature("order_42", "pay_42", secret),
        };
        assert!(verify_signature(&payload, secret));
    }

    #[test]
    fn wrong_secret_or_tampered_ids_fail() {
        let secret = "webhook-secret";
        let good = expected_signature("order_42", "pay_42", secret);

        let tampered = CallbackPayload {
            order_id: "order_43".to_string(),
            payment_id: "pay_42".to_string(),
            signature: good.clone(),
        };
        assert!(!verify_signature(&tampered, secret));

        let wrong_secret = CallbackPayload {
            order_id: "order_42".to_string(),
            payment_id: "pay_42".to_string(),
            signature: good,
        };
        assert!(!verify_signature(&wrong_secret, "other-secret"));
    }

    #[test]
    fn different_lengths_fail_fast_but_safely() {
        let payload = CallbackPayload {
            order_id: "o".to_string(),
            payment_id: "p".to_string(),
            signature: "short".to_string(),
        };
        assert!(!verify_signature(&payload, "secret"));
    }
}
