use campus_api::gateway::{expected_signature, verify_signature, CallbackPayload};
use campus_api::models::requests::CreatePaymentRequest;
use campus_api::models::PaymentStatus;
use rust_decimal::Decimal;
use validator::Validate;

#[test]
fn signature_is_stable_and_keyed() {
    let a = expected_signature("ord_1", "pay_1", "secret");
    let b = expected_signature("ord_1", "pay_1", "secret");
    let c = expected_signature("ord_1", "pay_1", "other-secret");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[test]
fn callback_verifies_only_with_matching_ids_and_secret() {
    let secret = "webhook-secret";
    let good = CallbackPayload {
        order_id: "ord_7".to_string(),
        payment_id: "pay_7".to_string(),
        signature: expected_signature("ord_7", "pay_7", secret),
    };
    assert!(verify_signature(&good, secret));
    assert!(!verify_signature(&good, "wrong-secret"));

    let swapped = CallbackPayload {
        order_id: "pay_7".to_string(),
        payment_id: "ord_7".to_string(),
        signature: good.signature.clone(),
    };
    assert!(!verify_signature(&swapped, secret));
}

#[test]
fn delimiter_keeps_id_boundaries_unambiguous() {
    // "ab" + "c" must not collide with "a" + "bc".
    let secret = "s";
    assert_ne!(
        expected_signature("ab", "c", secret),
        expected_signature("a", "bc", secret)
    );
}

#[test]
fn surrounding_whitespace_in_signature_is_tolerated() {
    let secret = "webhook-secret";
    let payload = CallbackPayload {
        order_id: "ord_9".to_string(),
        payment_id: "pay_9".to_string(),
        signature: format!("  {}  ", expected_signature("ord_9", "pay_9", secret)),
    };
    assert!(verify_signature(&payload, secret));
}

#[test]
fn blank_callback_fields_fail_validation() {
    let payload = CallbackPayload {
        order_id: String::new(),
        payment_id: "pay_1".to_string(),
        signature: "sig".to_string(),
    };
    assert!(payload.validate().is_err());
}

#[tokio::test]
async fn tampered_callback_gets_a_400_before_any_database_work() {
    // Signature rejection happens ahead of the pool lookup, so this runs
    // without a database; the payment row is never reached.
    let payload = CallbackPayload {
        order_id: "ord_42".to_string(),
        payment_id: "pay_42".to_string(),
        signature: "0".repeat(64),
    };
    let err = campus_api::handlers::payments::gateway_callback(axum::Json(payload))
        .await
        .err()
        .expect("bad signature must be rejected");
    assert_eq!(err.status_code(), 400);
}

#[test]
fn payment_amount_must_be_positive() {
    let mut req: CreatePaymentRequest = serde_json::from_value(serde_json::json!({
        "student_id": uuid::Uuid::new_v4(),
        "amount": "150.00",
        "payment_type": "tuition",
        "due_date": "2026-09-01"
    }))
    .unwrap();
    assert!(req.validate().is_ok());

    req.amount = Decimal::ZERO;
    assert!(req.validate().is_err());

    req.amount = Decimal::new(-500, 2);
    assert!(req.validate().is_err());
}

#[test]
fn payment_status_uses_uppercase_wire_form() {
    assert_eq!(
        serde_json::to_value(PaymentStatus::Pending).unwrap(),
        serde_json::json!("PENDING")
    );
    assert_eq!(
        serde_json::from_value::<PaymentStatus>(serde_json::json!("OVERDUE")).unwrap(),
        PaymentStatus::Overdue
    );
    assert_eq!(PaymentStatus::Cancelled.as_str(), "CANCELLED");
}
