use coursepay::config::StripeConfig;
use coursepay::error::DomainError;
use coursepay::gateways::stripe::{normalize_event, normalize_session, StripeGateway};
use coursepay::gateways::{GatewayPaymentStatus, PaymentGatewayAdapter, VerifyStatus};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

const SECRET: &str = "whsec_test_secret";

fn gateway(webhook_secret: Option<&str>) -> StripeGateway {
    StripeGateway::new(
        StripeConfig {
            api_base_url: "https://api.stripe.com".to_string(),
            secret_key: "sk_test_123".to_string(),
            webhook_secret: webhook_secret.map(str::to_string),
            success_url: "https://example.test/success".to_string(),
            cancel_url: "https://example.test/cancel".to_string(),
            usd_per_tnd: 0.32,
            timeout_ms: 5000,
        },
        reqwest::Client::new(),
    )
}

fn sign(payload: &[u8], timestamp: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, String::from_utf8_lossy(payload)).as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, digest)
}

fn session_completed_payload() -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_abc",
                "client_reference_id": "order_42",
                "payment_intent": "pi_123",
                "amount_total": 3200,
                "metadata": {"order_id": "order_42"}
            }
        }
    })
    .to_string()
    .into_bytes()
}

#[test]
fn signed_webhook_is_accepted_and_normalized() {
    let gw = gateway(Some(SECRET));
    let payload = session_completed_payload();
    let header = sign(&payload, "1700000000");

    let event = gw.process_webhook(&payload, Some(&header)).unwrap();
    assert_eq!(event.status, GatewayPaymentStatus::Completed);
    assert_eq!(event.provider_reference.as_deref(), Some("cs_test_abc"));
    assert_eq!(event.order_id.as_deref(), Some("order_42"));
    assert_eq!(event.transaction_id.as_deref(), Some("pi_123"));
    assert_eq!(event.amount_minor, Some(3200));
}

#[test]
fn tampered_payload_fails_closed() {
    let gw = gateway(Some(SECRET));
    let payload = session_completed_payload();
    let header = sign(&payload, "1700000000");

    let mut tampered = payload.clone();
    let idx = tampered.len() - 10;
    tampered[idx] ^= 1;

    assert!(!gw.validate_webhook_signature(&tampered, Some(&header)));
    let err = gw.process_webhook(&tampered, Some(&header)).unwrap_err();
    assert!(matches!(err, DomainError::SignatureInvalid));
}

#[test]
fn missing_signature_fails_closed_when_secret_is_set() {
    let gw = gateway(Some(SECRET));
    let payload = session_completed_payload();

    assert!(!gw.validate_webhook_signature(&payload, None));
    assert!(matches!(
        gw.process_webhook(&payload, None),
        Err(DomainError::SignatureInvalid)
    ));
}

#[test]
fn absent_secret_is_explicit_insecure_mode() {
    let gw = gateway(None);
    let payload = session_completed_payload();

    assert!(gw.validate_webhook_signature(&payload, None));
    let event = gw.process_webhook(&payload, None).unwrap();
    assert_eq!(event.status, GatewayPaymentStatus::Completed);
}

#[test]
fn event_taxonomy_collapses_to_one_field_set() {
    let failed = json!({"id": "pi_9", "metadata": {"order_id": "order_7"}, "amount": 1500});
    let event = normalize_event("payment_intent.payment_failed", &failed, json!({}));
    assert_eq!(event.status, GatewayPaymentStatus::Failed);
    assert_eq!(event.order_id.as_deref(), Some("order_7"));
    assert_eq!(event.transaction_id.as_deref(), Some("pi_9"));

    let refunded = json!({"payment_intent": "pi_9", "amount_refunded": 1500, "metadata": {}});
    let event = normalize_event("charge.refunded", &refunded, json!({}));
    assert_eq!(event.status, GatewayPaymentStatus::Refunded);
    assert_eq!(event.amount_minor, Some(1500));
}

#[test]
fn unrecognized_events_stay_unknown() {
    let event = normalize_event("invoice.created", &json!({}), json!({}));
    assert_eq!(event.status, GatewayPaymentStatus::Unknown);
}

#[test]
fn session_normalization_distinguishes_outcomes() {
    let paid = normalize_session(json!({
        "id": "cs_1", "payment_status": "paid", "status": "complete",
        "amount_total": 3200, "payment_intent": "pi_1",
        "client_reference_id": "order_1", "created": 1700000000_i64
    }));
    assert!(paid.success);
    assert_eq!(paid.status, VerifyStatus::Completed);
    assert_eq!(paid.order_id.as_deref(), Some("order_1"));
    assert!(paid.payment_date.is_some());

    let expired = normalize_session(json!({"payment_status": "unpaid", "status": "expired"}));
    assert!(!expired.success);
    assert_eq!(expired.status, VerifyStatus::Cancelled);

    let open = normalize_session(json!({"payment_status": "unpaid", "status": "open"}));
    assert_eq!(open.status, VerifyStatus::Pending);
}

#[test]
fn card_charges_bridge_home_currency_into_cents() {
    let gw = gateway(Some(SECRET));
    let charge = gw.charge_amount(100.0);
    assert_eq!(charge.amount_minor, 3200);
    assert_eq!(charge.currency, "USD");
}
