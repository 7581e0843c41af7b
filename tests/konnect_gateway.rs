use coursepay::config::KonnectConfig;
use coursepay::error::DomainError;
use coursepay::gateways::konnect::{map_status, normalize_verify_response, KonnectGateway};
use coursepay::gateways::{GatewayPaymentStatus, PaymentGatewayAdapter, VerifyResult, VerifyStatus};
use serde_json::json;

fn gateway() -> KonnectGateway {
    KonnectGateway::new(
        KonnectConfig {
            api_base_url: "https://api.konnect.network/api/v2".to_string(),
            api_key: "konnect_test_key".to_string(),
            receiver_wallet_id: "wallet_1".to_string(),
            success_url: "https://example.test/success".to_string(),
            fail_url: "https://example.test/failure".to_string(),
            webhook_url: None,
            timeout_ms: 5000,
        },
        reqwest::Client::new(),
    )
}

#[test]
fn bills_in_millimes() {
    let charge = gateway().charge_amount(49.5);
    assert_eq!(charge.amount_minor, 49_500);
    assert_eq!(charge.currency, "TND");
}

#[test]
fn webhook_without_status_stays_unknown() {
    let gw = gateway();
    let payload = json!({"payment_ref": "pay_abc"}).to_string();

    let event = gw.process_webhook(payload.as_bytes(), None).unwrap();
    assert_eq!(event.provider_reference.as_deref(), Some("pay_abc"));
    assert_eq!(event.status, GatewayPaymentStatus::Unknown);
}

#[test]
fn webhook_status_is_mapped_when_present() {
    let gw = gateway();
    let payload = json!({"paymentRef": "pay_abc", "status": "completed"}).to_string();

    let event = gw.process_webhook(payload.as_bytes(), None).unwrap();
    assert_eq!(event.status, GatewayPaymentStatus::Completed);
}

#[test]
fn webhook_without_reference_is_rejected() {
    let gw = gateway();
    let payload = json!({"status": "completed"}).to_string();
    assert!(gw.process_webhook(payload.as_bytes(), None).is_err());
}

#[test]
fn unsigned_provider_has_no_signature_scheme() {
    let gw = gateway();
    assert!(gw.validate_webhook_signature(b"{}", None));
}

#[test]
fn provider_status_vocabulary_is_normalized() {
    assert_eq!(map_status("completed"), GatewayPaymentStatus::Completed);
    assert_eq!(map_status("failed_payment"), GatewayPaymentStatus::Failed);
    assert_eq!(map_status("expired"), GatewayPaymentStatus::Cancelled);
    assert_eq!(map_status("refunded"), GatewayPaymentStatus::Refunded);
    assert_eq!(map_status("pending"), GatewayPaymentStatus::Pending);
    assert_eq!(map_status("weird_new_state"), GatewayPaymentStatus::Unknown);
}

#[test]
fn verify_normalization_extracts_the_financial_facts() {
    let result = normalize_verify_response(json!({
        "payment": {
            "status": "completed",
            "amount": 49_500,
            "orderId": "order_9",
            "updatedAt": "2026-01-15T10:30:00Z",
            "transactions": [{"id": "txn_1"}]
        }
    }));

    assert!(result.success);
    assert_eq!(result.status, VerifyStatus::Completed);
    assert_eq!(result.amount_minor, Some(49_500));
    assert_eq!(result.order_id.as_deref(), Some("order_9"));
    assert_eq!(result.transaction_id.as_deref(), Some("txn_1"));
    assert!(result.payment_date.is_some());
}

#[test]
fn authoritative_failure_differs_from_transport_error() {
    let failed = normalize_verify_response(json!({"payment": {"status": "failed_payment"}}));
    assert!(!failed.success);
    assert_eq!(failed.status, VerifyStatus::Failed);
    // conclusive: feeds the lifecycle
    assert!(failed.event_status().is_some());

    let error = VerifyResult::transport_error("connection refused".to_string());
    assert!(!error.success);
    assert_eq!(error.status, VerifyStatus::Error);
    // inconclusive: retryable, never fed to the lifecycle
    assert!(error.event_status().is_none());
}

#[test]
fn malformed_webhook_payload_is_a_domain_error() {
    let gw = gateway();
    let err = gw.process_webhook(b"not json", None).unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}
