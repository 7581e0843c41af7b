use chrono::Utc;
use coursepay::domain::payment::{Payment, PaymentStatus, PaymentType};
use coursepay::gateways::GatewayPaymentStatus;
use coursepay::lifecycle::{apply_transition, status_from_event, TransitionOutcome};
use uuid::Uuid;

#[test]
fn pending_moves_to_every_conclusive_outcome() {
    use PaymentStatus::*;
    for target in [Completed, Failed, Cancelled, UnderReview] {
        assert_eq!(
            apply_transition(Pending, target),
            TransitionOutcome::Apply(target)
        );
    }
}

#[test]
fn refund_requires_a_completed_payment() {
    assert!(matches!(
        apply_transition(PaymentStatus::Pending, PaymentStatus::Refunded),
        TransitionOutcome::Conflict { .. }
    ));
    assert_eq!(
        apply_transition(PaymentStatus::Completed, PaymentStatus::Refunded),
        TransitionOutcome::Apply(PaymentStatus::Refunded)
    );
}

#[test]
fn late_failure_never_overwrites_a_completion() {
    assert!(matches!(
        apply_transition(PaymentStatus::Completed, PaymentStatus::Failed),
        TransitionOutcome::Conflict { .. }
    ));
}

#[test]
fn same_terminal_state_is_idempotent() {
    assert_eq!(
        apply_transition(PaymentStatus::Completed, PaymentStatus::Completed),
        TransitionOutcome::AlreadyApplied
    );
    assert_eq!(
        apply_transition(PaymentStatus::Failed, PaymentStatus::Failed),
        TransitionOutcome::AlreadyApplied
    );
}

#[test]
fn refunded_accepts_nothing_further() {
    use PaymentStatus::*;
    for target in [Completed, Failed, Cancelled, UnderReview] {
        assert!(matches!(
            apply_transition(Refunded, target),
            TransitionOutcome::Conflict { .. }
        ));
    }
}

#[test]
fn stale_pending_events_are_noops() {
    assert_eq!(
        apply_transition(PaymentStatus::Completed, PaymentStatus::Pending),
        TransitionOutcome::AlreadyApplied
    );
}

#[test]
fn review_resolves_to_conclusive_outcomes() {
    use PaymentStatus::*;
    for target in [Completed, Failed, Cancelled] {
        assert_eq!(
            apply_transition(UnderReview, target),
            TransitionOutcome::Apply(target)
        );
    }
}

#[test]
fn unmapped_events_land_in_review_not_a_terminal_state() {
    let status = status_from_event(GatewayPaymentStatus::Unknown);
    assert_eq!(status, PaymentStatus::UnderReview);
    assert!(!status.is_terminal());
}

#[test]
fn event_statuses_map_one_to_one_otherwise() {
    assert_eq!(
        status_from_event(GatewayPaymentStatus::Completed),
        PaymentStatus::Completed
    );
    assert_eq!(
        status_from_event(GatewayPaymentStatus::Failed),
        PaymentStatus::Failed
    );
    assert_eq!(
        status_from_event(GatewayPaymentStatus::Refunded),
        PaymentStatus::Refunded
    );
}

#[test]
fn discounted_payment_amounts_reconcile() {
    let now = Utc::now();
    let mut payment = Payment {
        payment_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        order_id: "order_1".to_string(),
        payment_type: PaymentType::CoursePurchase,
        course_id: Some(Uuid::new_v4()),
        cart_items: None,
        amount: 100.0,
        original_amount: 120.0,
        promo_code: Some("WELCOME20".to_string()),
        promo_code_id: Some(Uuid::new_v4()),
        promo_discount: Some(20.0),
        currency: "TND".to_string(),
        payment_method: "card".to_string(),
        payment_gateway: "stripe".to_string(),
        status: PaymentStatus::Pending,
        provider_reference: None,
        checkout_url: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    assert!(payment.amounts_consistent());

    payment.promo_discount = Some(15.0);
    assert!(!payment.amounts_consistent());
}
