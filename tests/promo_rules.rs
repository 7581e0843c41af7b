use chrono::{Duration, Utc};
use coursepay::domain::promo::{DiscountType, PromoCode};
use coursepay::error::DomainError;
use uuid::Uuid;

fn promo(discount_type: DiscountType, discount_value: f64) -> PromoCode {
    let now = Utc::now();
    PromoCode {
        promo_code_id: Uuid::new_v4(),
        code: "WELCOME20".to_string(),
        discount_type,
        discount_value,
        is_active: true,
        valid_from: None,
        valid_until: None,
        max_uses: None,
        used_count: 0,
        min_purchase_amount: 0.0,
        applicable_courses: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn invalid_outside_redemption_window() {
    let now = Utc::now();
    let mut p = promo(DiscountType::Percentage, 20.0);
    p.valid_from = Some(now - Duration::days(10));
    p.valid_until = Some(now + Duration::days(10));

    assert!(p.is_valid(now));
    assert!(!p.is_valid(now - Duration::days(11)));
    assert!(!p.is_valid(now + Duration::days(11)));
}

#[test]
fn invalid_when_inactive() {
    let mut p = promo(DiscountType::Percentage, 20.0);
    p.is_active = false;
    assert!(!p.is_valid(Utc::now()));
}

#[test]
fn usage_cap_boundary() {
    let mut p = promo(DiscountType::Percentage, 20.0);
    p.max_uses = Some(5);

    p.used_count = 4;
    assert!(p.is_valid(Utc::now()));

    p.used_count = 5;
    assert!(!p.is_valid(Utc::now()));
}

#[test]
fn empty_course_set_applies_to_everything() {
    let p = promo(DiscountType::Percentage, 20.0);
    assert!(p.can_apply_to_course(Uuid::new_v4()));
}

#[test]
fn course_restriction_is_a_membership_test() {
    let allowed = Uuid::new_v4();
    let mut p = promo(DiscountType::Percentage, 20.0);
    p.applicable_courses = vec![allowed];

    assert!(p.can_apply_to_course(allowed));
    assert!(!p.can_apply_to_course(Uuid::new_v4()));
}

#[test]
fn percentage_discount_rounds_to_cents() {
    let p = promo(DiscountType::Percentage, 20.0);
    assert_eq!(p.calculate_discount(150.0).unwrap(), 30.0);

    let p = promo(DiscountType::Percentage, 33.333);
    assert_eq!(p.calculate_discount(10.0).unwrap(), 3.33);

    // half-way case on an exactly-representable value rounds up
    let p = promo(DiscountType::Percentage, 12.5);
    assert_eq!(p.calculate_discount(1.0).unwrap(), 0.13);
}

#[test]
fn fixed_discount_is_capped_at_subtotal() {
    let p = promo(DiscountType::Fixed, 50.0);
    assert_eq!(p.calculate_discount(30.0).unwrap(), 30.0);
    assert_eq!(p.calculate_discount(100.0).unwrap(), 50.0);
}

#[test]
fn below_minimum_purchase_is_an_error_not_a_zero() {
    let mut p = promo(DiscountType::Percentage, 20.0);
    p.min_purchase_amount = 50.0;

    let err = p.calculate_discount(40.0).unwrap_err();
    assert!(matches!(err, DomainError::BelowMinimum(_)));

    // at the floor the discount is granted
    assert_eq!(p.calculate_discount(50.0).unwrap(), 10.0);
}

#[test]
fn discount_is_pure_and_repeatable() {
    let p = promo(DiscountType::Percentage, 20.0);
    let first = p.calculate_discount(150.0).unwrap();
    let second = p.calculate_discount(150.0).unwrap();
    assert_eq!(first, second);
}
