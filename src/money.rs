//! Amount handling. Prices and discounts are major-unit decimals in the
//! platform's home currency (TND); providers are billed in their own minor
//! unit. Every conversion is explicit so minor-unit integers and major-unit
//! decimals never mix silently.

/// Rounds a major-unit amount to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// TND major units to millimes (scale 1000).
pub fn tnd_to_millimes(amount: f64) -> i64 {
    (amount * 1000.0).round() as i64
}

pub fn millimes_to_tnd(minor: i64) -> f64 {
    minor as f64 / 1000.0
}

/// USD major units to cents (scale 100).
pub fn usd_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn cents_to_usd(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Approximate TND -> USD bridge at a configured rate. Charge-time pricing
/// only; never valid for refund-exact accounting.
pub fn tnd_to_usd(amount_tnd: f64, usd_per_tnd: f64) -> f64 {
    round2(amount_tnd * usd_per_tnd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_is_half_up() {
        assert_eq!(round2(9.999), 10.0);
        assert_eq!(round2(10.004), 10.0);
        // 0.125 is exact in binary, so the half-way case is observable
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(30.0), 30.0);
    }

    #[test]
    fn millime_scale_is_1000() {
        assert_eq!(tnd_to_millimes(49.5), 49_500);
        assert_eq!(millimes_to_tnd(49_500), 49.5);
    }

    #[test]
    fn cent_scale_is_100() {
        assert_eq!(usd_to_cents(19.99), 1_999);
        assert_eq!(cents_to_usd(1_999), 19.99);
    }

    #[test]
    fn usd_bridge_rounds_to_cents() {
        assert_eq!(tnd_to_usd(100.0, 0.32), 32.0);
        assert_eq!(tnd_to_usd(49.9, 0.32), 15.97);
    }
}
