// Cross-organism trust fusion

/// Combined trust across the UNSLUG and FearIndex organisms: the geometric
/// mean `sqrt(unslug * fear)`. Confidence needs both organisms to agree;
/// either one at zero (or invalid) floors the result at exactly 0.
pub fn combined_trust(unslug_trust: f64, fear_trust: f64) -> f64 {
    if !unslug_trust.is_finite()
        || !fear_trust.is_finite()
        || unslug_trust <= 0.0
        || fear_trust <= 0.0
    {
        return 0.0;
    }
    (unslug_trust * fear_trust).sqrt().clamp(0.0, 1.0)
}
