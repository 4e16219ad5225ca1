use std::sync::OnceLock;

use regex::Regex;

/// Prescribable dose ladder in milligrams.
pub const DOSE_TIERS_MG: [f64; 6] = [2.5, 5.0, 7.5, 10.0, 12.5, 15.0];

/// First orders at this tier need a prior-supply history check.
pub const FIRST_SUPPLY_CHECK_DOSE_MG: f64 = 7.5;

fn dose_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|_)(\d+(?:\.\d)?)mg").expect("dose pattern is valid"))
}

/// Extract the milligram dose from a product code of the form
/// `<PREFIX>_<DOSE>mg_<DURATION>`, e.g. `MJL_7.5mg_3m` -> 7.5. Doses carry at
/// most one decimal place and sit at the start of an underscore-delimited
/// token; digits not immediately followed by `mg` (as in `MJL_10_3m`) do not
/// count.
pub fn extract_dose_mg(product_code: &str) -> Option<f64> {
    dose_pattern()
        .captures(product_code)
        .and_then(|caps| caps.get(1))
        .and_then(|dose| dose.as_str().parse::<f64>().ok())
}

fn tier_index(dose_mg: f64) -> Option<usize> {
    DOSE_TIERS_MG.iter().position(|tier| (tier - dose_mg).abs() < f64::EPSILON)
}

pub fn requires_first_supply_check(dose_mg: f64) -> bool {
    (dose_mg - FIRST_SUPPLY_CHECK_DOSE_MG).abs() < f64::EPSILON
}

/// A prior supply covers a new dose when both sit on the ladder at most one
/// tier apart.
pub fn covers_dose_tier(history_dose_mg: f64, dose_mg: f64) -> bool {
    match (tier_index(history_dose_mg), tier_index(dose_mg)) {
        (Some(history), Some(target)) => history.abs_diff(target) <= 1,
        _ => false,
    }
}
