//! Parses an algorithm identifier string into a boxed [`Algorithm`].

use regex::Regex;

use super::{Algorithm, BracketLadderAthOnly, BracketLadderFull, BuyAndHold};
use crate::error::{AlgoError, SynthDivResult};

/// `N -> (r, s)` for the shorthand `"sdN"` identifiers, `r = 2^(1/N) - 1`,
/// `s` fixed at `0.5`.
const SD_SHORTHAND_PERIODS: &[u32] = &[4, 5, 6, 8, 10, 12, 16, 20, 24];

fn sd_shorthand(name: &str) -> Option<(f64, f64)> {
    let n: u32 = name.strip_prefix("sd")?.parse().ok()?;
    if !SD_SHORTHAND_PERIODS.contains(&n) {
        return None;
    }
    let r = 2f64.powf(1.0 / n as f64) - 1.0;
    Some((r, 0.5))
}

/// Builds an [`Algorithm`] from one of:
/// - `"buy-and-hold"`
/// - `"sd-{r_pct},{s_pct}"` (full bracket ladder)
/// - `"sd-ath-only-{r_pct},{s_pct}"` (ATH-only variant)
/// - `"sdN"` for `N in {4,5,6,8,10,12,16,20,24}`
pub fn build(name: &str) -> SynthDivResult<Box<dyn Algorithm>> {
    let name = name.trim();

    if name == "buy-and-hold" {
        return Ok(Box::new(BuyAndHold));
    }

    if let Some((r, s)) = sd_shorthand(name) {
        return Ok(Box::new(BracketLadderFull::new(r, s)?));
    }

    let ath_re = Regex::new(r"^sd-ath-only-(\d+(?:\.\d+)?),(\d+(?:\.\d+)?)$").expect("valid regex");
    if let Some(caps) = ath_re.captures(name) {
        let r_pct: f64 = caps[1].parse().map_err(|_| AlgoError::UnknownAlgorithm(name.to_string()))?;
        let s_pct: f64 = caps[2].parse().map_err(|_| AlgoError::UnknownAlgorithm(name.to_string()))?;
        return Ok(Box::new(BracketLadderAthOnly::new(r_pct / 100.0, s_pct / 100.0)?));
    }

    let sd_re = Regex::new(r"^sd-(\d+(?:\.\d+)?),(\d+(?:\.\d+)?)$").expect("valid regex");
    if let Some(caps) = sd_re.captures(name) {
        let r_pct: f64 = caps[1].parse().map_err(|_| AlgoError::UnknownAlgorithm(name.to_string()))?;
        let s_pct: f64 = caps[2].parse().map_err(|_| AlgoError::UnknownAlgorithm(name.to_string()))?;
        return Ok(Box::new(BracketLadderFull::new(r_pct / 100.0, s_pct / 100.0)?));
    }

    Err(AlgoError::UnknownAlgorithm(name.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_and_hold_builds() {
        assert!(build("buy-and-hold").is_ok());
    }

    #[test]
    fn sd_shorthand_builds_for_known_periods() {
        assert!(build("sd8").is_ok());
        assert!(build("sd7").is_err());
    }

    #[test]
    fn sd_full_and_ath_only_build_from_percent_pair() {
        assert!(build("sd-9.05,50").is_ok());
        assert!(build("sd-ath-only-9.05,50").is_ok());
    }

    #[test]
    fn unrecognized_name_errors() {
        let err = build("nonsense").unwrap_err();
        assert!(matches!(
            err,
            crate::error::SynthDivError::Algo(AlgoError::UnknownAlgorithm(_))
        ));
    }
}
