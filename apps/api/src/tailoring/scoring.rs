/// Score reported when the upstream returned no keyword signal at all.
pub const NEUTRAL_SCORE: u8 = 75;

/// ATS compatibility estimate in [0, 100] from keyword counts.
pub fn ats_score(matched: usize, missing: usize) -> u8 {
    let total = matched.saturating_add(missing);
    if total == 0 {
        return NEUTRAL_SCORE;
    }
    let ratio = matched as f64 / total as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}
