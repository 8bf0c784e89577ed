use rand::distr::Alphanumeric;
use rand::Rng;

use crate::constants::{MAX_RADIUS_MODIFIER, MIN_RADIUS_MODIFIER};

pub const GAME_ID_LEN: usize = 16;

/// Trimmed guess text, or `None` when nothing is left to search for.
pub fn sanitize_query(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

pub fn normalize_radius_modifier(value: f64) -> Option<f64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value.clamp(MIN_RADIUS_MODIFIER, MAX_RADIUS_MODIFIER))
}

pub fn make_game_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(GAME_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn is_valid_game_id(raw: &str) -> bool {
    raw.len() == GAME_ID_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric())
}
