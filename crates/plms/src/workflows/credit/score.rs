use thiserror::Error;

/// Lowest score the deterministic model can produce.
pub const SCORE_FLOOR: u16 = 550;
/// Highest score the deterministic model can produce.
pub const SCORE_CEILING: u16 = 850;

/// Validate a raw PAN-style identifier and return its canonical uppercase form.
///
/// The accepted shape is five letters, four digits, one letter. Input is
/// uppercased before validation so `abcde1234f` and `ABCDE1234F` are the
/// same identifier.
pub fn normalize_pan(raw: &str) -> Result<String, CreditCheckError> {
    let candidate = raw.trim().to_ascii_uppercase();
    if is_valid_pan(&candidate) {
        Ok(candidate)
    } else {
        Err(CreditCheckError::InvalidIdentifier)
    }
}

fn is_valid_pan(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 10 {
        return false;
    }

    bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase()
}

/// Derive the deterministic credit score for an identifier.
///
/// The same identifier always maps to the same score, so repeated checks
/// are stable across sessions. Scores land in `[SCORE_FLOOR, SCORE_CEILING]`.
pub fn score_for(pan: &str) -> u16 {
    let mut hash: i32 = 0;
    for ch in pan.chars() {
        let code = ch.to_ascii_uppercase() as i32;
        hash = hash.wrapping_mul(31).wrapping_add(code);
    }

    SCORE_FLOOR + (hash.unsigned_abs() % u32::from(SCORE_CEILING - SCORE_FLOOR + 1)) as u16
}

/// Validate and score in one step.
pub fn check(raw: &str) -> Result<u16, CreditCheckError> {
    let pan = normalize_pan(raw)?;
    Ok(score_for(&pan))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreditCheckError {
    #[error("Please enter a valid PAN number (e.g., ABCDE1234F)")]
    InvalidIdentifier,
}
