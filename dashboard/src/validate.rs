use crate::errors::{Error, Result};

const OVERRIDE_MIN_SECS: i64 = 1;
const OVERRIDE_MAX_SECS: i64 = 3600;

/// Validates an explicit override duration before it is dispatched
pub fn validate_override_seconds(seconds: i64) -> Result<u32> {
    if !(OVERRIDE_MIN_SECS..=OVERRIDE_MAX_SECS).contains(&seconds) {
        return Err(Error::Validation(format!(
            "Override duration {}s out of range [{}, {}]",
            seconds, OVERRIDE_MIN_SECS, OVERRIDE_MAX_SECS
        )));
    }

    Ok(seconds as u32)
}
