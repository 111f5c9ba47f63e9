//! CLI to Config conversion utilities

use crate::error::ConfigError;
use std::time::Duration;

/// Parse a duration string (e.g., "500ms", "5s", "1m", "1h")
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let trimmed = s.trim().to_lowercase();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    let (num_str, millis_per_unit) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60 * 1000)
    } else if let Some(n) = trimmed.strip_suffix('h') {
        (n, 3600 * 1000)
    } else {
        (trimmed.as_str(), 1000)
    };

    let num: u64 = num_str.trim().parse().map_err(|_| invalid())?;
    let millis = num.checked_mul(millis_per_unit).ok_or_else(invalid)?;

    Ok(Duration::from_millis(millis))
}

/// Format a duration the way `parse_duration` reads it back
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}
