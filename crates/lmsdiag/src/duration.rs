use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};

/// Parse a flag value such as `250ms`, `1.5s`, `2m` or a bare `3` (seconds).
///
/// The result must be at least one millisecond: socket timeouts reject zero.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let millis_per_unit: u64 = match unit.trim() {
        "ms" => 1,
        "" | "s" => 1_000,
        "m" => 60_000,
        other => {
            return Err(CliError::new(
                USAGE,
                format!("unknown duration unit {other:?} in {input:?} (use ms, s or m)"),
            ))
        }
    };

    let invalid = || CliError::new(USAGE, format!("invalid duration: {input:?}"));
    let duration = match number.parse::<u64>() {
        Ok(whole) => whole
            .checked_mul(millis_per_unit)
            .map(Duration::from_millis)
            .ok_or_else(invalid)?,
        Err(_) => {
            let value: f64 = number.parse().map_err(|_| invalid())?;
            let nanos = (value * millis_per_unit as f64 * 1_000_000.0).round();
            if !(nanos.is_finite() && nanos < u64::MAX as f64) {
                return Err(invalid());
            }
            Duration::from_nanos(nanos as u64)
        }
    };

    if duration < Duration::from_millis(1) {
        return Err(CliError::new(
            USAGE,
            format!("duration must be at least 1ms: {input:?}"),
        ));
    }
    Ok(duration)
}
