use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid timecode '{0}', expected zero-padded HH:MM:SS")]
pub struct TimecodeError(pub String);

/// Parses a zero-padded `HH:MM:SS` stamp into whole seconds.
pub fn timecode_seconds(stamp: &str) -> Result<u32, TimecodeError> {
    let parts: Vec<&str> = stamp.split(':').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.len() != 2) {
        return Err(TimecodeError(stamp.to_string()));
    }
    let mut fields = [0u32; 3];
    for (i, part) in parts.iter().enumerate() {
        fields[i] = part
            .parse::<u32>()
            .map_err(|_| TimecodeError(stamp.to_string()))?;
    }
    let [hours, minutes, seconds] = fields;
    if minutes > 59 || seconds > 59 {
        return Err(TimecodeError(stamp.to_string()));
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Duration of a `[start, end]` range in seconds. Errors when either stamp is
/// malformed or `end <= start`.
pub fn span_seconds(start: &str, end: &str) -> Result<u32, TimecodeError> {
    let start_s = timecode_seconds(start)?;
    let end_s = timecode_seconds(end)?;
    if end_s <= start_s {
        return Err(TimecodeError(format!("{start}..{end}")));
    }
    Ok(end_s - start_s)
}
