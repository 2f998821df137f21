use time::{macros::format_description, OffsetDateTime, UtcOffset};

pub fn to_local_time(dt: OffsetDateTime) -> OffsetDateTime {
    if let Ok(local_offset) = UtcOffset::current_local_offset() {
        dt.to_offset(local_offset)
    } else {
        dt
    }
}

/// Wall-clock time of day, e.g. "09:05".
pub fn clock_time(dt: OffsetDateTime) -> String {
    to_local_time(dt)
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| dt.time().to_string())
}
