use time::OffsetDateTime;

/// Coarse relative age of `then` as seen from `now`.
///
/// Timestamps in the future read as `now`.
#[must_use]
pub fn format_time_ago(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let minutes = (now - then).whole_minutes();

    if minutes < 1 {
        "now".to_owned()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}
