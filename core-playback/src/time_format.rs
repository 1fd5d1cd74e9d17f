use std::time::Duration;

/// Format a duration as `m:ss` for progress labels.
///
/// Minutes are not wrapped into hours; fractional seconds are truncated.
///
/// ```
/// use core_playback::format_clock;
/// use std::time::Duration;
///
/// assert_eq!(format_clock(Duration::from_secs(65)), "1:05");
/// ```
pub fn format_clock(value: Duration) -> String {
    let total = value.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
