/// Render a remaining wait as hour/minute text
///
/// Zero or negative means the window is already open.
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "now".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours > 0 && minutes > 0 {
        format!("{hours} hours and {minutes} minutes")
    } else if hours > 0 {
        format!("{hours} hours")
    } else if minutes > 0 {
        format!("{minutes} minutes")
    } else {
        "less than a minute".to_string()
    }
}
