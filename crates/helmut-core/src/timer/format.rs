/// Render seconds as zero-padded `MM:SS`.
///
/// Minutes are not wrapped at the hour: 3661 seconds is `61:01`. Negative
/// input renders as `00:00`.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
