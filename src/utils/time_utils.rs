use std::time::Duration;

/// Format an elapsed duration for the run summary (e.g. "850 ms", "12.4 s", "3m 07s").
pub fn format_elapsed(elapsed: Duration) -> String
{
	let millis: u128 = elapsed.as_millis();

	if millis < 1000
	{
		return format!("{} ms", millis);
	}

	// Compare in displayed tenths so 59.96 s does not print as "60.0 s".
	let tenths: u64 = (elapsed.as_secs_f64() * 10.0).round() as u64;
	if tenths < 600
	{
		return format!("{:.1} s", tenths as f64 / 10.0);
	}

	let total_secs: u64 = elapsed.as_secs_f64().round() as u64;
	let hours: u64 = total_secs / 3600;
	let minutes: u64 = (total_secs % 3600) / 60;
	let seconds: u64 = total_secs % 60;

	if hours > 0
	{
		format!("{}h {:02}m {:02}s", hours, minutes, seconds)
	}
	else
	{
		format!("{}m {:02}s", minutes, seconds)
	}
}

/// Format a frame rate for display, dropping a trailing ".0".
pub fn format_frame_rate(fps: f64) -> String
{
	if (fps - fps.round()).abs() < 0.005
	{
		format!("{} fps", fps.round() as u64)
	}
	else
	{
		format!("{:.2} fps", fps)
	}
}
