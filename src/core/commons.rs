// src/core/commons.rs

use std::borrow::Cow;
use std::time::Duration;

/// Formats a run duration for the `-T` summary, with precision that shrinks as the
/// duration grows.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if elapsed >= Duration::from_secs(60) {
        let total = elapsed.as_secs();
        format!("{}m {}s", total / 60, total % 60)
    } else if secs > 10.0 {
        format!("{:.1}s", secs)
    } else if secs > 5.0 {
        format!("{:.2}s", secs)
    } else if secs > 1.0 {
        format!("{:.3}s", secs)
    } else if elapsed > Duration::from_millis(20) {
        format!("{}ms", elapsed.as_millis())
    } else if elapsed > Duration::from_micros(20) {
        format!("{}us", elapsed.as_micros())
    } else {
        format!("{:?}", elapsed)
    }
}

/// Quotes `value` for inclusion in a POSIX shell command line.
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    shlex::try_quote(value).unwrap_or_else(|_| {
        // Only a NUL byte is rejected; the shell could not receive it anyway.
        Cow::Owned(value.replace('\0', ""))
    })
}

/// Appends `args`, shell-quoted, to `body`.
pub fn append_args(body: &str, args: &[String]) -> String {
    args.iter().fold(body.to_string(), |mut line, arg| {
        line.push(' ');
        line.push_str(&shell_quote(arg));
        line
    })
}
