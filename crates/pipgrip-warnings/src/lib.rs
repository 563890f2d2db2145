use std::error::Error;
use std::iter;
use std::sync::atomic::AtomicBool;

// macro hygiene: The user might not have direct dependencies on those crates
#[doc(hidden)]
pub use anstream;
#[doc(hidden)]
pub use owo_colors;
use owo_colors::DynColor;

/// Whether user-facing warnings are enabled.
pub static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable user-facing warnings.
pub fn enable() {
    ENABLED.store(true, std::sync::atomic::Ordering::Relaxed);
}

/// Warn a user, if warnings are enabled.
#[macro_export]
macro_rules! warn_user {
    ($($arg:tt)*) => {{
        use $crate::anstream::eprintln;
        use $crate::owo_colors::OwoColorize;

        if $crate::ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            let message = format!("{}", format_args!($($arg)*));
            let formatted = message.bold();
            eprintln!("{}{} {formatted}", "warning".yellow().bold(), ":".bold());
        }
    }};
}

/// Format an error chain, one `Caused by` line per source.
///
/// Multi-line messages, such as a requirement with an underlined parse error, keep their
/// line breaks and are indented to the start of the message so underlines stay aligned.
///
/// ```text
/// error: Failed to parse `invalid::syntax`
///   Caused by: Expected one of `@`, `(`, `<`, `=`, `>`, `~`, `!`, `;`, found `:`
///              invalid::syntax
///                     ^
/// ```
pub fn write_error_chain_with_options(
    err: &dyn Error,
    mut stream: impl std::fmt::Write,
    level: impl AsRef<str>,
    color: impl DynColor + Copy,
) -> std::fmt::Result {
    use owo_colors::OwoColorize;

    let main_msg = err.to_string();
    let mut lines = main_msg.trim_end().lines();
    writeln!(
        &mut stream,
        "{}{} {}",
        level.as_ref().color(color).bold(),
        ":".bold(),
        lines.next().unwrap_or_default()
    )?;
    for line in lines {
        writeln!(&mut stream, "{}", line.trim_end())?;
    }

    for source in iter::successors(err.source(), |&err| err.source()) {
        let msg = source.to_string();
        let padding = "  ";
        let cause = "Caused by";
        let child_padding = " ".repeat(padding.len() + cause.len() + 2);

        let mut lines = msg.trim_end().lines();
        if let Some(first) = lines.next() {
            writeln!(
                &mut stream,
                "{}{}: {}",
                padding,
                cause.color(color).bold(),
                first.trim()
            )?;
            for line in lines {
                let line = line.trim_end();
                if line.is_empty() {
                    // Avoid showing indents on empty lines
                    writeln!(&mut stream)?;
                } else {
                    writeln!(&mut stream, "{child_padding}{line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Format an error chain with default options (error level, red color).
pub fn write_error_chain(err: &dyn Error, stream: impl std::fmt::Write) -> std::fmt::Result {
    write_error_chain_with_options(err, stream, "error", owo_colors::AnsiColors::Red)
}
