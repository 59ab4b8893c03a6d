use cleanupkit::RowSummary;
use colored::Colorize;

// Status lines go to stderr so stdout stays parseable in json/text mode.

/// Print a success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// One-line outcome count, e.g. `3 deleted, 1 failed, 1 skipped`
pub fn summary_line(summary: &RowSummary) -> String {
    let parts = [
        (summary.previewed, "previewed"),
        (summary.succeeded, "succeeded"),
        (summary.failed, "failed"),
        (summary.skipped, "skipped"),
        (summary.cancelled, "cancelled"),
        (summary.pending, "pending"),
    ];
    let line = parts
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect::<Vec<_>>()
        .join(", ");
    if line.is_empty() {
        "nothing to do".to_string()
    } else {
        line
    }
}

/// Print the outcome of a command
pub fn summary(summary: &RowSummary, dry_run: bool) {
    let line = summary_line(summary);
    if dry_run {
        dim(&format!("dry run: {line}"));
    } else if summary.is_success() {
        success(&line);
    } else {
        warn(&line);
    }
}
