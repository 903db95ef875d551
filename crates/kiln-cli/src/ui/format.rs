//! Formatting for durations and build summaries.

use super::colors_enabled;
use console::Term;
use kiln_engine::BuildSummary;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Format a duration as `ms`, seconds, or minutes and seconds.
///
/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn summary_rows(summary: &BuildSummary) -> [(&'static str, usize); 3] {
    [
        ("written", summary.written),
        ("copied", summary.copied),
        ("dropped", summary.dropped),
    ]
}

/// Print a build summary table to stderr.
pub fn print_build_summary(out_dir: &Path, summary: &BuildSummary) {
    let width = (Term::stderr().size().1 as usize).min(60);
    let rule = "─".repeat(width);
    let color = colors_enabled();

    if color {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{}", rule);

    for (label, count) in summary_rows(summary) {
        if color {
            eprintln!("  {} {:<8} {}", "▸".blue(), label, count.bright_white().bold());
        } else {
            eprintln!("  ▸ {:<8} {}", label, count);
        }
    }

    eprintln!("{}", rule);
    let total = format_duration(summary.duration);
    if color {
        eprintln!(
            "  {} {} in {}",
            "Output:".bold(),
            out_dir.display(),
            total.green()
        );
    } else {
        eprintln!("  Output: {} in {}", out_dir.display(), total);
    }
}
