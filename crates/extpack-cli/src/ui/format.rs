//! Formatting utilities for sizes, durations, and build summaries.

use super::colors_enabled;
use console::Term;
use extpack_bundler::BuildReport;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use extpack_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use extpack_cli::ui::format_duration;
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
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// One summary row per artifact: name relative to the output directory,
/// size, and whether a source map was written.
fn summary_rows(report: &BuildReport, out_dir: &Path) -> Vec<String> {
    report
        .artifacts
        .iter()
        .map(|artifact| {
            let name = artifact
                .path
                .strip_prefix(out_dir)
                .unwrap_or(&artifact.path)
                .display()
                .to_string();
            let map = if artifact.source_map.is_some() {
                " + map"
            } else {
                ""
            };
            if colors_enabled() {
                format!(
                    "  {} {} {}{}",
                    "▸".blue(),
                    name.bright_white().bold(),
                    format_size(artifact.bytes).dimmed(),
                    map.dimmed()
                )
            } else {
                format!("  ▸ {} {}{}", name, format_size(artifact.bytes), map)
            }
        })
        .collect()
}

/// Print the per-artifact summary of a build to stderr.
pub fn print_build_summary(report: &BuildReport, out_dir: &Path) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let rule = "─".repeat(width);

    if colors_enabled() {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{}", rule);

    for row in summary_rows(report, out_dir) {
        eprintln!("{}", row);
    }

    eprintln!("{}", rule);

    let total = format_size(report.total_bytes());
    let elapsed = format_duration(report.duration);
    if colors_enabled() {
        eprintln!("  {} {} in {}", "Total:".bold(), total.green(), elapsed.green());
    } else {
        eprintln!("  Total: {} in {}", total, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::init_colors;
    use extpack_bundler::Artifact;
    use serial_test::serial;
    use std::path::PathBuf;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    fn report() -> BuildReport {
        BuildReport {
            artifacts: vec![
                Artifact {
                    entry: "background".to_string(),
                    path: PathBuf::from("/p/dist/background.js"),
                    bytes: 2048,
                    source_map: Some(PathBuf::from("/p/dist/background.js.map")),
                },
                Artifact {
                    entry: "popup".to_string(),
                    path: PathBuf::from("/p/dist/popup.js"),
                    bytes: 12,
                    source_map: None,
                },
            ],
            duration: Duration::from_millis(40),
            ..BuildReport::default()
        }
    }

    #[test]
    #[serial]
    fn test_summary_rows_relative_to_out_dir() {
        init_colors(true);
        let rows = summary_rows(&report(), Path::new("/p/dist"));
        assert_eq!(
            rows,
            vec![
                "  ▸ background.js 2.00 KB + map".to_string(),
                "  ▸ popup.js 12 B".to_string(),
            ]
        );
    }

    #[test]
    fn test_print_build_summary() {
        // Should not panic
        print_build_summary(&report(), Path::new("/p/dist"));
        print_build_summary(&BuildReport::default(), Path::new("/p/dist"));
    }
}
