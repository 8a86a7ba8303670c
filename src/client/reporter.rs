use crate::client::constants::UNSET_RTT_MS;
use crate::client::session::SessionOutcome;
use crate::client::statistics::Report;
use colored::*;
use tracing::{debug, info, warn};

/// Reporter for printing session results
pub struct Reporter;

// Width of the percentile bars
const BAR_WIDTH: usize = 30;

impl Reporter {
    /// Bar proportional to `value / max`; empty for non-positive values.
    fn render_bar(value: i32, max: i32, width: usize) -> String {
        if value <= 0 || max <= 0 {
            return String::new();
        }
        let len = ((value as f64 / max as f64) * width as f64).round() as usize;
        "█".repeat(len.clamp(1, width))
    }

    /// Formats a quantile as a label, e.g. 0.99 -> "P99"
    fn percentile_label(quantile: f64) -> String {
        format!("P{}", (quantile * 100.0).round() as u32)
    }

    /// One-line verdict for the session
    fn verdict(outcome: &SessionOutcome) -> ColoredString {
        let report = &outcome.report;
        if let Some(fault) = &outcome.fault {
            format!("✗ ABORTED: {}", fault).red().bold()
        } else if !outcome.completed {
            "✗ INCOMPLETE: terminate echo never arrived".red().bold()
        } else if report.unanswered() > 0 {
            format!(
                "⚠ LOSSY: {} of {} probes unanswered",
                report.unanswered(),
                report.count()
            )
            .yellow()
            .bold()
        } else if outcome.duplicates > 0 {
            format!("⚠ DUPLICATES: {} extra replies", outcome.duplicates)
                .yellow()
                .bold()
        } else {
            "✓ COMPLETE: every probe answered once".green().bold()
        }
    }

    /// Print the complete results summary
    pub fn print_results(&self, outcome: &SessionOutcome) {
        let report = &outcome.report;
        debug!(
            probes = report.count(),
            unanswered = report.unanswered(),
            "Printing session results"
        );

        println!("\n{}", "┌─────────────────────────────┐".cyan());
        println!("{}", "│  RTT Probe Results          │".cyan());
        println!("{}", "└─────────────────────────────┘".cyan());
        println!();

        let replied = report.count() - report.unanswered();
        println!(
            "Probes:   {} sent, {} answered, {} unanswered, {} duplicate replies",
            outcome.probes_sent,
            replied,
            report.unanswered(),
            outcome.duplicates
        );
        if report.unanswered() > 0 {
            println!(
                "          └─ Unanswered probes count as {} ms below",
                UNSET_RTT_MS
            );
        }
        println!();
        println!("Duration: {:.2}s", outcome.elapsed.as_secs_f64());
        println!();

        println!("Round-trip time (ms):");
        println!("  Mean:    {:>8.2}  ← Average over every probe", report.mean());
        println!("  StdDev:  {:>8.2}  ← Population standard deviation", report.std_dev());
        println!("  Min:     {:>8}", report.min());
        println!("  Max:     {:>8}", report.max());
        println!();

        let max = report.max();
        for (quantile, value) in report.percentiles() {
            println!(
                "  {:>5}:  {:>8}  {}",
                Self::percentile_label(quantile),
                value,
                Self::render_bar(value, max, BAR_WIDTH).cyan()
            );
        }
        println!();
        println!("{}", Self::verdict(outcome));

        Self::log_summary(report);
    }

    /// Emit the summary through the logging channel
    pub fn log_summary(report: &Report) {
        let [(_, p99), (_, p95), (_, p75), (_, p50)] = report.percentiles();
        if report.unanswered() > 0 {
            warn!(
                unanswered = report.unanswered(),
                "Unanswered probes are included in the summary"
            );
        }
        info!(
            count = report.count(),
            mean_ms = report.mean(),
            p99_ms = p99,
            p95_ms = p95,
            p75_ms = p75,
            p50_ms = p50,
            stddev_ms = report.std_dev(),
            "Latency summary"
        );
    }
}
