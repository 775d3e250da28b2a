//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress
//!
//! One line per observed status change, led by the job's 1-based position:
//!
//! ```text
//! Batch 1: 3 images
//! 001 dawn.jpg: started
//! 001 dawn.jpg: 45%
//! 002 dusk.png: failed: Failed to decode the input image.
//! 001 dawn.jpg: done
//!     Original: /tmp/Processed/0b6f…/original.jpg
//!     Medium: /tmp/Processed/0b6f…/small.jpg
//!     Thumbnail: /tmp/Processed/0b6f…/thumb.jpg
//! ```
//!
//! ## Summary
//!
//! ```text
//! 001 dawn.jpg → /tmp/Processed/0b6f…
//! 002 dusk.png ✗ Failed to decode the input image.
//!
//! Processed 1 of 2 images (1 failed)
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure — no I/O, no side effects.

use crate::process::{BatchReport, ProcessEvent};
use crate::types::{Job, JobStatus};

/// Format a 0-based job index as a 3-digit zero-padded 1-based position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "image" } else { "images" }
}

/// Format one orchestrator event as display lines.
///
/// `Processing` without a fraction prints `started`; `Idle` never reaches
/// observers as a change and prints nothing.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { generation, labels } => {
            vec![format!(
                "Batch {}: {} {}",
                generation,
                labels.len(),
                plural(labels.len())
            )]
        }
        ProcessEvent::StatusChanged {
            index,
            label,
            status,
            ..
        } => {
            let head = format!("{} {}", format_index(*index), label);
            match status {
                JobStatus::Idle => Vec::new(),
                JobStatus::Processing { progress: None } => vec![format!("{head}: started")],
                JobStatus::Processing {
                    progress: Some(fraction),
                } => vec![format!("{head}: {:.0}%", fraction * 100.0)],
                JobStatus::Success(result) => vec![
                    format!("{head}: done"),
                    format!("{}Original: {}", indent(1), result.original.display()),
                    format!("{}Medium: {}", indent(1), result.medium.display()),
                    format!("{}Thumbnail: {}", indent(1), result.thumbnail.display()),
                ],
                JobStatus::Failure(message) => vec![format!("{head}: failed: {message}")],
            }
        }
        ProcessEvent::BatchFinished {
            generation,
            succeeded,
            failed,
        } => vec![format!(
            "Batch {generation} finished: {succeeded} succeeded, {failed} failed"
        )],
        ProcessEvent::Reset { generation } => vec![format!("Reset (generation {generation})")],
    }
}

fn job_line(index: usize, job: &Job) -> String {
    let head = format!("{} {}", format_index(index), job.label);
    match &job.status {
        JobStatus::Success(result) => {
            let folder = result
                .original
                .parent()
                .unwrap_or(result.original.as_path());
            format!("{head} \u{2192} {}", folder.display())
        }
        JobStatus::Failure(message) => format!("{head} \u{2717} {message}"),
        JobStatus::Idle | JobStatus::Processing { .. } => format!("{head} (unfinished)"),
    }
}

/// Format the end-of-batch summary: one line per job, then totals.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .jobs
        .iter()
        .enumerate()
        .map(|(index, job)| job_line(index, job))
        .collect();

    let total = report.jobs.len();
    let succeeded = report.succeeded();
    let failed = report.failed();
    lines.push(String::new());
    let mut summary = format!("Processed {succeeded} of {total} {}", plural(total));
    if failed > 0 {
        summary.push_str(&format!(" ({failed} failed)"));
    }
    if report.cancelled {
        summary.push_str(", cancelled");
    }
    lines.push(summary);
    lines
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}
