//! Markdown summary generation
//!
//! This module renders a human-readable report of one crawl: run timing,
//! the stop reason, record counts and skipped links.

use crate::output::traits::CrawlSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of `summary` to `output_path`
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(io::Error)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Listing-Sweep Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(started) = summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    let reason = summary
        .stop_reason
        .map(|r| r.as_str())
        .unwrap_or("unknown");
    md.push_str(&format!("- **Stop Reason**: {}\n\n", reason));

    // Records
    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Accepted**: {}\n", summary.accepted));
    md.push_str(&format!("- **Batches Flushed**: {}\n", summary.batches_flushed));
    md.push_str(&format!(
        "- **Acceptance Rate**: {:.2}%\n\n",
        summary.acceptance_rate()
    ));

    // Crawl progress
    md.push_str("## Crawl Progress\n\n");
    md.push_str("| Counter | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Listing pages fetched | {} |\n", summary.pages_fetched));
    md.push_str(&format!(
        "| Partitions completed | {} |\n",
        summary.partitions_completed
    ));
    md.push_str(&format!(
        "| Listing fetch failures | {} |\n\n",
        summary.listing_failures
    ));

    // Skipped links
    if summary.duplicates + summary.skipped_links() > 0 {
        md.push_str("## Skipped Links\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Duplicate | {} |\n", summary.duplicates));
        md.push_str(&format!(
            "| Missing field | {} |\n",
            summary.extraction_failures
        ));
        md.push_str(&format!("| Fetch failed | {} |\n", summary.detail_failures));
        md.push('\n');
    }

    md
}
