//! Markdown wave report generation
//!
//! This module renders a human-readable report of one wave: run metadata,
//! task and article counters, and a short listing of the articles inserted.

use crate::article::Article;
use crate::output::summary::WaveSummary;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the wave report to `output_path`, replacing any earlier report
pub fn write_wave_report(
    summary: &WaveSummary,
    articles: &[Article],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_wave_report(summary, articles);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a wave summary as markdown
pub fn format_wave_report(summary: &WaveSummary, articles: &[Article]) -> String {
    let mut md = String::new();

    md.push_str("# News Wave Report\n\n");

    // Run metadata
    md.push_str("## Wave Information\n\n");
    md.push_str(&format!("- **Wave ID**: {}\n", summary.wave_id));
    md.push_str(&format!("- **Seed**: {}\n", summary.seed_url));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.elapsed_ms as f64 / 1000.0
    ));
    if let Some(error) = &summary.flush_error {
        md.push_str(&format!("- **Flush Error**: {}\n", error));
    }
    md.push('\n');

    // Task breakdown
    md.push_str("## Tasks\n\n");
    md.push_str("| Counter | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Scheduled | {} |\n", summary.tasks_scheduled));
    md.push_str(&format!("| Attempted | {} |\n", summary.tasks_attempted));
    md.push_str(&format!("| Abandoned | {} |\n", summary.tasks_abandoned));
    md.push_str(&format!("| Fetch Failures | {} |\n", summary.fetch_failures));
    md.push_str(&format!("| Query Failures | {} |\n", summary.query_failures));
    md.push_str(&format!("| Task Failures | {} |\n", summary.task_failures));
    md.push_str(&format!("| Links Dropped | {} |\n", summary.links_dropped));
    md.push_str(&format!("| Peak Running | {} |\n\n", summary.peak_running));

    // Article breakdown
    md.push_str("## Articles\n\n");
    md.push_str(&format!(
        "- **Extracted**: {}\n",
        summary.articles_extracted
    ));
    md.push_str(&format!(
        "- **Skipped (already ingested)**: {}\n",
        summary.skipped_existing
    ));
    md.push_str(&format!("- **Inserted**: {}\n", summary.articles_inserted));
    md.push_str(&format!("- **Images Stored**: {}\n", summary.images_stored));
    md.push_str(&format!(
        "- **Image Offload Failures**: {}\n",
        summary.offload_failures
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !articles.is_empty() {
        md.push_str("## Extracted Articles\n\n");
        md.push_str("| Title | Published | Images | Link |\n");
        md.push_str("|-------|-----------|--------|------|\n");
        for article in articles {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&article.title),
                escape_cell(&article.published_at),
                article.image_count(),
                article.link
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by news-wave*\n");

    md
}

fn escape_cell(text: &str) -> String {
    if text.is_empty() {
        return "(untitled)".to_string();
    }
    text.replace('|', "\\|").replace('\n', " ")
}
