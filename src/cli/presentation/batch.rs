use crate::batch::{BatchItem, BatchStatus, BatchSummary};
use crate::types::JobId;
use comfy_table::Table;
use std::path::PathBuf;

/// A completed item that was saved to disk.
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub id: JobId,
    pub path: PathBuf,
}

/// `03_budi_santoso.md` for the third item of a batch named "Budi Santoso".
pub fn report_file_name(position: usize, display_name: &str) -> String {
    let slug: String = display_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let slug = if slug.is_empty() { "report".to_string() } else { slug };
    format!("{:02}_{}.md", position, slug)
}

fn status_text(status: BatchStatus) -> &'static str {
    match status {
        BatchStatus::Pending => "pending",
        BatchStatus::Processing => "processing",
        BatchStatus::Completed => "completed",
        BatchStatus::Error => "error",
    }
}

pub fn format_batch_summary(
    summary: &BatchSummary,
    items: &[BatchItem],
    written: &[WrittenReport],
) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Client", "Status", "Tokens (in/out)", "Cost", "Result"]);
    for (index, item) in items.iter().enumerate() {
        let (tokens, cost) = match item.usage {
            Some(usage) => (
                format!("{}/{}", usage.input_tokens, usage.output_tokens),
                usage.cost_label(),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        let result = match item.status {
            BatchStatus::Completed => written
                .iter()
                .find(|w| &w.id == item.id())
                .map(|w| w.path.display().to_string())
                .unwrap_or_default(),
            BatchStatus::Error => item.error.clone().unwrap_or_default(),
            _ => String::new(),
        };
        table.add_row(vec![
            (index + 1).to_string(),
            item.job.display_name.clone(),
            status_text(item.status).to_string(),
            tokens,
            cost,
            result,
        ]);
    }

    let mut out = table.to_string();
    out.push_str(&format!(
        "\n{} completed, {} failed, {} pending; {} input / {} output tokens, total ${:.4}",
        summary.completed,
        summary.failed,
        summary.pending,
        summary.input_tokens,
        summary.output_tokens,
        summary.total_cost
    ));
    if summary.cancelled {
        out.push_str("\nBatch was cancelled.");
    }
    out
}
