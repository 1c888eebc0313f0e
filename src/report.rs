//! Per-file result table printed with --report

use prettytable::{format, Cell, Row, Table};
use std::path::Path;

use crate::image_processing::{BatchSummary, FileAction};

/// One row of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub input_filename: String,
    pub directory: String,
    pub original: String,
    pub trimmed: String,
    pub outcome: String,
    pub outputs: usize,
}

#[derive(Debug, Default)]
pub struct ProcessingReport {
    pub entries: Vec<ReportEntry>,
    pub failures: usize,
}

impl ProcessingReport {
    pub fn from_summary(summary: &BatchSummary) -> Self {
        let mut report = Self::default();

        for file in &summary.files {
            let input_filename = extract_filename(&file.path);
            let directory = file
                .path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            let entry = match &file.result {
                Ok(outcome) => ReportEntry {
                    input_filename,
                    directory,
                    original: format_dimensions(outcome.original_dimensions),
                    trimmed: format_dimensions(outcome.trimmed_dimensions),
                    outcome: match outcome.action {
                        FileAction::Resized { .. } => "resized".to_string(),
                        FileAction::TrimmedInPlace => "trimmed".to_string(),
                        FileAction::Unchanged => "unchanged".to_string(),
                    },
                    outputs: outcome.output_paths.len(),
                },
                Err(e) => {
                    report.failures += 1;
                    ReportEntry {
                        input_filename,
                        directory,
                        original: "-".to_string(),
                        trimmed: "-".to_string(),
                        outcome: e.kind().to_string(),
                        outputs: 0,
                    }
                }
            };
            report.entries.push(entry);
        }

        report
    }

    /// Print the complete report as a formatted table
    pub fn print(&self) {
        if self.entries.is_empty() {
            println!("No files were processed.");
            return;
        }

        println!("\nFILES ({} total, {} failed)\n", self.entries.len(), self.failures);

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        table.add_row(Row::new(vec![
            Cell::new("Input"),
            Cell::new("Directory"),
            Cell::new("Original"),
            Cell::new("Trimmed"),
            Cell::new("Result"),
            Cell::new("Outputs"),
        ]));

        for entry in &self.entries {
            table.add_row(Row::new(vec![
                Cell::new(&truncate(&entry.input_filename, 30)),
                Cell::new(&truncate(&entry.directory, 40)),
                Cell::new(&entry.original),
                Cell::new(&entry.trimmed),
                Cell::new(&entry.outcome),
                Cell::new(&entry.outputs.to_string()),
            ]));
        }

        table.printstd();
        println!();
    }
}

fn format_dimensions((width, height): (u32, u32)) -> String {
    format!("{}x{}", width, height)
}

/// Truncate string to fit in column
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{}…", kept)
    }
}

/// Helper to extract filename from path
pub fn extract_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unknown")
        .to_string()
}
