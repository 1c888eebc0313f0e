use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use super::{FileAction, FileOutcome, ProcessingEngine};
use crate::error::{ProcessingError, Result};
use crate::json_output::JsonMessage;
use crate::utils::{error_println, has_valid_extension, verbose_println, warn_println};

/// Result of one attempted file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<FileOutcome>,
}

/// Everything a run produced; failures are collected, never raised
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub directories: usize,
    pub files: Vec<FileReport>,
    /// Directories that could not be listed, with the reason
    pub directory_errors: Vec<(PathBuf, ProcessingError)>,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn successful(&self) -> usize {
        self.files.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.successful()
    }

    /// Number of variant files written across the run
    pub fn variants_written(&self) -> usize {
        self.files
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(|o| match o.action {
                FileAction::Resized { variants } => variants,
                _ => 0,
            })
            .sum()
    }

    /// Get processing speed (files per second)
    pub fn items_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if self.files.is_empty() || secs == 0.0 {
            return 0.0;
        }
        self.files.len() as f64 / secs
    }
}

/// A directory and the files it held before processing began
struct DirectoryPlan {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ProcessingEngine {
    /// Trim and resize every raster under `root`.
    ///
    /// Subdirectories are finished before their parent's own files. The tree is
    /// listed up front, so size directories created along the way are not revisited
    /// within the same run. Only a missing root is an error; everything else ends up
    /// in the returned summary.
    pub fn run(&self, root: &Path, progress: &ProgressBar) -> Result<BatchSummary> {
        if !root.is_dir() {
            return Err(ProcessingError::RootNotFound(root.to_path_buf()));
        }

        let start = Instant::now();
        let mut summary = BatchSummary::default();

        let plan = self.plan_directories(root, &mut summary);
        let total: usize = plan.iter().map(|p| p.files.len()).sum();
        progress.set_length(total as u64);

        verbose_println(
            self.config.log_verbose(),
            &format!(
                "Found {} files in {} directories under {}",
                total,
                plan.len(),
                root.display()
            ),
        );

        for entry in plan {
            let reports = self.process_directory(&entry, progress);
            let failed = reports.iter().filter(|r| r.result.is_err()).count();

            if self.config.json_progress {
                JsonMessage::directory_completed(&entry.dir, reports.len(), failed);
            }
            verbose_println(
                self.config.log_verbose(),
                &format!(
                    "Directory {} done ({} files, {} failed)",
                    entry.dir.display(),
                    reports.len(),
                    failed
                ),
            );

            summary.directories += 1;
            summary.files.extend(reports);

            if self.config.json_progress {
                JsonMessage::progress(summary.files.len(), total, "Processing images");
            }
        }

        summary.duration = start.elapsed();
        Ok(summary)
    }

    /// Post-order directory listing with each directory's files captured
    fn plan_directories(&self, root: &Path, summary: &mut BatchSummary) -> Vec<DirectoryPlan> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name();

        let mut plan = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn_println(&format!("Skipping {}: {}", path.display(), e));
                    summary.directory_errors.push((
                        path.clone(),
                        ProcessingError::Io {
                            path,
                            source: e.into(),
                        },
                    ));
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            match self.list_files(entry.path()) {
                Ok(files) => plan.push(DirectoryPlan {
                    dir: entry.into_path(),
                    files,
                }),
                Err(e) => {
                    warn_println(&format!("Skipping directory: {}", e));
                    summary.directory_errors.push((entry.into_path(), e));
                }
            }
        }
        plan
    }

    /// Regular files directly inside `dir`, sorted by name and filtered by extension
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ProcessingError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if !self.config.extensions.is_empty()
                && !has_valid_extension(entry.path(), &self.config.extensions)
            {
                continue;
            }
            files.push(entry.into_path());
        }

        Ok(files)
    }

    fn process_directory(&self, entry: &DirectoryPlan, progress: &ProgressBar) -> Vec<FileReport> {
        let process = |path: &PathBuf| {
            let result = self.process_file_with_progress(path, progress);
            self.report_file(path, &result);
            FileReport {
                path: path.clone(),
                result,
            }
        };

        match &self.pool {
            Some(pool) => pool.install(|| entry.files.par_iter().map(process).collect()),
            None => entry.files.iter().map(process).collect(),
        }
    }

    fn report_file(&self, path: &Path, result: &Result<FileOutcome>) {
        match result {
            Ok(outcome) => {
                if self.config.json_progress {
                    JsonMessage::file_completed(
                        path,
                        &outcome.output_paths,
                        outcome.processing_time.as_millis(),
                    );
                }
                verbose_println(
                    self.config.log_verbose(),
                    &format!("Image {} processed ({:?})", path.display(), outcome.action),
                );
            }
            Err(e) => {
                if self.config.json_progress {
                    JsonMessage::file_failed(path, e.kind(), e.to_string());
                } else {
                    error_println(&format!("{}", e));
                }
            }
        }
    }
}
