use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use walkdir::WalkDir;

use crate::error::{ProcessingError, Result};
use crate::image_processing::ExportSpec;
use crate::json_output::JsonMessage;
use crate::utils::{error_println, has_valid_extension, mirror_path, verbose_println, warn_println};

pub const DEFAULT_EXTRACTOR: &str = "jeff";
pub const DEFAULT_SOURCE_EXTENSION: &str = "swf";
pub const DEFAULT_FRAMES: &str = "[1]";

/// One invocation of the external asset extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub scope: String,
    pub recursive: bool,
    pub delete_original: bool,
    /// Frame-selection expression, passed through verbatim
    pub frames: String,
    pub export_width: u32,
}

/// Extractor settings that stay fixed for a whole tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Files with this extension mark a directory for extraction
    pub source_extension: String,
    pub frames: String,
    pub recursive: bool,
    pub delete_original: bool,
    pub json_progress: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            frames: DEFAULT_FRAMES.to_string(),
            recursive: true,
            delete_original: true,
            json_progress: false,
        }
    }
}

impl ExtractionRequest {
    pub fn new(
        source_dir: PathBuf,
        destination_dir: PathBuf,
        spec: &ExportSpec,
        options: &ExtractionOptions,
    ) -> Self {
        Self {
            source_dir,
            destination_dir,
            scope: spec.scope.clone(),
            recursive: options.recursive,
            delete_original: options.delete_original,
            frames: options.frames.clone(),
            export_width: spec.export_size,
        }
    }

    /// Command line arguments in the extractor's flag syntax
    pub fn args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.source_dir.display().to_string(),
            "-o".to_string(),
            self.destination_dir.display().to_string(),
            "-S".to_string(),
            self.scope.clone(),
            "-R".to_string(),
            self.recursive.to_string(),
            "-d".to_string(),
            self.delete_original.to_string(),
            "-f".to_string(),
            self.frames.clone(),
            "-w".to_string(),
            self.export_width.to_string(),
        ]
    }
}

/// Turns source assets into raw raster frames on disk
pub trait Extractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest) -> Result<()>;
}

/// Runs an external extractor executable
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    pub program: String,
    pub verbose: bool,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }
}

impl Default for CommandExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXTRACTOR, false)
    }
}

impl Extractor for CommandExtractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<()> {
        let failure = |reason: String| ProcessingError::Collaborator {
            dir: request.source_dir.clone(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(request.args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("failed to start '{}': {}", self.program, e)))?;

        // Drain stderr on its own thread so a chatty child cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                BufReader::new(stderr)
                    .lines()
                    .map_while(|line| line.ok())
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                if !line.is_empty() {
                    verbose_println(self.verbose, &line);
                }
            }
        }

        let stderr_lines = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        for line in &stderr_lines {
            error_println(line);
        }

        let status = child
            .wait()
            .map_err(|e| failure(format!("failed to wait for '{}': {}", self.program, e)))?;

        if !status.success() {
            let detail = stderr_lines.last().cloned().unwrap_or_default();
            return Err(failure(format!("'{}' exited with {} {}", self.program, status, detail)
                .trim_end()
                .to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub requests: Vec<ExtractionRequest>,
    pub failures: Vec<ProcessingError>,
}

impl ExtractionSummary {
    pub fn succeeded(&self) -> usize {
        self.requests.len() - self.failures.len()
    }
}

/// Run the extractor once per directory under `input_root` that holds at least one
/// source file, subdirectories first.
///
/// Output goes to the mirrored location under `output_root`. A failed directory is
/// recorded and the walk continues; only a missing `input_root` is an error.
pub fn extract_tree(
    input_root: &Path,
    output_root: &Path,
    spec: &ExportSpec,
    options: &ExtractionOptions,
    extractor: &dyn Extractor,
) -> Result<ExtractionSummary> {
    if !input_root.is_dir() {
        return Err(ProcessingError::RootNotFound(input_root.to_path_buf()));
    }

    let extensions = vec![options.source_extension.to_lowercase()];
    let mut summary = ExtractionSummary::default();

    let walker = WalkDir::new(input_root)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn_println(&format!("Skipping unreadable entry: {}", e));
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let has_sources = WalkDir::new(entry.path())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file() && has_valid_extension(e.path(), &extensions));
        if !has_sources {
            continue;
        }

        let destination = match mirror_path(entry.path(), input_root, output_root) {
            Some(destination) => destination,
            None => continue,
        };

        let request = ExtractionRequest::new(entry.path().to_path_buf(), destination, spec, options);
        match extractor.extract(&request) {
            Ok(()) => {
                if options.json_progress {
                    JsonMessage::extraction_completed(&request.source_dir, &request.destination_dir);
                } else {
                    println!(
                        "Source files in {} extracted to {}",
                        request.source_dir.display(),
                        request.destination_dir.display()
                    );
                }
            }
            Err(e) => {
                if options.json_progress {
                    JsonMessage::extraction_failed(&request.source_dir, e.to_string());
                } else {
                    error_println(&e.to_string());
                }
                summary.failures.push(e);
            }
        }
        summary.requests.push(request);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records requests and fails for any source directory whose name is listed
    struct RecordingExtractor {
        calls: Mutex<Vec<ExtractionRequest>>,
        fail_on: Vec<&'static str>,
    }

    impl RecordingExtractor {
        fn new(fail_on: Vec<&'static str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on,
            }
        }
    }

    impl Extractor for RecordingExtractor {
        fn extract(&self, request: &ExtractionRequest) -> Result<()> {
            self.calls.lock().unwrap().push(request.clone());
            let name = request.source_dir.file_name().unwrap().to_string_lossy();
            if self.fail_on.iter().any(|f| *f == name) {
                return Err(ProcessingError::Collaborator {
                    dir: request.source_dir.clone(),
                    reason: "exit status: 1".to_string(),
                });
            }
            Ok(())
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"FWS").unwrap();
    }

    #[test]
    fn test_request_args() {
        let spec = ExportSpec {
            scope: "classes".to_string(),
            export_size: 1024,
            ..Default::default()
        };
        let request = ExtractionRequest::new(
            PathBuf::from("input/heroes"),
            PathBuf::from("output/heroes"),
            &spec,
            &ExtractionOptions::default(),
        );
        assert_eq!(
            request.args(),
            vec![
                "-i", "input/heroes", "-o", "output/heroes", "-S", "classes", "-R", "true",
                "-d", "true", "-f", "[1]", "-w", "1024"
            ]
        );
    }

    #[test]
    fn test_extract_tree_visits_source_dirs_children_first() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        touch(&input.join("a/hero.swf"));
        touch(&input.join("a/c/pet.SWF"));
        touch(&input.join("b/readme.txt"));

        let extractor = RecordingExtractor::new(vec![]);
        let summary =
            extract_tree(&input, &output, &ExportSpec::default(), &ExtractionOptions::default(), &extractor)
                .unwrap();

        let calls = extractor.calls.into_inner().unwrap();
        let sources: Vec<_> = calls.iter().map(|r| r.source_dir.clone()).collect();
        assert_eq!(sources, vec![input.join("a/c"), input.join("a")]);
        assert_eq!(calls[0].destination_dir, output.join("a/c"));
        assert_eq!(calls[1].destination_dir, output.join("a"));
        assert_eq!(calls[0].export_width, 2048);
        assert_eq!(summary.succeeded(), 2);
    }

    #[test]
    fn test_request_honours_options() {
        let options = ExtractionOptions {
            frames: "[1,3]".to_string(),
            delete_original: false,
            ..Default::default()
        };
        let request = ExtractionRequest::new(
            PathBuf::from("input"),
            PathBuf::from("output"),
            &ExportSpec::default(),
            &options,
        );
        let args = request.args();
        assert_eq!(args[9], "false");
        assert_eq!(args[11], "[1,3]");
    }

    #[test]
    fn test_extract_tree_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        touch(&input.join("bad/x.swf"));
        touch(&input.join("good/y.swf"));

        let extractor = RecordingExtractor::new(vec!["bad"]);
        let summary =
            extract_tree(&input, &output, &ExportSpec::default(), &ExtractionOptions::default(), &extractor)
                .unwrap();

        assert_eq!(summary.requests.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind(), "CollaboratorFailure");
        assert_eq!(summary.succeeded(), 1);
    }

    #[test]
    fn test_extract_tree_missing_root() {
        let dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor::new(vec![]);
        let err = extract_tree(
            &dir.path().join("input"),
            &dir.path().join("output"),
            &ExportSpec::default(),
            &ExtractionOptions::default(),
            &extractor,
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_command_extractor_missing_program() {
        let extractor = CommandExtractor::new("definitely-not-an-installed-extractor", false);
        let request = ExtractionRequest::new(
            PathBuf::from("input"),
            PathBuf::from("output"),
            &ExportSpec::default(),
            &ExtractionOptions::default(),
        );
        let err = extractor.extract(&request).unwrap_err();
        assert_eq!(err.kind(), "CollaboratorFailure");
    }
}
