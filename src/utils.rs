use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    if args.input_dir.exists() && !args.input_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Input path is not a directory: {}",
            args.input_dir.display()
        ));
    }

    if args.output_dir.exists() && !args.output_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Output path is not a directory: {}",
            args.output_dir.display()
        ));
    }

    args.parse_sizes().map_err(|e| anyhow::anyhow!(e))?;

    if args.export_size == 0 {
        return Err(anyhow::anyhow!("Export size must be greater than 0"));
    }

    if args.source_extension.trim().is_empty() {
        return Err(anyhow::anyhow!("Source extension must not be empty"));
    }

    Ok(())
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext)
    } else {
        false
    }
}

/// Map a path under `input_root` to the same relative location under `output_root`.
///
/// Only the leading `input_root` prefix is substituted; a directory deeper in the
/// tree that happens to share its name is kept as is. Returns `None` for paths
/// outside `input_root`.
pub fn mirror_path(path: &Path, input_root: &Path, output_root: &Path) -> Option<PathBuf> {
    path.strip_prefix(input_root)
        .ok()
        .map(|relative| output_root.join(relative))
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message to stderr
pub fn warn_println(message: &str) {
    eprintln!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_has_valid_extension() {
        let exts = vec!["png".to_string(), "webp".to_string()];
        assert!(has_valid_extension(Path::new("output/a/Idle.PNG"), &exts));
        assert!(has_valid_extension(Path::new("b.webp"), &exts));
        assert!(!has_valid_extension(Path::new("c.swf"), &exts));
        assert!(!has_valid_extension(Path::new("no_extension"), &exts));
    }

    #[test]
    fn test_mirror_path_substitutes_first_segment_only() {
        assert_eq!(
            mirror_path(
                Path::new("input/sprites/input/hero"),
                Path::new("input"),
                Path::new("output")
            ),
            Some(PathBuf::from("output/sprites/input/hero"))
        );
        assert_eq!(
            mirror_path(Path::new("input"), Path::new("input"), Path::new("output")),
            Some(PathBuf::from("output"))
        );
    }

    #[test]
    fn test_mirror_path_outside_root() {
        assert_eq!(
            mirror_path(Path::new("assets/input/x"), Path::new("input"), Path::new("output")),
            None
        );
        // Component-wise: "inputs" does not start with "input"
        assert_eq!(
            mirror_path(Path::new("inputs/x"), Path::new("input"), Path::new("output")),
            None
        );
    }

    #[test]
    fn test_validate_inputs_rejects_bad_sizes() {
        let args = Args {
            sizes: "32,abc".to_string(),
            ..Default::default()
        };
        assert!(validate_inputs(&args).is_err());

        let args = Args {
            jobs: 64,
            ..Default::default()
        };
        assert!(validate_inputs(&args).is_ok());

        assert!(validate_inputs(&Args::default()).is_ok());
    }
}
