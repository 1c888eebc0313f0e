use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::extraction::{ExtractionOptions, DEFAULT_EXTRACTOR, DEFAULT_FRAMES, DEFAULT_SOURCE_EXTENSION};
use crate::image_processing::{ExportSpec, ProcessingConfig, DEFAULT_EXPORT_SIZE, DEFAULT_SCOPE};

pub const DEFAULT_SIZES: &str = "32,64,128,256,512";

#[derive(Parser, Debug)]
#[command(
    name = "sprite-processor",
    about = "Extract, trim and resize sprite exports",
    long_about = "
Sprite Processor

Runs the external extractor over every directory of the input tree that contains
source assets, writing raw frames into the mirrored output tree. The output tree is
then post-processed: transparent padding is trimmed and resized variants are written
into one subdirectory per size.

Example Usage:
  # Defaults: scope 'main', 2048px export, trim, sizes 32..512 letterboxed
  sprite-processor -i input -o output

  # Trim only, keep the raw export size
  sprite-processor --sizes none

  # Aspect-matched (non-square) variants at two sizes
  sprite-processor --sizes 64,128 --no-square

  # Post-process an existing output tree without running the extractor
  sprite-processor -o output --skip-extract --report

  # Ask for every option interactively
  sprite-processor --interactive"
)]
pub struct Args {
    /// Root of the source asset tree
    #[arg(short = 'i', long = "input", default_value = "input", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Root of the mirrored output tree
    #[arg(short = 'o', long = "output", default_value = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Extraction scope handed to the extractor (e.g. classes, main)
    #[arg(long = "scope", default_value = DEFAULT_SCOPE)]
    pub scope: String,

    /// Raw export width requested from the extractor
    #[arg(long = "export-size", default_value_t = DEFAULT_EXPORT_SIZE, value_name = "PX")]
    pub export_size: u32,

    /// Keep transparent padding around sprites
    #[arg(long = "no-trim")]
    pub no_trim: bool,

    /// Comma-separated output sizes; "0" or "none" disables resizing
    #[arg(short = 's', long = "sizes", default_value = DEFAULT_SIZES, value_name = "LIST")]
    pub sizes: String,

    /// Stretch to the source aspect ratio instead of letterboxing into a square
    #[arg(long = "no-square")]
    pub no_square: bool,

    /// Do not run the extractor, only post-process the output tree
    #[arg(long = "skip-extract")]
    pub skip_extract: bool,

    /// Extractor executable
    #[arg(long = "extractor", default_value = DEFAULT_EXTRACTOR, value_name = "PROGRAM")]
    pub extractor: String,

    /// Extension of source assets that trigger extraction
    #[arg(long = "source-extension", default_value = DEFAULT_SOURCE_EXTENSION, value_name = "EXT")]
    pub source_extension: String,

    /// Frame-selection expression passed to the extractor
    #[arg(long = "frames", default_value = DEFAULT_FRAMES, value_name = "EXPR")]
    pub frames: String,

    /// Comma-separated raster extensions to post-process (default: every file)
    #[arg(long = "extensions", value_name = "LIST")]
    pub extensions_str: Option<String>,

    /// JSON configuration file; explicit command line flags win
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Prompt for scope, export size, trim, sizes and square output
    #[arg(long = "interactive")]
    pub interactive: bool,

    /// Number of parallel processing jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "1", value_name = "N")]
    pub jobs: usize,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Emit progress and results as JSON lines instead of styled output
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// Print a table with the result of every file at the end
    #[arg(long = "report")]
    pub report: bool,
}

/// Parse a comma-separated size list. "0", "none" and the empty string mean no sizes.
pub fn parse_sizes(input: &str) -> Result<Vec<u32>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|part| {
            let part = part.trim();
            let size = part
                .parse::<u32>()
                .map_err(|_| format!("Invalid size: '{}'", part))?;
            if size == 0 {
                return Err("Sizes must be greater than 0".to_string());
            }
            Ok(size)
        })
        .collect()
}

/// Ids of the arguments typed on the command line rather than filled from defaults
pub type ExplicitArgs = HashSet<String>;

fn explicit_args(matches: &ArgMatches) -> ExplicitArgs {
    matches
        .ids()
        .filter(|id| matches.value_source(id.as_str()) == Some(ValueSource::CommandLine))
        .map(|id| id.as_str().to_string())
        .collect()
}

impl Args {
    /// Parse the process arguments, keeping track of which ones were given explicitly
    pub fn parse_with_sources() -> (Self, ExplicitArgs) {
        let matches = Self::command().get_matches();
        match Self::from_arg_matches(&matches) {
            Ok(args) => (args, explicit_args(&matches)),
            Err(e) => e.format(&mut Self::command()).exit(),
        }
    }

    pub fn try_parse_with_sources<I, T>(itr: I) -> Result<(Self, ExplicitArgs), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(itr)?;
        let args = Self::from_arg_matches(&matches)?;
        Ok((args, explicit_args(&matches)))
    }

    pub fn parse_sizes(&self) -> Result<Vec<u32>, String> {
        parse_sizes(&self.sizes)
    }

    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        self.extensions_str
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn trim(&self) -> bool {
        !self.no_trim
    }

    pub fn square_output(&self) -> bool {
        !self.no_square
    }

    pub fn parallel_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    pub fn export_spec(&self) -> Result<ExportSpec, String> {
        Ok(ExportSpec {
            scope: self.scope.clone(),
            export_size: self.export_size,
            trim: self.trim(),
            target_sizes: self.parse_sizes()?,
            square_output: self.square_output(),
        })
    }

    pub fn processing_config(&self, spec: ExportSpec) -> ProcessingConfig {
        ProcessingConfig {
            spec,
            extensions: self.parse_extensions(),
            verbose: self.verbose,
            parallel_jobs: self.parallel_jobs(),
            json_progress: self.json_progress,
        }
    }

    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            source_extension: self.source_extension.trim_start_matches('.').to_string(),
            frames: self.frames.clone(),
            json_progress: self.json_progress,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_sizes("32,64,128").unwrap(), vec![32, 64, 128]);
        assert_eq!(parse_sizes(" 256 , 16 ").unwrap(), vec![256, 16]);
        assert!(parse_sizes("0").unwrap().is_empty());
        assert!(parse_sizes("None").unwrap().is_empty());
        assert!(parse_sizes("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sizes_invalid() {
        assert!(parse_sizes("32,,64").is_err());
        assert!(parse_sizes("32,0").is_err());
        assert!(parse_sizes("-5").is_err());
        assert!(parse_sizes("big").is_err());
    }

    #[test]
    fn test_default_args_build_default_spec() {
        let args = Args::try_parse_from(["sprite-processor"]).unwrap();
        assert_eq!(args.export_spec().unwrap(), ExportSpec::default());
        assert_eq!(args.input_dir, PathBuf::from("input"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert!(args.parse_extensions().is_empty());
    }

    #[test]
    fn test_flags_map_onto_spec() {
        let args = Args::try_parse_from([
            "sprite-processor",
            "--scope",
            "classes",
            "--export-size",
            "1024",
            "--no-trim",
            "-s",
            "64",
            "--no-square",
            "--extensions",
            "PNG, .webp",
        ])
        .unwrap();

        let spec = args.export_spec().unwrap();
        assert_eq!(spec.scope, "classes");
        assert_eq!(spec.export_size, 1024);
        assert!(!spec.trim);
        assert_eq!(spec.target_sizes, vec![64]);
        assert!(!spec.square_output);
        assert_eq!(args.parse_extensions(), vec!["png", "webp"]);
    }

    #[test]
    fn test_explicit_args_cover_attached_values() {
        let (args, explicit) =
            Args::try_parse_with_sources(["sprite-processor", "-j4", "-s64", "-ocli_out", "--scope=classes"])
                .unwrap();

        assert_eq!(args.jobs, 4);
        for id in ["jobs", "sizes", "output_dir", "scope"] {
            assert!(explicit.contains(id), "{} should be explicit", id);
        }
        assert!(!explicit.contains("input_dir"));
        assert!(!explicit.contains("export_size"));
    }

    #[test]
    fn test_parallel_jobs_auto() {
        let args = Args {
            jobs: 0,
            ..Default::default()
        };
        assert!(args.parallel_jobs() >= 1);
    }
}

// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            scope: DEFAULT_SCOPE.to_string(),
            export_size: DEFAULT_EXPORT_SIZE,
            no_trim: false,
            sizes: DEFAULT_SIZES.to_string(),
            no_square: false,
            skip_extract: false,
            extractor: DEFAULT_EXTRACTOR.to_string(),
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            frames: DEFAULT_FRAMES.to_string(),
            extensions_str: None,
            config_file: None,
            interactive: false,
            jobs: 1,
            verbose: false,
            json_progress: false,
            report: false,
        }
    }
}
