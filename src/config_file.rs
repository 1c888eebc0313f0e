use crate::cli::{Args, ExplicitArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Saved run configuration, all keys optional
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub scope: Option<String>,
    pub export_size: Option<u32>,
    pub trim: Option<bool>,
    pub sizes: Option<Vec<u32>>,
    pub square: Option<bool>,
    pub skip_extract: Option<bool>,
    pub extractor: Option<String>,
    pub source_extension: Option<String>,
    pub frames: Option<String>,
    pub extensions: Option<String>,
    pub jobs: Option<usize>,
    pub verbose: Option<bool>,
    pub report: Option<bool>,
}

impl ConfigFile {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid configuration JSON")
    }
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments.
    /// Arguments listed in `explicit` take precedence over config file values.
    pub fn load_and_merge_config(&mut self, explicit: &ExplicitArgs) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config = ConfigFile::from_json(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            self.merge_from_config(config, explicit);

            if self.verbose {
                eprintln!("Loaded configuration from: {:?}", config_path);
            }
        }
        Ok(())
    }

    pub fn merge_from_config(&mut self, config: ConfigFile, explicit: &ExplicitArgs) {
        if !explicit.contains("input_dir") {
            if let Some(input) = config.input_path {
                self.input_dir = PathBuf::from(input);
            }
        }

        if !explicit.contains("output_dir") {
            if let Some(output) = config.output_path {
                self.output_dir = PathBuf::from(output);
            }
        }

        if !explicit.contains("scope") {
            if let Some(scope) = config.scope {
                self.scope = scope;
            }
        }

        if !explicit.contains("export_size") {
            if let Some(size) = config.export_size {
                self.export_size = size;
            }
        }

        if !explicit.contains("sizes") {
            if let Some(sizes) = config.sizes {
                self.sizes = if sizes.is_empty() {
                    "none".to_string()
                } else {
                    sizes
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                };
            }
        }

        if !explicit.contains("extractor") {
            if let Some(extractor) = config.extractor {
                self.extractor = extractor;
            }
        }

        if !explicit.contains("source_extension") {
            if let Some(ext) = config.source_extension {
                self.source_extension = ext;
            }
        }

        if !explicit.contains("frames") {
            if let Some(frames) = config.frames {
                self.frames = frames;
            }
        }

        if self.extensions_str.is_none() {
            self.extensions_str = config.extensions;
        }

        if !explicit.contains("jobs") {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        // Negative flags - only apply if currently false (default)
        if !self.no_trim {
            self.no_trim = !config.trim.unwrap_or(true);
        }

        if !self.no_square {
            self.no_square = !config.square.unwrap_or(true);
        }

        if !self.skip_extract {
            self.skip_extract = config.skip_extract.unwrap_or(false);
        }

        if !self.verbose {
            self.verbose = config.verbose.unwrap_or(false);
        }

        if !self.report {
            self.report = config.report.unwrap_or(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> (Args, ExplicitArgs) {
        Args::try_parse_with_sources(args).unwrap()
    }

    #[test]
    fn test_config_fills_unset_options() {
        let config = ConfigFile::from_json(
            r#"{
                "inputPath": "assets/in",
                "scope": "classes",
                "exportSize": 512,
                "trim": false,
                "sizes": [16, 48],
                "square": false,
                "extensions": "png"
            }"#,
        )
        .unwrap();

        let (mut args, cli) = argv(&["sprite-processor"]);
        args.merge_from_config(config, &cli);

        assert_eq!(args.input_dir, PathBuf::from("assets/in"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        let spec = args.export_spec().unwrap();
        assert_eq!(spec.scope, "classes");
        assert_eq!(spec.export_size, 512);
        assert!(!spec.trim);
        assert_eq!(spec.target_sizes, vec![16, 48]);
        assert!(!spec.square_output);
        assert_eq!(args.parse_extensions(), vec!["png"]);
    }

    #[test]
    fn test_cli_flags_win_over_config() {
        let config = ConfigFile::from_json(r#"{"scope": "classes", "sizes": [], "jobs": 8}"#).unwrap();

        let (mut args, cli) = argv(&["sprite-processor", "--scope=main", "-s", "128", "-j", "2"]);
        args.merge_from_config(config, &cli);

        assert_eq!(args.scope, "main");
        assert_eq!(args.parse_sizes().unwrap(), vec![128]);
        assert_eq!(args.jobs, 2);
    }

    #[test]
    fn test_attached_short_values_win_over_config() {
        let config =
            ConfigFile::from_json(r#"{"jobs": 8, "sizes": [16], "outputPath": "cfg_out", "inputPath": "cfg_in"}"#)
                .unwrap();

        let (mut args, cli) = argv(&["sprite-processor", "-j4", "-s64", "-ocli_out"]);
        args.merge_from_config(config, &cli);

        assert_eq!(args.jobs, 4);
        assert_eq!(args.parse_sizes().unwrap(), vec![64]);
        assert_eq!(args.output_dir, PathBuf::from("cli_out"));
        assert_eq!(args.input_dir, PathBuf::from("cfg_in"));
    }

    #[test]
    fn test_empty_sizes_in_config_disable_resizing() {
        let config = ConfigFile::from_json(r#"{"sizes": []}"#).unwrap();
        let (mut args, cli) = argv(&["sprite-processor"]);
        args.merge_from_config(config, &cli);
        assert!(args.parse_sizes().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(ConfigFile::from_json(r#"{"exportSize": "big"}"#).is_err());
    }
}
