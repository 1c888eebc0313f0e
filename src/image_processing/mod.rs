pub mod batch;
pub mod resize;
pub mod trim;

use image::{DynamicImage, ImageFormat, RgbaImage};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{ProcessingError, Result};
use crate::utils::verbose_println;

pub use batch::{BatchSummary, FileReport};
pub use resize::{fit_geometry, resize_fit, resize_stretch, resize_to_size, FitGeometry};
pub use trim::{alpha_bounding_box, trim, BoundingBox};

/// In-memory RGBA8 raster, row-major with the origin at the top-left
pub type PixelBuffer = RgbaImage;

pub const DEFAULT_SCOPE: &str = "main";
pub const DEFAULT_EXPORT_SIZE: u32 = 2048;
pub const DEFAULT_TARGET_SIZES: [u32; 5] = [32, 64, 128, 256, 512];

/// Options governing one run, fixed once gathered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    /// Extraction granularity handed to the extractor untouched
    pub scope: String,
    /// Raw export width requested from the extractor
    pub export_size: u32,
    pub trim: bool,
    /// Resized variants to produce, in order; empty disables resizing
    pub target_sizes: Vec<u32>,
    /// Letterbox into a square canvas instead of stretching to the source aspect
    pub square_output: bool,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
            export_size: DEFAULT_EXPORT_SIZE,
            trim: true,
            target_sizes: DEFAULT_TARGET_SIZES.to_vec(),
            square_output: true,
        }
    }
}

impl ExportSpec {
    pub fn validate(&self) -> Result<()> {
        if self.export_size == 0 {
            return Err(ProcessingError::InvalidTarget {
                width: 0,
                height: 0,
            });
        }
        if let Some(&size) = self.target_sizes.iter().find(|&&s| s == 0) {
            return Err(ProcessingError::InvalidTarget {
                width: size,
                height: size,
            });
        }
        Ok(())
    }

    /// Whether the raster post-processing stage has anything to do
    pub fn needs_postprocess(&self) -> bool {
        self.trim || !self.target_sizes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub spec: ExportSpec,
    /// Lowercase extensions to attempt; empty means every file
    pub extensions: Vec<String>,
    pub verbose: bool,
    pub parallel_jobs: usize,
    pub json_progress: bool,
}

impl ProcessingConfig {
    pub fn new(spec: ExportSpec) -> Self {
        Self {
            spec,
            extensions: Vec::new(),
            verbose: false,
            parallel_jobs: 1,
            json_progress: false,
        }
    }

    /// Verbose lines go to stdout, which carries only JSON lines under `--json-progress`
    pub fn log_verbose(&self) -> bool {
        self.verbose && !self.json_progress
    }
}

/// What happened to a processed file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Variants written under size subdirectories, original removed
    Resized { variants: usize },
    /// Original overwritten with its trimmed content
    TrimmedInPlace,
    /// Nothing needed writing
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub input_path: PathBuf,
    pub original_dimensions: (u32, u32),
    pub trimmed_dimensions: (u32, u32),
    pub output_paths: Vec<PathBuf>,
    pub action: FileAction,
    pub processing_time: Duration,
}

pub struct ProcessingEngine {
    config: ProcessingConfig,
    pool: Option<rayon::ThreadPool>,
}

impl ProcessingEngine {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.spec.validate()?;

        // Files inside one directory may run concurrently; a single job stays inline
        let pool = if config.parallel_jobs > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.parallel_jobs)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn spec(&self) -> &ExportSpec {
        &self.config.spec
    }

    /// Trim and resize one raster file in place within its directory.
    ///
    /// Variants land in `<dir>/<size>/<file name>`. The original is deleted only
    /// after every variant has been written; a failure before that point leaves it
    /// on disk. With no sizes configured, a trimmed image overwrites the original.
    pub fn process_file(&self, input_path: &Path) -> Result<FileOutcome> {
        let start = Instant::now();
        let spec = self.spec();

        verbose_println(
            self.config.log_verbose(),
            &format!("Processing: {}", input_path.display()),
        );

        let file_name = input_path.file_name().ok_or_else(|| ProcessingError::Io {
            path: input_path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
        let parent = input_path.parent().unwrap_or_else(|| Path::new(""));

        let img = load_image(input_path)?;
        let original_dimensions = img.dimensions();

        let img = if spec.trim { trim::trim(img) } else { img };
        let trimmed_dimensions = img.dimensions();

        if trimmed_dimensions != original_dimensions {
            verbose_println(
                self.config.log_verbose(),
                &format!(
                    "Trimmed {}x{} -> {}x{}",
                    original_dimensions.0,
                    original_dimensions.1,
                    trimmed_dimensions.0,
                    trimmed_dimensions.1
                ),
            );
        }

        let mut output_paths = Vec::with_capacity(spec.target_sizes.len());

        let action = if !spec.target_sizes.is_empty() {
            for &size in &spec.target_sizes {
                let variant = resize::resize_to_size(&img, size, spec.square_output)?;

                let size_dir = parent.join(size.to_string());
                fs::create_dir_all(&size_dir).map_err(|e| ProcessingError::write(&size_dir, e))?;

                let output_path = size_dir.join(file_name);
                save_image(&variant, &output_path)?;
                output_paths.push(output_path);
            }

            fs::remove_file(input_path).map_err(|e| ProcessingError::write(input_path, e))?;

            FileAction::Resized {
                variants: output_paths.len(),
            }
        } else if trimmed_dimensions != original_dimensions {
            save_image(&img, input_path)?;
            output_paths.push(input_path.to_path_buf());
            FileAction::TrimmedInPlace
        } else {
            FileAction::Unchanged
        };

        Ok(FileOutcome {
            input_path: input_path.to_path_buf(),
            original_dimensions,
            trimmed_dimensions,
            output_paths,
            action,
            processing_time: start.elapsed(),
        })
    }

    /// Same as [`ProcessingEngine::process_file`] with the progress bar message kept current
    pub fn process_file_with_progress(
        &self,
        input_path: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<FileOutcome> {
        let filename = input_path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("unknown");

        progress_bar.set_message(format!("{} - Processing", filename));
        let result = self.process_file(input_path);
        progress_bar.inc(1);

        match &result {
            Ok(_) => progress_bar.set_message(format!("{} - Complete", filename)),
            Err(e) => progress_bar.set_message(format!("{} - Failed ({})", filename, e.kind())),
        }

        result
    }
}

/// Decode any supported raster into RGBA8; formats without alpha read as opaque
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path).map_err(|source| ProcessingError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Encode by file extension. JPEG has no alpha channel and is written as RGB.
pub fn save_image(img: &PixelBuffer, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).map_err(|e| ProcessingError::write(path, e))?;

    let saved = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(img.clone())
            .to_rgb8()
            .save_with_format(path, format),
        _ => img.save_with_format(path, format),
    };

    saved.map_err(|e| ProcessingError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn bordered_sprite(width: u32, height: u32, border: u32) -> PixelBuffer {
        RgbaImage::from_fn(width, height, |x, y| {
            if x >= border && y >= border && x < width - border && y < height - border {
                Rgba([30, 160, 90, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn engine(spec: ExportSpec) -> ProcessingEngine {
        ProcessingEngine::new(ProcessingConfig::new(spec)).unwrap()
    }

    #[test]
    fn test_export_spec_defaults() {
        let spec = ExportSpec::default();
        assert_eq!(spec.scope, "main");
        assert_eq!(spec.export_size, 2048);
        assert!(spec.trim);
        assert_eq!(spec.target_sizes, vec![32, 64, 128, 256, 512]);
        assert!(spec.square_output);
        assert!(spec.needs_postprocess());
    }

    #[test]
    fn test_export_spec_validation() {
        let spec = ExportSpec {
            target_sizes: vec![32, 0],
            ..Default::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(ProcessingError::InvalidTarget { .. })
        ));
        assert!(ProcessingEngine::new(ProcessingConfig::new(spec)).is_err());

        let idle = ExportSpec {
            trim: false,
            target_sizes: vec![],
            ..Default::default()
        };
        assert!(idle.validate().is_ok());
        assert!(!idle.needs_postprocess());
    }

    #[test]
    fn test_process_file_writes_variants_and_removes_original() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("hero.png");
        bordered_sprite(70, 70, 10).save(&input).unwrap();

        let spec = ExportSpec {
            target_sizes: vec![32, 64],
            ..Default::default()
        };
        let outcome = engine(spec).process_file(&input).unwrap();

        assert_eq!(outcome.original_dimensions, (70, 70));
        assert_eq!(outcome.trimmed_dimensions, (50, 50));
        assert_eq!(outcome.action, FileAction::Resized { variants: 2 });
        assert!(!input.exists());

        let small = image::open(dir.path().join("32").join("hero.png")).unwrap();
        let large = image::open(dir.path().join("64").join("hero.png")).unwrap();
        assert_eq!((small.width(), small.height()), (32, 32));
        assert_eq!((large.width(), large.height()), (64, 64));
    }

    #[test]
    fn test_process_file_stretch_mode() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("banner.png");
        RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]))
            .save(&input)
            .unwrap();

        let spec = ExportSpec {
            target_sizes: vec![32, 64],
            square_output: false,
            ..Default::default()
        };
        engine(spec).process_file(&input).unwrap();

        let small = image::open(dir.path().join("32").join("banner.png")).unwrap();
        let large = image::open(dir.path().join("64").join("banner.png")).unwrap();
        assert_eq!((small.width(), small.height()), (32, 16));
        assert_eq!((large.width(), large.height()), (64, 32));
    }

    #[test]
    fn test_process_file_trim_only_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("icon.png");
        bordered_sprite(70, 70, 10).save(&input).unwrap();

        let spec = ExportSpec {
            target_sizes: vec![],
            ..Default::default()
        };
        let outcome = engine(spec).process_file(&input).unwrap();

        assert_eq!(outcome.action, FileAction::TrimmedInPlace);
        let reloaded = image::open(&input).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (50, 50));

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no size subdirectories expected");
    }

    #[test]
    fn test_process_file_untrimmable_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.png");
        RgbaImage::new(12, 12).save(&input).unwrap();

        let spec = ExportSpec {
            target_sizes: vec![],
            ..Default::default()
        };
        let outcome = engine(spec).process_file(&input).unwrap();
        assert_eq!(outcome.action, FileAction::Unchanged);
        assert!(outcome.output_paths.is_empty());
        assert!(input.exists());
    }

    #[test]
    fn test_process_file_corrupt_input_keeps_original() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.png");
        fs::write(&input, b"definitely not a png").unwrap();

        let err = engine(ExportSpec::default())
            .process_file(&input)
            .unwrap_err();
        assert_eq!(err.kind(), "DecodeFailure");
        assert!(input.exists());
        assert!(!dir.path().join("32").exists());
    }

    #[test]
    fn test_process_file_blocked_size_dir_keeps_original() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("hero.png");
        bordered_sprite(70, 70, 10).save(&input).unwrap();
        // A regular file where the 64 directory should go
        fs::write(dir.path().join("64"), b"in the way").unwrap();

        let spec = ExportSpec {
            target_sizes: vec![32, 64],
            ..Default::default()
        };
        let err = engine(spec).process_file(&input).unwrap_err();

        assert_eq!(err.kind(), "WriteFailure");
        assert!(input.exists());
        let original = image::open(&input).unwrap();
        assert_eq!((original.width(), original.height()), (70, 70));
        assert!(dir.path().join("32").join("hero.png").exists());
    }

    #[test]
    fn test_verbose_lines_muted_for_json_progress() {
        let mut config = ProcessingConfig::new(ExportSpec::default());
        config.verbose = true;
        assert!(config.log_verbose());

        config.json_progress = true;
        assert!(!config.log_verbose());
    }

    #[test]
    fn test_save_image_jpeg_drops_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        save_image(&bordered_sprite(16, 16, 2), &path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (16, 16));
    }

    #[test]
    fn test_save_image_unknown_extension_is_write_failure() {
        let dir = TempDir::new().unwrap();
        let err = save_image(&bordered_sprite(4, 4, 1), &dir.path().join("frame.xyz")).unwrap_err();
        assert_eq!(err.kind(), "WriteFailure");
    }
}
