use anyhow::{Context, Result};
use console::{style, Term};
use std::time::Instant;

use sprite_processor::cli::Args;
use sprite_processor::extraction::{extract_tree, CommandExtractor};
use sprite_processor::image_processing::ProcessingEngine;
use sprite_processor::json_output::JsonMessage;
use sprite_processor::prompt::prompt_export_spec;
use sprite_processor::report::ProcessingReport;
use sprite_processor::utils::{create_progress_bar, format_duration, validate_inputs, verbose_println};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let (mut args, explicit) = Args::parse_with_sources();
    args.load_and_merge_config(&explicit)?;

    let quiet = args.json_progress;

    if !quiet {
        println!("{}", style("Sprite Processor").bold().blue());
        println!("{}", style("Extract, trim and resize sprite exports").dim());
        println!();
    }

    validate_inputs(&args)?;

    let mut spec = args.export_spec().map_err(|e| anyhow::anyhow!(e))?;
    if args.interactive {
        spec = prompt_export_spec(&mut Term::stdout(), &spec)?;
    }
    spec.validate().context("Invalid export options")?;

    let config = args.processing_config(spec.clone());

    if config.log_verbose() {
        println!("{}", style("Configuration:").bold());
        println!("  Input: {}", args.input_dir.display());
        println!("  Output: {}", args.output_dir.display());
        println!("  Scope: {}", spec.scope);
        println!("  Export size: {}", spec.export_size);
        println!("  Trim: {}", spec.trim);
        println!("  Sizes: {:?}", spec.target_sizes);
        println!("  Square output: {}", spec.square_output);
        println!("  Parallel jobs: {}", config.parallel_jobs);
        if !config.extensions.is_empty() {
            println!("  Extensions: {:?}", config.extensions);
        }
        println!();
    }

    std::fs::create_dir_all(&args.input_dir).context("Failed to create input directory")?;
    std::fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    // Stage 1: raw frames from the external extractor
    if args.skip_extract {
        verbose_println(config.log_verbose(), "Skipping extraction");
    } else {
        if !quiet {
            println!("{}", style("Generating images...").bold());
        }
        let extractor = CommandExtractor::new(args.extractor.clone(), config.log_verbose());
        let extraction = extract_tree(
            &args.input_dir,
            &args.output_dir,
            &spec,
            &args.extraction_options(),
            &extractor,
        )?;

        if !quiet && !extraction.failures.is_empty() {
            println!(
                "{}",
                style(format!(
                    "⚠ Extraction failed in {} of {} directories",
                    extraction.failures.len(),
                    extraction.requests.len()
                ))
                .bold()
                .yellow()
            );
        }
    }

    // Stage 2: trim and resize
    if !spec.needs_postprocess() {
        verbose_println(config.log_verbose(), "Nothing to trim or resize");
        return Ok(());
    }

    if !quiet {
        println!("{}", style("Resizing images...").bold());
    }

    let engine = ProcessingEngine::new(config)?;
    let progress = if quiet {
        indicatif::ProgressBar::hidden()
    } else {
        create_progress_bar(0)
    };

    let summary = engine.run(&args.output_dir, &progress)?;
    progress.finish_with_message("✓ Processing complete!");

    let successful = summary.successful();
    let failed = summary.failed();
    let total_time = start_time.elapsed();

    if quiet {
        JsonMessage::summary(summary.files.len(), successful, failed, total_time.as_secs_f64());
        return Ok(());
    }

    println!();
    println!("{}", style("Results Summary:").bold().green());
    println!("  Directories visited: {}", summary.directories);
    println!("  Successfully processed: {}", style(successful).bold().green());
    println!("  Variants written: {}", summary.variants_written());
    if failed > 0 {
        println!("  Failed: {}", style(failed).bold().red());
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!("  Total processing time: {}", style(format_duration(total_time)).bold());
    if !summary.files.is_empty() {
        println!(
            "  Average time per image: {}",
            style(format_duration(summary.duration / summary.files.len() as u32)).dim()
        );
        println!("  Throughput: {:.1} images/s", summary.items_per_second());
    }

    if args.report {
        ProcessingReport::from_summary(&summary).print();
    }

    if failed > 0 || !summary.directory_errors.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        let file_errors = summary
            .files
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (&r.path, e)));
        let dir_errors = summary.directory_errors.iter().map(|(p, e)| (p, e));

        for (i, (path, e)) in file_errors.chain(dir_errors).enumerate() {
            println!(
                "  {}: {} - {}",
                style(format!("#{}", i + 1)).dim(),
                style(path.display()).bold().red(),
                e
            );
        }
        println!("  Check the files above and try again with --verbose for more details");
    }

    Ok(())
}
