//! Batch analysis command.

use std::process::ExitCode;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use vis_cli::config::build_engine;
use vis_cli::discovery::find_images;
use vis_cli::output::ResultWriter;
use vis_cli::services::{BatchEvent, BatchRunner};

use super::AnalyzeArgs;

/// Exit status used when interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Analyze every image under the input directory and write the results.
pub async fn cmd_analyze(args: AnalyzeArgs, verbose: bool) -> anyhow::Result<ExitCode> {
    if !args.input_dir.is_dir() {
        anyhow::bail!("Not a directory: {}", args.input_dir.display());
    }

    let images = find_images(&args.input_dir)
        .with_context(|| format!("Failed to read {}", args.input_dir.display()))?;
    if images.is_empty() {
        tracing::warn!("No images found in {}", args.input_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let engine =
        build_engine(&args.engine.settings()).context("Failed to initialize OCR engine")?;

    tracing::info!("Processing {} images (recursive)...", images.len());
    tracing::info!("Using OCR engine: {}", engine.kind());

    let mut writer = ResultWriter::create(&args.output_dir, args.format)
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                args.output_dir.display()
            )
        })?
        .with_input_root(&args.input_dir);

    let runner = BatchRunner::new(engine).with_workers(args.workers);
    let (event_tx, mut event_rx) = mpsc::channel::<BatchEvent>(100);

    let event_handler = tokio::spawn(async move {
        let mut pb: Option<ProgressBar> = None;
        let mut done = 0usize;
        let mut total = 0usize;

        while let Some(event) = event_rx.recv().await {
            match event {
                BatchEvent::Started { total_images } => {
                    total = total_images;
                    let progress = ProgressBar::new(total_images as u64);
                    progress.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("█▓░"),
                    );
                    progress.set_message("Analyzing images...");
                    pb = Some(progress);
                }
                BatchEvent::ImageStarted { .. } => {}
                BatchEvent::ImageCompleted {
                    path,
                    success,
                    error,
                    ..
                } => {
                    done += 1;
                    if let Some(progress) = &pb {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        if verbose {
                            let mark = if success {
                                style("✓").green()
                            } else {
                                style("✗").red()
                            };
                            progress.println(format!("{} [{}/{}] {}", mark, done, total, name));
                        } else if let (false, Some(error)) = (success, error) {
                            progress.println(format!("{} {}: {}", style("✗").red(), name, error));
                        }
                        progress.inc(1);
                    }
                }
                BatchEvent::Complete { .. } => {
                    if let Some(progress) = pb.take() {
                        progress.finish_and_clear();
                    }
                }
            }
        }
    });

    let interrupt = async {
        // Without signal support the batch simply runs to completion.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = runner.process_until(&images, event_tx, interrupt).await;

    let _ = event_handler.await;

    writer
        .write_all(&report.results)
        .with_context(|| format!("Failed to write results to {}", args.output_dir.display()))?;

    let counts = report.counts;
    if report.interrupted {
        println!(
            "{} Interrupted: wrote {} of {} results",
            style("!").yellow(),
            counts.total,
            images.len()
        );
        println!("  Output directory: {}", args.output_dir.display());
        tracing::warn!("Interrupted after {}/{} images", counts.total, images.len());
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }

    if counts.failed > 0 {
        println!(
            "{} {} of {} images failed",
            style("!").yellow(),
            counts.failed,
            counts.total
        );
    }
    println!(
        "{} Complete: {}/{} successful",
        style("✓").green(),
        counts.succeeded,
        counts.total
    );
    println!("  Output directory: {}", args.output_dir.display());

    tracing::info!("Complete: {}/{} successful", counts.succeeded, counts.total);

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
