//! Engine availability check.

use std::process::ExitCode;

use console::style;

use vis_cli::config::{all_engines, EngineSettings};

/// Print availability of every OCR engine.
pub async fn cmd_check(settings: &EngineSettings) -> anyhow::Result<ExitCode> {
    println!("\n{}", style("OCR Engine Status").bold());
    println!("{}", "-".repeat(50));

    let mut selected_available = false;

    for engine in all_engines(settings) {
        let available = engine.is_available();
        let status = if available {
            style("✓ available").green()
        } else {
            style("✗ not available").red()
        };
        let marker = if engine.kind() == settings.engine {
            selected_available = available;
            style("→").green()
        } else {
            style(" ").dim()
        };

        println!("{} {:<15} {}", marker, engine.kind(), status);
        println!("                  {}", style(engine.availability_hint()).dim());
    }

    println!();

    if selected_available {
        println!("{} Selected engine is ready", style("✓").green());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Selected engine ({}) is not available",
            style("!").yellow(),
            settings.engine
        );
        Ok(ExitCode::FAILURE)
    }
}
