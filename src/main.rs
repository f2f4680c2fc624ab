use anyhow::{Context, Result};
use asm_decompiler::models::fragment::is_identifier;
use asm_decompiler::models::ProgressStage;
use asm_decompiler::report::save_report;
use asm_decompiler::{Config, Fragment, RunStatus};
use env_logger::Builder;
use log::{LevelFilter, info};
use std::io::Write;
use std::path::PathBuf;

fn print_usage(program: &str) {
    println!("ASM Decompiler v{}", asm_decompiler::VERSION);
    println!("\nUsage:");
    println!("  {} <FILE> [--function NAME] [--json] [--report PATH] [--config PATH]", program);
    println!("  {} --version", program);
    println!("\nOptions:");
    println!("  --function, -f NAME  Name of the function in the fragment");
    println!("  --json               Print the run as JSON");
    println!("  --report, -r PATH    Save a markdown verification report");
    println!("  --config, -c PATH    Load configuration from a JSON file");
    println!("  --version, -v        Show version information");
    println!("\nWithout --config, settings are read from DECOMP_* environment variables.");
}

// Simple CLI without clap
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --version command
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-v") {
        println!("ASM Decompiler v{}", asm_decompiler::VERSION);
        return Ok(());
    }

    if args.len() < 2 || args[1].starts_with('-') {
        print_usage(&args[0]);
        return Ok(());
    }

    let input_path = PathBuf::from(&args[1]);

    // Parse optional arguments
    let mut function_name = None;
    let mut json = false;
    let mut report_path = None;
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--function" | "-f" => {
                if i + 1 < args.len() {
                    if !is_identifier(args[i + 1].trim()) {
                        println!("Error: --function must be a C identifier, got '{}'", args[i + 1]);
                        return Ok(());
                    }
                    function_name = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    println!("Error: Missing value for --function");
                    return Ok(());
                }
            },
            "--json" => {
                json = true;
                i += 1;
            },
            "--report" | "-r" => {
                if i + 1 < args.len() {
                    report_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    println!("Error: Missing value for --report");
                    return Ok(());
                }
            },
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    println!("Error: Missing value for --config");
                    return Ok(());
                }
            },
            _ => {
                println!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };

    // Initialize logger
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.args()
            )
        })
        .filter(None, if config.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let text = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read assembly file: {}", input_path.display()))?;
    let fragment = match &function_name {
        Some(name) => Fragment::with_identifier(text, name),
        None => Fragment::new(text),
    };
    let fragment = match input_path.file_name() {
        Some(name) => fragment.with_origin(name.to_string_lossy()),
        None => fragment,
    };

    let store = config.build_store();
    let coordinator = config.build_coordinator(store)?;

    // Show progress messages
    let mut progress = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            println!("[{:>3}%] {}", event.percent_complete, event.message);
            if matches!(event.stage, ProgressStage::Complete | ProgressStage::Failed) {
                break;
            }
        }
    });

    println!("Decompiling {} from {}", fragment.identifier(), input_path.display());
    let result = coordinator.run(&fragment).await;
    let _ = printer.await;
    let run = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("\nFunction:   {}", run.fragment_identifier());
        println!("Status:     {}", run.status());
        println!("Match:      {}%", run.match_percentage().unwrap_or(0));
        println!("Confidence: {:.2}", run.confidence());
        for diagnostic in run.compile_errors() {
            println!("Compiler:   {}", diagnostic);
        }
        if let Some(discrepancies) = run.discrepancies().filter(|d| !d.is_empty()) {
            println!("Issues:     {}", discrepancies.join(", "));
        }
        println!("\n{}", run.candidate_source());
    }

    if let Some(path) = report_path {
        let saved = save_report(std::slice::from_ref(&run), &path)?;
        println!("Report saved to: {}", saved.display());
    }

    if run.status() != RunStatus::Success {
        info!("Run {} finished with status {}", run.id(), run.status());
    }

    Ok(())
}
