//! Killcam Simulator CLI
//!
//! Run deterministic replay scenarios, or play a recorded kill payload
//! headless and check it.

use std::path::PathBuf;

use clap::Parser;
use killcam_core::config::KillcamConfig;
use killcam_core::payload::KillPayload;
use killcam_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Killcam deterministic replay harness
#[derive(Parser, Debug)]
#[command(name = "killcam-sim")]
#[command(about = "Run deterministic replay scenarios for the killcam engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (straight_shot, late_models, teardown_race, follow_switch, pause_resume, crowd, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Virtual seconds of playback per run
    #[arg(short, long, default_value = "12")]
    duration: f64,

    /// Engine config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Play this kill payload (JSON) instead of the scenarios
    #[arg(short, long)]
    payload: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single run to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Stream frames to a Rerun viewer
    #[arg(long)]
    visualize: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Killcam Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match &args.config {
        Some(path) => KillcamConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => KillcamConfig::default(),
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        let mut runner = ScenarioRunner::new(seed)
            .with_config(config.clone())
            .with_duration(args.duration);
        if args.export.is_some() {
            runner = runner.with_export();
        }
        if args.visualize {
            runner = runner.with_visualization();
        }
        runner
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    if let Some(path) = &args.payload {
        let payload = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| KillPayload::from_json(&text).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| {
                eprintln!("Error: failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            });

        if !args.json {
            info!(
                "Payload impact {}: {} bystanders, t = {:.1}..{:.1}s",
                payload.impact_id,
                payload.other.len(),
                payload.min_ts,
                payload.max_ts
            );
        }
        all_results.push(runner_for(base_seed).play_payload(&payload));
    } else {
        // Parse scenarios
        let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
            ScenarioId::all()
        } else {
            vec![args.scenario.parse().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                eprintln!(
                    "Available scenarios: {}, all",
                    ScenarioId::all().iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
                );
                std::process::exit(1);
            })]
        };

        if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
            eprintln!("Error: --export only supports a single scenario and seed");
            std::process::exit(1);
        }

        for seed_offset in 0..args.seeds {
            let seed = base_seed.wrapping_add(seed_offset as u64);
            let runner = runner_for(seed);

            for scenario in &scenarios {
                all_results.push(runner.run(*scenario));
            }
        }
    }

    if let Some(export_path) = &args.export {
        if let Some(export) = all_results.first().and_then(|r| r.export.as_ref()) {
            match export.write_to_file(export_path) {
                Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path.display()),
                Err(e) => error!("Failed to write export: {:?}", e),
            }
        }
    }

    if !args.json {
        for result in &all_results {
            if result.passed {
                info!("✓ {} (seed={}) PASSED", result.scenario, result.seed);
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} runs passed!", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
