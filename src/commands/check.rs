//! Check command implementation.
//!
//! Runs one acquisition against the configured source and reports what the
//! parser made of it.

use anyhow::Result;
use chrono::Utc;
use proc_power_sampler::config::{validate_effective_config, Config};
use proc_power_sampler::parser::parse_batch;
use proc_power_sampler::source::{CommandSource, FileSource, MetricsSource};
use std::time::Instant;

/// Validates config and source; exits with status 1 when a check fails.
pub async fn command_check(config: &Config, verbose: bool) -> Result<()> {
    println!("🔍 Proc Power Sampler - System Check");
    println!("====================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {:#}", e);
            all_ok = false;
        }
    }

    println!("\n📡 Checking metrics source...");
    let format = config.line_format();
    let start = Instant::now();
    let acquired = match &config.source_file {
        Some(path) => {
            let source = FileSource::new(path);
            println!("   ├─ Source: {}", source.describe());
            source.acquire().await
        }
        None => {
            let (program, args) = config.command();
            let source = CommandSource::new(program, args, config.acquire_timeout());
            println!("   ├─ Source: {}", source.describe());
            source.acquire().await
        }
    };

    match acquired {
        Ok(lines) => {
            let batch = parse_batch(&lines, format, Utc::now());
            println!(
                "   ✅ Acquired {} lines in {:.2}ms",
                lines.len(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            println!(
                "   📊 Parsed {} samples ({:?} format), skipped {} lines",
                batch.samples.len(),
                format,
                batch.skipped
            );
            if batch.samples.is_empty() {
                println!("   ❌ No samples parsed - is the source format correct?");
                all_ok = false;
            }
            if verbose {
                for sample in &batch.samples {
                    println!(
                        "   │  ├─ {} cpu={:.2} mem={:.2}",
                        sample.name, sample.cpu_usage, sample.mem_usage
                    );
                }
            }
        }
        Err(e) => {
            println!("   ❌ Acquisition failed: {:#}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - collector is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
