//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::PlaybackConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    file: String,
    realtime: bool,
    speed: f64,
    streams: Vec<String>,
    motion: bool,
    prefetch_depth: usize,
    index_batch: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    file: config.file.display().to_string(),
                    realtime: config.pacing.realtime,
                    speed: config.pacing.speed,
                    streams: config.streams.enabled.iter().map(ToString::to_string).collect(),
                    motion: config.streams.motion,
                    prefetch_depth: config.prefetch.depth,
                    index_batch: config.prefetch.index_batch,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &PlaybackConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.file.exists() {
        warnings.push(format!(
            "Recording {} does not exist yet",
            config.file.display()
        ));
    }

    if config.streams.enabled.is_empty() {
        warnings.push("streams.enabled is empty - every recorded stream will be played".to_string());
    }

    if config.motion.drop_late && !config.pacing.realtime {
        warnings.push("motion.drop_late has no effect without realtime pacing".to_string());
    }

    if config.motion.drop_late && !config.streams.motion {
        warnings.push("motion.drop_late is set but motion samples are disabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Recording: {}", summary.file);
            println!("  Realtime: {} (speed {})", summary.realtime, summary.speed);
            if summary.streams.is_empty() {
                println!("  Streams: all");
            } else {
                println!("  Streams: {}", summary.streams.join(", "));
            }
            println!("  Motion: {}", summary.motion);
            println!("  Prefetch depth: {}", summary.prefetch_depth);
            println!("  Index batch: {}", summary.index_batch);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config() {
        let result = validate_config(Path::new("/nonexistent/playback.toml"));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playback.toml");
        std::fs::write(
            &path,
            "file = \"missing.rscp\"\n[pacing]\nrealtime = false\n[motion]\ndrop_late = true\n",
        )
        .unwrap();

        let result = validate_config(&path);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("does not exist")));
        assert!(warnings.iter().any(|w| w.contains("without realtime")));
        assert!(!result.summary.unwrap().realtime);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playback.toml");
        std::fs::write(&path, "file = \"a.rscp\"\n[prefetch]\ndepth = 0\n").unwrap();

        let result = validate_config(&path);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }
}
