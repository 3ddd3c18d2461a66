//! # Capture Player CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 录制文件回放（实时节奏或尽快）
//! - 录制信息查看与配置验证
//! - 合成录制文件生成
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use observability::{LogFormat, ObservabilityConfig};

use cli::{Cli, Commands};
use commands::{run_info, run_play, run_synth, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Capture Player starting"
    );

    let result = match &cli.command {
        Commands::Play(args) => run_play(args).await,
        Commands::Info(args) => run_info(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Synth(args) => run_synth(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let log_format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };
    let config = ObservabilityConfig {
        log_format,
        ..Default::default()
    }
    .with_verbosity(cli.verbose, cli.quiet);

    observability::init_with_config(config)
}
