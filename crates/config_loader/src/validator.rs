//! 配置校验模块
//!
//! 校验规则：
//! - file 非空
//! - pacing.speed 为有限正数
//! - prefetch.depth >= 1, prefetch.index_batch >= 1
//! - streams.enabled 无重复

use std::collections::HashSet;

use contracts::{PlaybackConfig, PlaybackError};

/// 校验 PlaybackConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PlaybackConfig) -> Result<(), PlaybackError> {
    validate_file(config)?;
    validate_pacing(config)?;
    validate_prefetch(config)?;
    validate_streams(config)?;
    Ok(())
}

fn validate_file(config: &PlaybackConfig) -> Result<(), PlaybackError> {
    if config.file.as_os_str().is_empty() {
        return Err(PlaybackError::config_validation(
            "file",
            "recording path cannot be empty",
        ));
    }
    Ok(())
}

/// 校验回放速度
fn validate_pacing(config: &PlaybackConfig) -> Result<(), PlaybackError> {
    let speed = config.pacing.speed;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(PlaybackError::config_validation(
            "pacing.speed",
            format!("speed must be a finite value > 0, got {speed}"),
        ));
    }
    Ok(())
}

/// 校验预取参数
fn validate_prefetch(config: &PlaybackConfig) -> Result<(), PlaybackError> {
    let prefetch = &config.prefetch;
    if prefetch.depth == 0 {
        return Err(PlaybackError::config_validation(
            "prefetch.depth",
            "depth must be >= 1",
        ));
    }
    if prefetch.index_batch == 0 {
        return Err(PlaybackError::config_validation(
            "prefetch.index_batch",
            "index_batch must be >= 1",
        ));
    }
    Ok(())
}

/// 校验流选择无重复
fn validate_streams(config: &PlaybackConfig) -> Result<(), PlaybackError> {
    let mut seen = HashSet::new();
    for stream in &config.streams.enabled {
        if !seen.insert(stream) {
            return Err(PlaybackError::config_validation(
                format!("streams.enabled[{stream}]"),
                "duplicate stream",
            ));
        }
    }
    Ok(())
}
