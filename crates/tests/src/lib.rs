//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合成录制文件 -> 回放引擎的端到端测试
//! - Seek / 暂停 / 重置语义
//! - 格式版本与错误路径

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod format_tests;

#[cfg(test)]
mod playback_tests;

#[cfg(test)]
mod seek_tests;
