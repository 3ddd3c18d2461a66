//! Playback 指标收集模块
//!
//! 记录回放引擎的分发、丢帧、解码与缓冲指标，并在内存中聚合摘要。

use std::collections::BTreeMap;

use contracts::{Channel, Sample, StreamKind};
use metrics::{counter, gauge, histogram};

/// 记录样本分发
///
/// 每次样本交给回调前调用。
pub fn record_sample_dispatched(channel: Channel) {
    counter!(
        "playback_samples_dispatched_total",
        "stream" => channel.to_string()
    )
    .increment(1);
}

/// 记录解码失败（该帧被跳过并计入丢帧）
pub fn record_decode_failure(stream: StreamKind) {
    counter!(
        "playback_decode_failures_total",
        "stream" => stream.as_str()
    )
    .increment(1);
}

/// 记录丢帧
pub fn record_frames_dropped(stream: StreamKind, count: u64) {
    counter!(
        "playback_frames_dropped_total",
        "stream" => stream.as_str()
    )
    .increment(count);
}

/// 记录丢弃的运动样本
pub fn record_motion_dropped(count: u64) {
    counter!("playback_motion_dropped_total").increment(count);
}

/// 记录节拍等待时长
pub fn record_pacing_sleep_ms(sleep_ms: f64) {
    histogram!("playback_pacing_sleep_ms").record(sleep_ms);
}

/// 记录预取缓冲区深度
pub fn record_buffer_depth(depth: usize) {
    gauge!("playback_buffer_depth").set(depth as f64);
}

/// 记录已索引样本数
pub fn record_index_size(samples: usize) {
    gauge!("playback_index_size").set(samples as f64);
}

/// 记录 seek 操作
pub fn record_seek(kind: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "playback_seeks_total",
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// 回放指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PlaybackMetricsAggregator {
    /// 分发样本总数
    pub total_samples: u64,

    /// 分发帧数
    pub total_frames: u64,

    /// 分发运动样本数
    pub total_motion: u64,

    /// 解码后的图像字节数
    pub total_bytes: u64,

    /// 各通道分发数
    pub channel_counts: BTreeMap<String, u64>,

    /// 各通道相邻样本的采集时间间隔 (ms)
    pub interval_stats: BTreeMap<String, RunningStats>,

    /// 首个样本的采集时间 (us)
    first_capture_time: Option<u64>,

    /// 最近样本的采集时间 (us)
    last_capture_time: Option<u64>,

    last_per_channel: BTreeMap<String, u64>,
}

impl PlaybackMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &Sample) {
        let channel = sample.channel().to_string();
        let capture_time = sample.capture_time();

        self.total_samples += 1;
        match sample {
            Sample::Frame(frame) => {
                self.total_frames += 1;
                self.total_bytes += frame.data.len() as u64;
            }
            Sample::Motion(_) => self.total_motion += 1,
        }
        *self.channel_counts.entry(channel.clone()).or_insert(0) += 1;

        if let Some(previous) = self.last_per_channel.insert(channel.clone(), capture_time) {
            self.interval_stats
                .entry(channel)
                .or_default()
                .push(capture_time.saturating_sub(previous) as f64 / 1000.0);
        }

        self.first_capture_time.get_or_insert(capture_time);
        self.last_capture_time = Some(capture_time);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let span_ms = match (self.first_capture_time, self.last_capture_time) {
            (Some(first), Some(last)) => last.saturating_sub(first) as f64 / 1000.0,
            _ => 0.0,
        };
        MetricsSummary {
            total_samples: self.total_samples,
            total_frames: self.total_frames,
            total_motion: self.total_motion,
            total_bytes: self.total_bytes,
            capture_span_ms: span_ms,
            channel_counts: self.channel_counts.clone(),
            interval_ms: self
                .interval_stats
                .iter()
                .map(|(channel, stats)| (channel.clone(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub total_frames: u64,
    pub total_motion: u64,
    pub total_bytes: u64,
    pub capture_span_ms: f64,
    pub channel_counts: BTreeMap<String, u64>,
    pub interval_ms: BTreeMap<String, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Playback Metrics Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(f, "Frames: {}", self.total_frames)?;
        writeln!(f, "Motion samples: {}", self.total_motion)?;
        writeln!(f, "Decoded bytes: {}", self.total_bytes)?;
        writeln!(f, "Capture span: {:.3} ms", self.capture_span_ms)?;

        if !self.channel_counts.is_empty() {
            writeln!(f, "Per channel:")?;
            for (channel, count) in &self.channel_counts {
                let interval = self
                    .interval_ms
                    .get(channel)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "N/A".to_string());
                writeln!(f, "  {}: {} (interval ms: {})", channel, count, interval)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
