//! Spawn / teardown 指标收集模块
//!
//! Prometheus 计数器按对象类别 (`kind`) 打标签，同时提供内存聚合器用于运行结束时的摘要输出。

use std::collections::BTreeMap;

use contracts::ObjectCategory;
use metrics::{counter, gauge};

/// 记录一次 spawn 请求 (含重试)
pub fn record_spawn_attempt(category: ObjectCategory) {
    counter!("carla_spawner_spawn_attempts_total", "kind" => category.as_str()).increment(1);
}

/// 记录 actor 创建成功
pub fn record_actor_spawned(category: ObjectCategory) {
    counter!("carla_spawner_actors_spawned_total", "kind" => category.as_str()).increment(1);
}

/// 记录后端返回失败标记
pub fn record_spawn_rejection(category: ObjectCategory) {
    counter!("carla_spawner_spawn_rejections_total", "kind" => category.as_str()).increment(1);
}

/// 记录 actor 销毁
pub fn record_actor_destroyed() {
    counter!("carla_spawner_actors_destroyed_total").increment(1);
}

/// 记录销毁失败 (服务不可用等)
pub fn record_destroy_failure() {
    counter!("carla_spawner_destroy_failures_total").increment(1);
}

/// 当前由本进程持有的 actor 数量
pub fn set_live_actors(count: usize) {
    gauge!("carla_spawner_live_actors").set(count as f64);
}

/// Spawn 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SpawnMetricsAggregator {
    /// 各类别创建成功数
    pub spawned: BTreeMap<&'static str, u64>,

    /// 各类别被后端拒绝的请求数
    pub rejections: BTreeMap<&'static str, u64>,

    /// 因字段/后端错误跳过的对象数
    pub skipped: u64,

    /// 已销毁
    pub destroyed: u64,

    /// 销毁时已不存在
    pub already_gone: u64,

    /// 销毁失败
    pub destroy_failures: u64,

    /// 每个 vehicle/walker 成功前的尝试次数
    pub attempts_per_entity: RunningStats,
}

impl SpawnMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawned(&mut self, category: ObjectCategory, count: u64) {
        if count > 0 {
            *self.spawned.entry(category.as_str()).or_insert(0) += count;
        }
    }

    pub fn record_rejections(&mut self, category: ObjectCategory, count: u64) {
        if count > 0 {
            *self.rejections.entry(category.as_str()).or_insert(0) += count;
        }
    }

    pub fn record_entity_attempts(&mut self, attempts: u32) {
        self.attempts_per_entity.push(f64::from(attempts));
    }

    pub fn record_skipped(&mut self, count: u64) {
        self.skipped += count;
    }

    pub fn record_teardown(&mut self, destroyed: u64, already_gone: u64, failed: u64) {
        self.destroyed += destroyed;
        self.already_gone += already_gone;
        self.destroy_failures += failed;
    }

    /// 成功创建的 actor 总数
    pub fn total_spawned(&self) -> u64 {
        self.spawned.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            spawned: self.spawned.clone(),
            total_spawned: self.total_spawned(),
            rejections: self.rejections.values().sum(),
            skipped: self.skipped,
            destroyed: self.destroyed,
            already_gone: self.already_gone,
            destroy_failures: self.destroy_failures,
            attempts_per_entity: StatsSummary::from(&self.attempts_per_entity),
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
    pub spawned: BTreeMap<&'static str, u64>,
    pub total_spawned: u64,
    pub rejections: u64,
    pub skipped: u64,
    pub destroyed: u64,
    pub already_gone: u64,
    pub destroy_failures: u64,
    pub attempts_per_entity: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Spawn Summary ===")?;
        writeln!(f, "Actors spawned: {}", self.total_spawned)?;
        for (kind, count) in &self.spawned {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        writeln!(f, "Backend rejections: {}", self.rejections)?;
        writeln!(f, "Skipped objects: {}", self.skipped)?;
        writeln!(f, "Attempts per vehicle/walker: {}", self.attempts_per_entity)?;
        writeln!(
            f,
            "Teardown: {} destroyed, {} already gone, {} failed",
            self.destroyed, self.already_gone, self.destroy_failures
        )?;
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
                "min={:.0}, max={:.0}, mean={:.2} (n={})",
                self.min, self.max, self.mean, self.count
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

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for attempts in [1.0, 1.0, 4.0] {
            stats.push(attempts);
        }

        assert_eq!(stats.count(), 3);
        assert!((stats.mean() - 2.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 4.0).abs() < 1e-10);
        assert!((stats.std_dev() - 3.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SpawnMetricsAggregator::new();

        aggregator.record_spawned(ObjectCategory::Vehicle, 1);
        aggregator.record_spawned(ObjectCategory::Sensor, 3);
        aggregator.record_spawned(ObjectCategory::Walker, 0);
        aggregator.record_rejections(ObjectCategory::Vehicle, 2);
        aggregator.record_entity_attempts(3);
        aggregator.record_skipped(1);
        aggregator.record_teardown(3, 1, 0);

        let summary = aggregator.summary();
        assert_eq!(summary.total_spawned, 4);
        assert_eq!(summary.spawned.get("sensor"), Some(&3));
        assert!(!summary.spawned.contains_key("walker"));
        assert_eq!(summary.rejections, 2);
        assert_eq!(summary.attempts_per_entity.count, 1);

        aggregator.reset();
        assert_eq!(aggregator.total_spawned(), 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SpawnMetricsAggregator::new();
        aggregator.record_spawned(ObjectCategory::Vehicle, 1);
        aggregator.record_entity_attempts(4);
        aggregator.record_teardown(1, 0, 0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Actors spawned: 1"));
        assert!(output.contains("vehicle: 1"));
        assert!(output.contains("1 destroyed, 0 already gone, 0 failed"));
        assert!(output.contains("n=1"));
    }

    #[test]
    fn test_metric_calls_without_recorder() {
        // 未安装 recorder 时为 no-op
        record_spawn_attempt(ObjectCategory::Vehicle);
        record_actor_spawned(ObjectCategory::Sensor);
        record_spawn_rejection(ObjectCategory::Walker);
        record_actor_destroyed();
        record_destroy_failure();
        set_live_actors(0);
    }
}
