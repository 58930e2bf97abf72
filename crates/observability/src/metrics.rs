//! 表单分发指标收集模块
//!
//! 记录 part 路由、字段处理、handler 耗时等运行指标。

use std::collections::HashMap;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 注册指标描述 (安装 exporter 后调用)
pub fn describe_metrics() {
    describe_counter!(
        "form_dispatch_parts_total",
        "File parts routed, by route (handled or drained)"
    );
    describe_counter!(
        "form_dispatch_fields_total",
        "Non-file fields seen, by whether a handler matched"
    );
    describe_counter!(
        "form_dispatch_bytes_drained_total",
        Unit::Bytes,
        "Bytes read and discarded from unhandled parts"
    );
    describe_histogram!(
        "form_dispatch_handler_duration_ms",
        Unit::Milliseconds,
        "File handler invocation time"
    );
    describe_gauge!(
        "form_dispatch_pending_handlers",
        "File handler invocations that have not returned"
    );
    describe_counter!(
        "form_dispatch_outcomes_total",
        "process() outcomes, by ok, skipped or error code"
    );
}

/// 记录 part 路由结果
///
/// `route` 为 `"handled"` 或 `"drained"`。
pub fn record_part_routed(route: &str) {
    counter!(
        "form_dispatch_parts_total",
        "route" => route.to_string()
    )
    .increment(1);
}

/// 记录字段处理
pub fn record_field(handled: bool) {
    let handled = if handled { "true" } else { "false" };
    counter!(
        "form_dispatch_fields_total",
        "handled" => handled.to_string()
    )
    .increment(1);
}

/// 记录被丢弃的字节数
pub fn record_bytes_drained(bytes: u64) {
    if bytes > 0 {
        counter!("form_dispatch_bytes_drained_total").increment(bytes);
    }
}

/// 记录 handler 耗时
pub fn record_handler_duration_ms(handler: &str, duration_ms: f64) {
    histogram!(
        "form_dispatch_handler_duration_ms",
        "handler" => handler.to_string()
    )
    .record(duration_ms);
}

/// 记录当前未完成的 handler 数
pub fn record_pending_handlers(pending: usize) {
    gauge!("form_dispatch_pending_handlers").set(pending as f64);
}

/// 记录一次 `process()` 的最终结果
///
/// `outcome` 为 `"ok"`、`"skipped"` 或错误码。
pub fn record_outcome(outcome: &str) {
    counter!(
        "form_dispatch_outcomes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Handler 耗时聚合器
///
/// 在内存中聚合各 handler 的耗时，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct HandlerTimings {
    /// 各 handler 耗时统计 (毫秒)
    pub per_handler: HashMap<String, RunningStats>,
    /// 失败次数
    pub failures: HashMap<String, u64>,
}

impl HandlerTimings {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 handler 调用
    pub fn record(&mut self, handler: &str, duration_ms: f64, success: bool) {
        self.per_handler
            .entry(handler.to_string())
            .or_default()
            .push(duration_ms);
        if !success {
            *self.failures.entry(handler.to_string()).or_insert(0) += 1;
        }
    }

    /// 调用总次数
    pub fn total_calls(&self) -> u64 {
        self.per_handler.values().map(RunningStats::count).sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> TimingsSummary {
        let mut handlers: Vec<_> = self
            .per_handler
            .iter()
            .map(|(name, stats)| HandlerSummary {
                name: name.clone(),
                failures: self.failures.get(name).copied().unwrap_or(0),
                duration_ms: StatsSummary::from(stats),
            })
            .collect();
        handlers.sort_by(|a, b| a.name.cmp(&b.name));

        TimingsSummary {
            total_calls: self.total_calls(),
            handlers,
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 单个 handler 摘要
#[derive(Debug, Clone, Default)]
pub struct HandlerSummary {
    pub name: String,
    pub failures: u64,
    pub duration_ms: StatsSummary,
}

/// 耗时摘要
#[derive(Debug, Clone, Default)]
pub struct TimingsSummary {
    pub total_calls: u64,
    pub handlers: Vec<HandlerSummary>,
}

impl std::fmt::Display for TimingsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Handler Timings ===")?;
        writeln!(f, "Total calls: {}", self.total_calls)?;
        for handler in &self.handlers {
            writeln!(
                f,
                "  {}: {} (failures={})",
                handler.name, handler.duration_ms, handler.failures
            )?;
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

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
