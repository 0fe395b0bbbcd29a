//! 稳定性采样器
//!
//! 对同一目标顺序执行多次探测（样本之间留出间隔，避免相互干扰），
//! 并汇总为延迟、抖动与丢包率统计

use crate::catalog::ProbeTarget;
use crate::probe::outcome::{ProbeOutcome, ProbeStatus, StabilityResult};
use crate::probe::prober::Prober;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 默认样本数量
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// 默认样本间隔
pub const DEFAULT_SAMPLE_DELAY: Duration = Duration::from_millis(500);

/// 稳定性采样器
#[derive(Clone)]
pub struct StabilitySampler {
    /// 单目标探测器
    prober: Arc<dyn Prober>,
    /// 样本数量
    count: usize,
    /// 样本间隔
    delay: Duration,
}

impl StabilitySampler {
    /// 创建新的采样器
    pub fn new(prober: Arc<dyn Prober>, count: usize, delay: Duration) -> Self {
        Self {
            prober,
            count,
            delay,
        }
    }

    /// 使用默认参数创建采样器
    pub fn with_defaults(prober: Arc<dyn Prober>) -> Self {
        Self::new(prober, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_DELAY)
    }

    /// 使用配置的参数采样
    pub async fn sample(&self, target: &ProbeTarget) -> StabilityResult {
        self.sample_with(target, self.count, self.delay).await
    }

    /// 使用指定参数采样
    ///
    /// 最后一个样本之后不再等待
    pub async fn sample_with(
        &self,
        target: &ProbeTarget,
        count: usize,
        delay: Duration,
    ) -> StabilityResult {
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let outcome = self.prober.probe(target).await;
            debug!(
                "样本 {}/{} {}: {} {:?}",
                i + 1,
                count,
                target.id,
                outcome.status,
                outcome.latency_ms
            );
            samples.push(outcome);

            if i + 1 < count {
                tokio::time::sleep(delay).await;
            }
        }

        aggregate(&samples)
    }
}

/// 汇总样本
///
/// 平均延迟四舍五入；抖动为各样本延迟与取整后平均值之差的绝对值的平均。
/// 没有可用延迟时返回阻断结果，所有延迟字段为 `None`。
pub fn aggregate(samples: &[ProbeOutcome]) -> StabilityResult {
    let successes = samples.iter().filter(|s| s.status.is_reachable()).count();
    let latencies: Vec<u64> = samples
        .iter()
        .filter(|s| s.status.is_reachable())
        .filter_map(|s| s.latency_ms)
        .collect();

    if latencies.is_empty() {
        return StabilityResult {
            status: ProbeStatus::Blocked,
            latency_ms: None,
            min_latency_ms: None,
            max_latency_ms: None,
            jitter_ms: None,
            packet_loss: packet_loss(successes, samples.len()),
            samples: samples.len(),
            timestamp: Utc::now(),
        };
    }

    let count = latencies.len() as f64;
    let mean = (latencies.iter().sum::<u64>() as f64 / count).round() as u64;
    let jitter = if latencies.len() > 1 {
        let deviation: u64 = latencies.iter().map(|l| l.abs_diff(mean)).sum();
        (deviation as f64 / count).round() as u64
    } else {
        0
    };

    StabilityResult {
        status: ProbeStatus::Reachable,
        latency_ms: Some(mean),
        min_latency_ms: latencies.iter().copied().min(),
        max_latency_ms: latencies.iter().copied().max(),
        jitter_ms: Some(jitter),
        packet_loss: packet_loss(successes, samples.len()),
        samples: samples.len(),
        timestamp: Utc::now(),
    }
}

/// 计算丢包率（百分比），没有样本时视为100
pub fn packet_loss(successes: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = successes.min(total) as f64 / total as f64;
    ((1.0 - ratio) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// 按脚本顺序返回结果的探测器
    struct ScriptedProber {
        script: Mutex<Vec<ProbeOutcome>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedProber {
        fn new(mut script: Vec<ProbeOutcome>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, _target: &ProbeTarget) -> ProbeOutcome {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ProbeOutcome::blocked("script exhausted"))
        }
    }

    fn ok(ms: u64) -> ProbeOutcome {
        ProbeOutcome::reachable(Duration::from_millis(ms))
    }

    fn target() -> ProbeTarget {
        ProbeTarget::new(
            "valorant-mumbai",
            "Valorant",
            "Riot Games",
            "Mumbai",
            "https://playvalorant.com/favicon.ico",
        )
    }

    #[test]
    fn test_aggregate_mixed_samples() {
        let samples = vec![
            ok(40),
            ok(60),
            ProbeOutcome::timeout("Image load timed out"),
            ok(50),
            ok(70),
        ];

        let result = aggregate(&samples);
        assert_eq!(result.status, ProbeStatus::Reachable);
        assert_eq!(result.latency_ms, Some(55));
        assert_eq!(result.min_latency_ms, Some(40));
        assert_eq!(result.max_latency_ms, Some(70));
        assert_eq!(result.jitter_ms, Some(10));
        assert_eq!(result.packet_loss, 20);
        assert_eq!(result.samples, 5);
    }

    #[test]
    fn test_aggregate_all_failed() {
        let samples = vec![
            ProbeOutcome::blocked("refused"),
            ProbeOutcome::timeout("Request timed out"),
        ];

        let result = aggregate(&samples);
        assert_eq!(result.status, ProbeStatus::Blocked);
        assert_eq!(result.latency_ms, None);
        assert_eq!(result.min_latency_ms, None);
        assert_eq!(result.max_latency_ms, None);
        assert_eq!(result.jitter_ms, None);
        assert_eq!(result.packet_loss, 100);
        assert_eq!(result.samples, 2);
    }

    #[test]
    fn test_aggregate_no_samples() {
        let result = aggregate(&[]);
        assert_eq!(result.status, ProbeStatus::Blocked);
        assert_eq!(result.packet_loss, 100);
        assert_eq!(result.samples, 0);
        assert_eq!(result.jitter_ms, None);
    }

    #[test]
    fn test_aggregate_single_success_has_zero_jitter() {
        let result = aggregate(&[ok(33), ProbeOutcome::blocked("x"), ProbeOutcome::blocked("y")]);
        assert_eq!(result.latency_ms, Some(33));
        assert_eq!(result.jitter_ms, Some(0));
        assert_eq!(result.packet_loss, 67);
    }

    #[test]
    fn test_aggregate_rounds_mean_half_up() {
        let result = aggregate(&[ok(10), ok(11)]);
        assert_eq!(result.latency_ms, Some(11));
        // |10-11| + |11-11| = 1, 1/2 = 0.5 -> 1
        assert_eq!(result.jitter_ms, Some(1));
    }

    #[test]
    fn test_packet_loss_bounds() {
        assert_eq!(packet_loss(0, 0), 100);
        assert_eq!(packet_loss(0, 5), 100);
        assert_eq!(packet_loss(5, 5), 0);
        assert_eq!(packet_loss(1, 3), 67);
        assert_eq!(packet_loss(2, 3), 33);
        for total in 1..=12 {
            for successes in 0..=total {
                assert!(packet_loss(successes, total) <= 100);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_is_sequential_with_spacing() {
        let prober = Arc::new(ScriptedProber::new(vec![ok(40), ok(60), ok(50)]));
        let sampler = StabilitySampler::new(prober.clone(), 3, Duration::from_millis(500));

        let start = Instant::now();
        let result = sampler.sample(&target()).await;

        assert_eq!(result.samples, 3);
        assert_eq!(result.latency_ms, Some(50));

        let calls = prober.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1] - calls[0], Duration::from_millis(500));
        assert_eq!(calls[2] - calls[1], Duration::from_millis(500));
        // 最后一个样本之后不等待
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_zero_count_attempts_nothing() {
        let prober = Arc::new(ScriptedProber::new(vec![ok(10)]));
        let sampler = StabilitySampler::with_defaults(prober.clone());

        let result = sampler
            .sample_with(&target(), 0, Duration::from_millis(500))
            .await;

        assert_eq!(result.packet_loss, 100);
        assert_eq!(result.samples, 0);
        assert!(prober.calls.lock().unwrap().is_empty());
    }
}
