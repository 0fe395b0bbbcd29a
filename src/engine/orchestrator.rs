//! 扫描编排器
//!
//! 以固定大小的批次并发扫描目标集合，批内全部并发、批间顺序执行并留出间隔。
//! 所有批内任务在同一个异步任务上协作运行（不使用 `tokio::spawn`），
//! 因此存储写入与进度回调按完成顺序串行发生。
//!
//! 取消是协作式的：在每个批次开始前以及每个目标开始探测前检查取消信号，
//! 已经开始的探测会自然结束（受其自身超时约束）。

use crate::catalog::ProbeTarget;
use crate::engine::store::{ResultStore, SharedStore};
use crate::logging::LoggingSystem;
use crate::probe::{
    HistoryEntry, Prober, ScanResult, StabilitySampler, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_DELAY,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// 默认批间隔
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// 单目标快速重测的样本数量
pub const RETEST_SAMPLE_COUNT: usize = 3;

/// 单目标快速重测的样本间隔
pub const RETEST_SAMPLE_DELAY: Duration = Duration::from_millis(300);

/// 扫描参数
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// 每批并发扫描的目标数
    pub batch_size: usize,
    /// 批间隔
    pub batch_delay: Duration,
    /// 稳定性测试样本数量
    pub sample_count: usize,
    /// 稳定性测试样本间隔
    pub sample_delay: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_delay: DEFAULT_SAMPLE_DELAY,
        }
    }
}

/// 扫描进度
#[derive(Debug, Clone, Copy)]
pub struct ScanProgress<'a> {
    /// 刚完成的目标ID
    pub target_id: &'a str,
    /// 该目标的结果
    pub result: &'a ScanResult,
    /// 已完成数量（从1开始严格递增）
    pub completed: usize,
    /// 本次扫描的目标总数
    pub total: usize,
}

/// 进度回调函数类型
pub type ProgressCallback = Arc<dyn Fn(&ScanProgress<'_>) + Send + Sync>;

/// 离开作用域时清除运行标志
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 扫描编排器
///
/// 状态机：Idle -> Running -> Idle。取消只是设置信号，
/// 运行标志在进行中的探测全部结束后才清除。
pub struct ScanOrchestrator {
    /// 单目标探测器
    prober: Arc<dyn Prober>,
    /// 稳定性采样器
    sampler: StabilitySampler,
    /// 结果与历史存储
    store: SharedStore,
    /// 扫描参数
    options: ScanOptions,
    /// 是否有扫描在运行
    running: AtomicBool,
    /// 当前扫描的取消信号
    cancel_token: StdRwLock<CancellationToken>,
}

impl ScanOrchestrator {
    /// 创建新的编排器
    ///
    /// # 参数
    /// * `prober` - 单目标探测器
    /// * `store` - 共享的结果存储
    /// * `options` - 扫描参数
    pub fn new(prober: Arc<dyn Prober>, store: SharedStore, options: ScanOptions) -> Self {
        let sampler = StabilitySampler::new(
            Arc::clone(&prober),
            options.sample_count,
            options.sample_delay,
        );

        Self {
            prober,
            sampler,
            store,
            options,
            running: AtomicBool::new(false),
            cancel_token: StdRwLock::new(CancellationToken::new()),
        }
    }

    /// 使用默认参数和空存储创建编排器
    pub fn with_defaults(prober: Arc<dyn Prober>) -> Self {
        Self::new(
            prober,
            ResultStore::shared(crate::engine::store::DEFAULT_HISTORY_LIMIT),
            ScanOptions::default(),
        )
    }

    /// 扫描参数
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// 共享存储句柄（实时数据，不是快照）
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// 是否有扫描在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 扫描目标集合
    ///
    /// 已有扫描在运行时直接返回当前存储，不启动新的扫描。
    ///
    /// # 参数
    /// * `targets` - 目标列表，按输入顺序分批
    /// * `on_progress` - 每个目标结果写入后调用的回调
    /// * `use_stability` - 是否进行稳定性测试
    ///
    /// # 返回
    /// * `SharedStore` - 共享存储句柄
    pub async fn scan_all(
        &self,
        targets: &[ProbeTarget],
        on_progress: Option<ProgressCallback>,
        use_stability: bool,
    ) -> SharedStore {
        // 持有写锁完成运行标志与取消信号的切换，避免取消请求落到旧信号上
        let token = {
            let mut current = self
                .cancel_token
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                warn!("扫描已在进行中，忽略本次请求");
                return self.store();
            }
            *current = CancellationToken::new();
            current.clone()
        };
        let _guard = RunningGuard(&self.running);

        let scan_id = Uuid::new_v4();
        let total = targets.len();
        let batch_size = self.options.batch_size.max(1);
        let completed = AtomicUsize::new(0);

        info!(
            %scan_id,
            "开始扫描 {} 个目标 (批大小: {}, 稳定性测试: {})",
            total,
            batch_size,
            use_stability
        );

        for (index, batch) in targets.chunks(batch_size).enumerate() {
            if token.is_cancelled() {
                info!(%scan_id, "扫描已取消，跳过剩余 {} 个目标", total - index * batch_size);
                break;
            }

            debug!(%scan_id, "开始第 {} 批，共 {} 个目标", index + 1, batch.len());

            let tasks = batch.iter().map(|target| {
                self.scan_target(
                    target,
                    &token,
                    use_stability,
                    &completed,
                    total,
                    on_progress.as_ref(),
                )
            });
            join_all(tasks).await;

            if token.is_cancelled() {
                info!(%scan_id, "扫描已取消，进行中的探测已结束");
                break;
            }

            if (index + 1) * batch_size < total {
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        info!(
            %scan_id,
            "扫描结束，完成 {}/{} 个目标",
            completed.load(Ordering::SeqCst),
            total
        );

        self.store()
    }

    /// 扫描单个目标并记录结果
    async fn scan_target(
        &self,
        target: &ProbeTarget,
        token: &CancellationToken,
        use_stability: bool,
        completed: &AtomicUsize,
        total: usize,
        on_progress: Option<&ProgressCallback>,
    ) {
        if token.is_cancelled() {
            debug!("已取消，不再开始探测: {}", target.id);
            return;
        }

        let result = self.measure(target, use_stability).await;
        self.record(&target.id, result.clone()).await;

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(callback) = on_progress {
            callback(&ScanProgress {
                target_id: &target.id,
                result: &result,
                completed: done,
                total,
            });
        }
    }

    /// 对目标执行单次探测或稳定性测试
    async fn measure(&self, target: &ProbeTarget, use_stability: bool) -> ScanResult {
        if use_stability {
            self.sampler.sample(target).await.into()
        } else {
            self.prober.probe(target).await.into()
        }
    }

    /// 写入存储并记录结构化日志
    async fn record(&self, target_id: &str, result: ScanResult) {
        LoggingSystem::probe_log(target_id, &result);
        self.store.write().await.record(target_id, result);
    }

    /// 请求取消当前扫描
    ///
    /// 空闲时调用是安全的空操作
    pub fn cancel(&self) {
        let token = self
            .cancel_token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.is_running() {
            debug!("没有正在运行的扫描，忽略取消请求");
            return;
        }

        token.cancel();
        info!("已请求取消扫描，等待进行中的探测结束");
    }

    /// 对单个目标进行快速重测（3个样本，间隔300ms）
    ///
    /// 这是绕过运行标志直接写入存储的旁路：它可以与整体扫描同时进行，
    /// 两者对同一目标的写入按完成先后覆盖。
    pub async fn retest(&self, target: &ProbeTarget) -> ScanResult {
        self.retest_with(target, RETEST_SAMPLE_COUNT, RETEST_SAMPLE_DELAY)
            .await
    }

    /// 使用指定参数对单个目标重测
    pub async fn retest_with(
        &self,
        target: &ProbeTarget,
        count: usize,
        delay: Duration,
    ) -> ScanResult {
        let result: ScanResult = self.sampler.sample_with(target, count, delay).await.into();
        self.record(&target.id, result.clone()).await;
        result
    }

    /// 获取目标最新结果
    pub async fn get_result(&self, target_id: &str) -> Option<ScanResult> {
        self.store.read().await.get_result(target_id).cloned()
    }

    /// 获取所有结果
    pub async fn get_all_results(&self) -> HashMap<String, ScanResult> {
        self.store.read().await.all_results().clone()
    }

    /// 获取目标历史
    pub async fn get_history(&self, target_id: &str) -> Vec<HistoryEntry> {
        self.store.read().await.get_history(target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeOutcome, ProbeStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 固定延迟后返回可达结果的探测器
    struct SlowProber {
        delay: Duration,
        started: Mutex<Vec<String>>,
    }

    impl SlowProber {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                started: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
            self.started.lock().unwrap().push(target.id.clone());
            tokio::time::sleep(self.delay).await;
            ProbeOutcome::reachable(self.delay)
        }
    }

    fn targets(n: usize) -> Vec<ProbeTarget> {
        (0..n)
            .map(|i| {
                ProbeTarget::new(
                    format!("t{i}"),
                    "Game",
                    "Pub",
                    "Region",
                    format!("https://t{i}.example/"),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.batch_size, 4);
        assert_eq!(options.batch_delay, Duration::from_millis(100));
        assert_eq!(options.sample_count, 5);
        assert_eq!(options.sample_delay, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_when_idle_is_noop() {
        let orchestrator = ScanOrchestrator::with_defaults(Arc::new(SlowProber::new(
            Duration::from_millis(10),
        )));
        assert!(!orchestrator.is_running());
        orchestrator.cancel();
        assert!(!orchestrator.is_running());

        // 空闲时的取消不影响下一次扫描
        let store = orchestrator.scan_all(&targets(2), None, false).await;
        assert_eq!(store.read().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reaches_scan_started_after_cancelled_one() {
        let prober = Arc::new(SlowProber::new(Duration::from_millis(1000)));
        let orchestrator = Arc::new(ScanOrchestrator::with_defaults(prober.clone()));

        // 第一次扫描被取消，其取消信号保持已触发状态
        let first = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.scan_all(&targets(8), None, false).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        orchestrator.cancel();
        first.await.unwrap();
        assert!(!orchestrator.is_running());

        // 新扫描一进入运行状态，取消就必须作用于它自己的信号
        let second = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.scan_all(&targets(8), None, false).await })
        };
        tokio::task::yield_now().await;
        assert!(orchestrator.is_running());
        orchestrator.cancel();

        let store = second.await.unwrap();
        assert_eq!(store.read().await.len(), 4);
        assert_eq!(prober.started.lock().unwrap().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_run_in_parallel_with_pause_between() {
        let prober = Arc::new(SlowProber::new(Duration::from_millis(1000)));
        let orchestrator = ScanOrchestrator::with_defaults(prober.clone());

        let start = tokio::time::Instant::now();
        orchestrator.scan_all(&targets(10), None, false).await;

        // 3批，每批1秒，两次100ms间隔
        assert_eq!(start.elapsed(), Duration::from_millis(3200));
        let started = prober.started.lock().unwrap().clone();
        let expected: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        assert_eq!(started, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stability_scan_records_aggregates() {
        let prober = Arc::new(SlowProber::new(Duration::from_millis(20)));
        let options = ScanOptions {
            sample_count: 3,
            sample_delay: Duration::from_millis(50),
            ..ScanOptions::default()
        };
        let orchestrator = ScanOrchestrator::new(prober, ResultStore::shared(10), options);

        orchestrator.scan_all(&targets(1), None, true).await;

        match orchestrator.get_result("t0").await {
            Some(ScanResult::Stability(result)) => {
                assert_eq!(result.samples, 3);
                assert_eq!(result.packet_loss, 0);
                assert_eq!(result.latency_ms, Some(20));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retest_writes_directly_to_store() {
        let prober = Arc::new(SlowProber::new(Duration::from_millis(15)));
        let orchestrator = ScanOrchestrator::with_defaults(prober.clone());
        let target = targets(1).remove(0);

        let start = tokio::time::Instant::now();
        let result = orchestrator.retest(&target).await;

        assert_eq!(result.status(), ProbeStatus::Reachable);
        assert_eq!(prober.started.lock().unwrap().len(), 3);
        // 3个样本各15ms，中间两次300ms间隔
        assert_eq!(start.elapsed(), Duration::from_millis(645));
        assert_eq!(orchestrator.get_history("t0").await.len(), 1);
        assert!(!orchestrator.is_running());
    }
}
