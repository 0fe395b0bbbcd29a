//! 扫描引擎模块
//!
//! 包含扫描编排器、结果存储、状态持久化和统计

pub mod orchestrator;
pub mod persistence;
pub mod stats;
pub mod store;

// 重新导出主要类型
pub use orchestrator::{
    ProgressCallback, ScanOptions, ScanOrchestrator, ScanProgress, DEFAULT_BATCH_DELAY,
    DEFAULT_BATCH_SIZE, RETEST_SAMPLE_COUNT, RETEST_SAMPLE_DELAY,
};
pub use persistence::{PersistedState, StateFile};
pub use stats::{
    filter_by_status, summarize_groups, GroupStatus, GroupSummary, HistorySummary, ScanStatistics,
    StatusFilter,
};
pub use store::{ResultStore, SharedStore, DEFAULT_HISTORY_LIMIT};
