//! 探测模块
//!
//! 提供探测策略、单目标探测器、稳定性采样器以及结果类型

pub mod display;
pub mod outcome;
pub mod prober;
pub mod sampler;
pub mod strategy;

// 重新导出主要类型
pub use display::{DisplayStatus, LatencyQuality, StatusInfo};
pub use outcome::{HistoryEntry, ProbeOutcome, ProbeStatus, ScanResult, StabilityResult};
pub use prober::{HttpProber, Prober, DEFAULT_PROBE_TIMEOUT};
pub use sampler::{aggregate, StabilitySampler, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_DELAY};
pub use strategy::ProbeStrategy;
