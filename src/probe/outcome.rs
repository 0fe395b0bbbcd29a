//! 探测结果数据结构
//!
//! 定义单次探测结果、稳定性测试结果以及二者的统一视图

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 探测状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// 目标可达
    Reachable,
    /// 目标被阻断或不可达
    Blocked,
    /// 探测超时
    Timeout,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Reachable => write!(f, "reachable"),
            ProbeStatus::Blocked => write!(f, "blocked"),
            ProbeStatus::Timeout => write!(f, "timeout"),
        }
    }
}

impl ProbeStatus {
    /// 判断状态是否为可达
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeStatus::Reachable)
    }
}

/// 单次探测结果
///
/// 每次探测都会生成新的实例，创建后不再修改。
/// `latency_ms` 仅在 `Reachable` 时存在；`note` 仅在可达性来自启发式推断时存在。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// 探测状态
    pub status: ProbeStatus,
    /// 延迟（毫秒）
    pub latency_ms: Option<u64>,
    /// 启发式判断说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 失败原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 结果产生时间
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    /// 创建确定可达的结果
    pub fn reachable(elapsed: Duration) -> Self {
        Self {
            status: ProbeStatus::Reachable,
            latency_ms: Some(duration_to_millis(elapsed)),
            note: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// 创建由启发式推断得出的可达结果
    pub fn heuristic_reachable(elapsed: Duration, note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::reachable(elapsed)
        }
    }

    /// 创建阻断结果
    pub fn blocked(error: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Blocked,
            latency_ms: None,
            note: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// 创建超时结果
    pub fn timeout(error: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Timeout,
            latency_ms: None,
            note: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// 可达性是否来自启发式推断
    pub fn is_heuristic(&self) -> bool {
        self.status.is_reachable() && self.note.is_some()
    }
}

/// 稳定性测试结果
///
/// 没有任何成功样本时，所有延迟相关字段均为 `None`，丢包率为100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityResult {
    /// 总体状态（至少一个样本可达即为可达）
    pub status: ProbeStatus,
    /// 平均延迟（毫秒）
    pub latency_ms: Option<u64>,
    /// 最小延迟（毫秒）
    pub min_latency_ms: Option<u64>,
    /// 最大延迟（毫秒）
    pub max_latency_ms: Option<u64>,
    /// 抖动：样本延迟相对平均值的平均绝对偏差（毫秒）
    pub jitter_ms: Option<u64>,
    /// 丢包率（百分比，0-100）
    pub packet_loss: u8,
    /// 样本数量
    pub samples: usize,
    /// 结果产生时间
    pub timestamp: DateTime<Utc>,
}

/// 扫描结果：单次探测或稳定性测试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanResult {
    /// 单次探测
    Single(ProbeOutcome),
    /// 稳定性测试
    Stability(StabilityResult),
}

impl ScanResult {
    /// 获取状态
    pub fn status(&self) -> ProbeStatus {
        match self {
            ScanResult::Single(outcome) => outcome.status,
            ScanResult::Stability(result) => result.status,
        }
    }

    /// 获取延迟（毫秒）
    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            ScanResult::Single(outcome) => outcome.latency_ms,
            ScanResult::Stability(result) => result.latency_ms,
        }
    }

    /// 获取时间戳
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ScanResult::Single(outcome) => outcome.timestamp,
            ScanResult::Stability(result) => result.timestamp,
        }
    }

    /// 获取抖动（仅稳定性测试）
    pub fn jitter_ms(&self) -> Option<u64> {
        match self {
            ScanResult::Single(_) => None,
            ScanResult::Stability(result) => result.jitter_ms,
        }
    }

    /// 获取丢包率（仅稳定性测试）
    pub fn packet_loss(&self) -> Option<u8> {
        match self {
            ScanResult::Single(_) => None,
            ScanResult::Stability(result) => Some(result.packet_loss),
        }
    }

    /// 获取启发式说明（仅单次探测）
    pub fn note(&self) -> Option<&str> {
        match self {
            ScanResult::Single(outcome) => outcome.note.as_deref(),
            ScanResult::Stability(_) => None,
        }
    }
}

impl From<ProbeOutcome> for ScanResult {
    fn from(outcome: ProbeOutcome) -> Self {
        ScanResult::Single(outcome)
    }
}

impl From<StabilityResult> for ScanResult {
    fn from(result: StabilityResult) -> Self {
        ScanResult::Stability(result)
    }
}

/// 历史记录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 延迟（毫秒）
    pub latency_ms: Option<u64>,
    /// 状态
    pub status: ProbeStatus,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl From<&ScanResult> for HistoryEntry {
    fn from(result: &ScanResult) -> Self {
        Self {
            latency_ms: result.latency_ms(),
            status: result.status(),
            timestamp: result.timestamp(),
        }
    }
}

/// 将耗时四舍五入为毫秒
pub fn duration_to_millis(duration: Duration) -> u64 {
    (duration.as_secs_f64() * 1000.0).round() as u64
}
