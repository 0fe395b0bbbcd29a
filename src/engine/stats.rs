//! 结果统计
//!
//! 汇总统计、按游戏分组的摘要以及历史延迟摘要

use crate::catalog::ProbeTarget;
use crate::engine::store::ResultStore;
use crate::probe::{HistoryEntry, ProbeStatus, ScanResult};
use serde::Serialize;

/// 全部结果的汇总统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    /// 有结果的目标数
    pub total: usize,
    /// 可达数
    pub reachable: usize,
    /// 阻断或超时数
    pub blocked: usize,
    /// 可达目标的平均延迟（毫秒）
    pub avg_latency_ms: Option<u64>,
}

impl ScanStatistics {
    /// 从存储计算统计
    pub fn from_store(store: &ResultStore) -> Self {
        Self::from_results(store.all_results().values())
    }

    /// 只统计指定目标的结果
    pub fn for_targets(targets: &[ProbeTarget], store: &ResultStore) -> Self {
        Self::from_results(targets.iter().filter_map(|t| store.get_result(&t.id)))
    }

    fn from_results<'a>(results: impl Iterator<Item = &'a ScanResult>) -> Self {
        let mut total = 0;
        let mut reachable = 0;
        let mut blocked = 0;
        let mut latencies = Vec::new();

        for result in results {
            total += 1;
            match result.status() {
                ProbeStatus::Reachable => {
                    reachable += 1;
                    latencies.extend(result.latency_ms());
                }
                ProbeStatus::Blocked | ProbeStatus::Timeout => blocked += 1,
            }
        }

        Self {
            total,
            reachable,
            blocked,
            avg_latency_ms: rounded_mean(&latencies),
        }
    }
}

/// 按最新结果状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// 可达
    Playable,
    /// 阻断或超时
    Blocked,
}

impl StatusFilter {
    /// 判断结果是否匹配，没有结果的目标不匹配任何状态
    pub fn matches(&self, result: Option<&ScanResult>) -> bool {
        let Some(result) = result else {
            return false;
        };
        match self {
            StatusFilter::Playable => result.status() == ProbeStatus::Reachable,
            StatusFilter::Blocked => {
                matches!(result.status(), ProbeStatus::Blocked | ProbeStatus::Timeout)
            }
        }
    }
}

/// 按状态过滤目标，保持原有顺序
pub fn filter_by_status(
    targets: Vec<ProbeTarget>,
    store: &ResultStore,
    status: StatusFilter,
) -> Vec<ProbeTarget> {
    targets
        .into_iter()
        .filter(|t| status.matches(store.get_result(&t.id)))
        .collect()
}

/// 游戏分组整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// 尚未测试
    Pending,
    /// 全部在线
    AllOnline,
    /// 部分在线
    Partial,
    /// 全部阻断
    Blocked,
}

/// 游戏分组摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// 分组键
    pub key: String,
    /// 游戏名称
    pub name: String,
    /// 发行商
    pub publisher: String,
    /// 组内目标数
    pub targets: usize,
    /// 已测试数
    pub tested: usize,
    /// 可达数
    pub reachable: usize,
    /// 整体状态
    pub status: GroupStatus,
    /// 最佳延迟（毫秒）
    pub best_latency_ms: Option<u64>,
    /// 最佳延迟所在区域
    pub best_region: Option<String>,
}

impl GroupSummary {
    /// 状态标签
    pub fn status_label(&self) -> String {
        match self.status {
            GroupStatus::Pending => "Not Tested".to_string(),
            GroupStatus::AllOnline => "All Online".to_string(),
            GroupStatus::Partial => format!("{}/{} Online", self.reachable, self.tested),
            GroupStatus::Blocked => "Blocked".to_string(),
        }
    }
}

/// 按分组键汇总，分组顺序为首次出现的顺序
pub fn summarize_groups(targets: &[ProbeTarget], store: &ResultStore) -> Vec<GroupSummary> {
    let mut groups: Vec<(String, Vec<&ProbeTarget>)> = Vec::new();
    for target in targets {
        let key = target.group_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(target),
            None => groups.push((key, vec![target])),
        }
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let tested: Vec<_> = members
                .iter()
                .filter_map(|t| store.get_result(&t.id).map(|r| (*t, r)))
                .collect();
            let reachable = tested.iter().filter(|(_, r)| r.status().is_reachable()).count();

            let status = if tested.is_empty() {
                GroupStatus::Pending
            } else if reachable == tested.len() {
                GroupStatus::AllOnline
            } else if reachable > 0 {
                GroupStatus::Partial
            } else {
                GroupStatus::Blocked
            };

            let best = tested
                .iter()
                .filter_map(|(t, r)| r.latency_ms().map(|ms| (ms, t.region.clone())))
                .min_by_key(|(ms, _)| *ms);

            GroupSummary {
                key,
                name: members[0].name.clone(),
                publisher: members[0].publisher.clone(),
                targets: members.len(),
                tested: tested.len(),
                reachable,
                status,
                best_latency_ms: best.as_ref().map(|(ms, _)| *ms),
                best_region: best.map(|(_, region)| region),
            }
        })
        .collect()
}

/// 历史延迟摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    /// 历史条目数
    pub entries: usize,
    /// 最小延迟
    pub min_latency_ms: Option<u64>,
    /// 平均延迟
    pub avg_latency_ms: Option<u64>,
    /// 最大延迟
    pub max_latency_ms: Option<u64>,
}

impl HistorySummary {
    /// 计算历史摘要，只统计带延迟的条目
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        let latencies: Vec<u64> = entries.iter().filter_map(|e| e.latency_ms).collect();
        Self {
            entries: entries.len(),
            min_latency_ms: latencies.iter().copied().min(),
            avg_latency_ms: rounded_mean(&latencies),
            max_latency_ms: latencies.iter().copied().max(),
        }
    }
}

fn rounded_mean(values: &[u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    Some((values.iter().sum::<u64>() as f64 / values.len() as f64).round() as u64)
}
