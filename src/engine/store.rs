//! 结果与历史存储
//!
//! 保存每个目标的最新结果（后写覆盖）以及有上限的滚动历史（先进先出淘汰）

use crate::engine::persistence::PersistedState;
use crate::probe::{HistoryEntry, ScanResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 每个目标默认保留的历史条数
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// 编排器与外部调用方共享的存储句柄
pub type SharedStore = Arc<RwLock<ResultStore>>;

/// 结果与历史存储
#[derive(Debug, Clone)]
pub struct ResultStore {
    /// 目标ID -> 最新结果
    results: HashMap<String, ScanResult>,
    /// 目标ID -> 历史记录（按扫描先后排列）
    history: HashMap<String, VecDeque<HistoryEntry>>,
    /// 每个目标保留的历史条数上限
    history_limit: usize,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ResultStore {
    /// 创建空存储
    pub fn new(history_limit: usize) -> Self {
        Self {
            results: HashMap::new(),
            history: HashMap::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// 创建共享存储句柄
    pub fn shared(history_limit: usize) -> SharedStore {
        Arc::new(RwLock::new(Self::new(history_limit)))
    }

    /// 历史条数上限
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// 写入最新结果，覆盖旧值
    pub fn set_result(&mut self, target_id: &str, result: ScanResult) {
        self.results.insert(target_id.to_string(), result);
    }

    /// 获取最新结果
    pub fn get_result(&self, target_id: &str) -> Option<&ScanResult> {
        self.results.get(target_id)
    }

    /// 获取所有结果
    pub fn all_results(&self) -> &HashMap<String, ScanResult> {
        &self.results
    }

    /// 追加历史记录，超出上限时淘汰最旧的条目
    pub fn append_history(&mut self, target_id: &str, entry: HistoryEntry) {
        let entries = self.history.entry(target_id.to_string()).or_default();
        entries.push_back(entry);
        while entries.len() > self.history_limit {
            entries.pop_front();
        }
    }

    /// 获取历史记录（从旧到新）
    pub fn get_history(&self, target_id: &str) -> Vec<HistoryEntry> {
        self.history
            .get(target_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 记录一次扫描结果：覆盖最新结果并追加历史
    pub fn record(&mut self, target_id: &str, result: ScanResult) {
        let entry = HistoryEntry::from(&result);
        self.set_result(target_id, result);
        self.append_history(target_id, entry);
    }

    /// 已有结果的目标数量
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// 是否没有任何结果
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 导出可持久化的快照
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            results: self
                .results
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            history: self
                .history
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect(),
        }
    }

    /// 用持久化状态整体替换当前内容
    ///
    /// 超出上限的历史保留最新的条目
    pub fn rehydrate(&mut self, state: PersistedState) {
        self.results = state.results.into_iter().collect();
        self.history = state
            .history
            .into_iter()
            .map(|(id, entries)| {
                let skip = entries.len().saturating_sub(self.history_limit);
                (id, entries.into_iter().skip(skip).collect())
            })
            .collect();
    }
}
