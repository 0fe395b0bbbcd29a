//! 状态持久化
//!
//! 将结果与历史存储保存为JSON文件，并在启动时逐键恢复

use crate::engine::store::ResultStore;
use crate::error::StoreError;
use crate::probe::{HistoryEntry, ScanResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 持久化状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// 目标ID -> 最新结果
    #[serde(default)]
    pub results: BTreeMap<String, ScanResult>,
    /// 目标ID -> 历史记录
    #[serde(default)]
    pub history: BTreeMap<String, Vec<HistoryEntry>>,
}

/// 原始持久化格式，值在恢复时逐个解析
#[derive(Debug, Default, Deserialize)]
struct RawState {
    #[serde(default)]
    results: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    history: BTreeMap<String, serde_json::Value>,
}

impl PersistedState {
    /// 从JSON解析，单个条目无效时跳过该条目
    pub fn from_json_lenient(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawState = serde_json::from_str(json)?;
        let mut state = PersistedState::default();

        for (id, value) in raw.results {
            match serde_json::from_value::<ScanResult>(value) {
                Ok(result) => {
                    state.results.insert(id, result);
                }
                Err(e) => warn!("跳过无效的持久化结果 {}: {}", id, e),
            }
        }

        for (id, value) in raw.history {
            match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(entries) => {
                    state.history.insert(id, entries);
                }
                Err(e) => warn!("跳过无效的持久化历史 {}: {}", id, e),
            }
        }

        Ok(state)
    }
}

/// 状态文件
#[derive(Debug, Clone)]
pub struct StateFile {
    /// 文件路径
    path: PathBuf,
}

impl StateFile {
    /// 创建状态文件句柄
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认状态文件路径
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("caniplay").join("state.json"))
            .unwrap_or_else(|| PathBuf::from("caniplay-state.json"))
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存存储快照
    pub async fn save(&self, store: &ResultStore) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&store.snapshot()).map_err(|source| {
            StoreError::Corrupt {
                path: self.display(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| self.io_error(source))?;
            }
        }

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!("状态已保存: {}", self.path.display());
        Ok(())
    }

    /// 读取持久化状态
    ///
    /// 文件不存在时返回 `Ok(None)`
    pub async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        PersistedState::from_json_lenient(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.display(),
                source,
            })
    }

    /// 读取状态并恢复到存储中
    ///
    /// 任何失败只记录警告，存储保持为空
    pub async fn rehydrate_into(&self, store: &mut ResultStore) {
        match self.load().await {
            Ok(Some(state)) => {
                let count = state.results.len();
                store.rehydrate(state);
                info!("已从 {} 恢复 {} 个目标的结果", self.path.display(), count);
            }
            Ok(None) => debug!("状态文件不存在，从空状态开始: {}", self.path.display()),
            Err(e) => warn!("加载已保存的结果失败: {}", e),
        }
    }

    fn display(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.display(),
            source,
        }
    }
}
