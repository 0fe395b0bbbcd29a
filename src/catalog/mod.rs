//! 探测目标目录模块
//!
//! 合并配置中的目标与用户自定义目标，并提供查询与过滤

pub mod custom;
pub mod target;

pub use custom::{CustomTargetStore, Location};
pub use target::{ProbeTarget, RegionArea, TargetFilter};

use crate::error::CatalogError;
use std::collections::HashSet;

/// 目标目录
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    targets: Vec<ProbeTarget>,
}

impl Catalog {
    /// 合并自定义目标与配置目标，自定义目标在前
    ///
    /// ID重复时保留先出现的目标
    pub fn merge(custom: Vec<ProbeTarget>, configured: Vec<ProbeTarget>) -> Self {
        let mut seen = HashSet::new();
        let targets = custom
            .into_iter()
            .chain(configured)
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        Self { targets }
    }

    /// 所有目标
    pub fn targets(&self) -> &[ProbeTarget] {
        &self.targets
    }

    /// 目标数量
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 按ID查找目标
    pub fn find(&self, id: &str) -> Result<&ProbeTarget, CatalogError> {
        self.targets
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CatalogError::TargetNotFound { id: id.to_string() })
    }

    /// 按条件过滤目标，保持原有顺序
    pub fn filter(&self, filter: &TargetFilter) -> Vec<ProbeTarget> {
        self.targets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }
}
