//! 用户自定义目标
//!
//! 支持添加带多个服务器位置的自定义游戏，并以JSON文件持久化

use crate::catalog::target::ProbeTarget;
use crate::error::{CatalogError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// 自定义游戏未指定发行商时使用的默认值
pub const DEFAULT_CUSTOM_PUBLISHER: &str = "Custom";

/// 服务器位置（区域 + URL）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 区域
    pub region: String,
    /// URL或主机名
    pub url: String,
}

impl FromStr for Location {
    type Err = CatalogError;

    /// 解析 `REGION=URL` 格式
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (region, url) = s
            .split_once('=')
            .ok_or_else(|| CatalogError::InvalidLocation(s.to_string()))?;

        Ok(Self {
            region: region.trim().to_string(),
            url: url.trim().to_string(),
        })
    }
}

/// 补全URL协议，缺省使用https
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// 提取URL中的主机部分作为展示端点
pub fn display_host(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// 根据表单输入构建自定义游戏的目标列表
///
/// 区域或URL为空的位置会被跳过；没有任何有效位置时返回错误
pub fn build_custom_game(
    name: &str,
    publisher: Option<&str>,
    locations: &[Location],
    now_millis: i64,
) -> std::result::Result<Vec<ProbeTarget>, CatalogError> {
    let name = name.trim();
    let publisher = publisher
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_CUSTOM_PUBLISHER);
    let game_id = format!("custom-game-{now_millis}");

    let targets: Vec<ProbeTarget> = locations
        .iter()
        .enumerate()
        .filter(|(_, loc)| !loc.region.trim().is_empty() && !loc.url.trim().is_empty())
        .map(|(index, loc)| {
            let endpoint = normalize_url(&loc.url);
            let display = display_host(&endpoint);
            let mut target = ProbeTarget::new(
                format!("custom-{now_millis}-{index}"),
                name,
                publisher,
                loc.region.trim(),
                endpoint,
            )
            .with_display_endpoint(display);
            target.is_custom = true;
            target.custom_game_id = Some(game_id.clone());
            target
        })
        .collect();

    if name.is_empty() || targets.is_empty() {
        return Err(CatalogError::NoLocations {
            name: name.to_string(),
        });
    }

    Ok(targets)
}

/// 自定义目标存储
#[derive(Debug, Clone)]
pub struct CustomTargetStore {
    /// 存储文件路径
    path: PathBuf,
}

impl CustomTargetStore {
    /// 创建新的自定义目标存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 默认存储文件路径
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("caniplay").join("custom_targets.json"))
            .unwrap_or_else(|| PathBuf::from("custom_targets.json"))
    }

    /// 加载自定义目标
    ///
    /// 文件不存在返回空列表；文件损坏时记录警告并返回空列表
    pub async fn load(&self) -> Vec<ProbeTarget> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("读取自定义目标失败 {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ProbeTarget>>(&content) {
            Ok(targets) => targets
                .into_iter()
                .map(|mut t| {
                    t.is_custom = true;
                    t
                })
                .collect(),
            Err(e) => {
                warn!("解析自定义目标失败 {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// 保存自定义目标
    pub async fn save(&self, targets: &[ProbeTarget]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(targets)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// 添加自定义游戏，新目标排在最前
    pub async fn add_game(
        &self,
        name: &str,
        publisher: Option<&str>,
        locations: &[Location],
    ) -> Result<Vec<ProbeTarget>> {
        let added = build_custom_game(
            name,
            publisher,
            locations,
            chrono::Utc::now().timestamp_millis(),
        )?;

        let mut targets = added.clone();
        targets.extend(self.load().await);
        self.save(&targets).await?;

        info!("已添加自定义游戏 \"{}\"，共 {} 个服务器位置", name, added.len());
        Ok(added)
    }

    /// 按游戏名称移除自定义目标，返回移除数量
    pub async fn remove_game(&self, name: &str) -> Result<usize> {
        let targets = self.load().await;
        let before = targets.len();
        let kept: Vec<ProbeTarget> = targets.into_iter().filter(|t| t.name != name).collect();
        let removed = before - kept.len();

        if removed > 0 {
            self.save(&kept).await?;
            info!("已移除自定义游戏 \"{}\" 的 {} 个目标", name, removed);
        }

        Ok(removed)
    }
}
