//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::catalog::ProbeTarget;
use crate::engine::ScanOptions;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构，包含全局配置和目标列表
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 目标配置列表
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 单次探测超时（毫秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// 稳定性测试样本数量
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// 样本间隔（毫秒）
    #[serde(default = "default_sample_delay")]
    pub sample_delay_ms: u64,
    /// 每批并发扫描的目标数
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 批间隔（毫秒）
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
    /// 每个目标保留的历史条数
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志格式：text 或 json
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// 日志文件路径，设置后日志只写入该文件
    pub log_file: Option<PathBuf>,
    /// 模块级别日志控制，例如 "caniplay::probe" = "debug"
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub log_modules: HashMap<String, String>,
    /// 自定义User-Agent
    pub user_agent: Option<String>,
    /// 状态文件路径
    pub state_file: Option<PathBuf>,
    /// 自定义目标文件路径
    pub custom_targets_file: Option<PathBuf>,
}

/// 目标配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// 唯一标识
    pub id: String,
    /// 游戏名称
    pub name: String,
    /// 发行商
    pub publisher: String,
    /// 区域
    pub region: String,
    /// 探测端点URL
    pub endpoint: String,
    /// 展示用端点描述
    pub display_endpoint: Option<String>,
}

impl From<TargetConfig> for ProbeTarget {
    fn from(config: TargetConfig) -> Self {
        let target = ProbeTarget::new(
            config.id,
            config.name,
            config.publisher,
            config.region,
            config.endpoint,
        );
        match config.display_endpoint {
            Some(display) => target.with_display_endpoint(display),
            None => target,
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout(),
            sample_count: default_sample_count(),
            sample_delay_ms: default_sample_delay(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
            history_limit: default_history_limit(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            log_file: None,
            log_modules: HashMap::new(),
            user_agent: None,
            state_file: None,
            custom_targets_file: None,
        }
    }
}

impl GlobalConfig {
    /// 单次探测超时
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// 转换为扫描参数
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            batch_size: self.batch_size,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            sample_count: self.sample_count,
            sample_delay: Duration::from_millis(self.sample_delay_ms),
        }
    }
}

impl Config {
    /// 配置中的目标列表
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.targets.iter().cloned().map(ProbeTarget::from).collect()
    }
}

// 默认值函数
fn default_probe_timeout() -> u64 {
    5000
}
fn default_sample_count() -> usize {
    5
}
fn default_sample_delay() -> u64 {
    500
}
fn default_batch_size() -> usize {
    4
}
fn default_batch_delay() -> u64 {
    100
}
fn default_history_limit() -> usize {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.probe_timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if config.global.batch_size == 0 {
        return Err("批大小不能为0".to_string());
    }

    if config.global.history_limit == 0 {
        return Err("历史条数上限不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    for (module, level) in &config.global.log_modules {
        if !valid_log_levels.contains(&level.as_str()) {
            return Err(format!("模块 {} 的日志级别无效: {}", module, level));
        }
    }

    if !["text", "json"].contains(&config.global.log_format.as_str()) {
        return Err(format!(
            "无效的日志格式: {}，支持 text 或 json",
            config.global.log_format
        ));
    }

    // 验证目标配置
    let mut seen = HashSet::new();
    for target in &config.targets {
        if target.id.trim().is_empty() {
            return Err(format!("目标 {} 的ID不能为空", target.name));
        }

        if !seen.insert(target.id.as_str()) {
            return Err(format!("目标ID重复: {}", target.id));
        }

        if target.name.trim().is_empty() {
            return Err(format!("目标 {} 的名称不能为空", target.id));
        }

        if !target.endpoint.starts_with("http://") && !target.endpoint.starts_with("https://") {
            return Err(format!("目标 {} 的URL格式无效", target.id));
        }
    }

    Ok(())
}
