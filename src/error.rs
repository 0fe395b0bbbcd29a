//! 错误处理模块
//!
//! 定义应用程序的统一错误类型。单次探测的失败不会出现在这里，
//! 它们总是被归类为 `ProbeOutcome`。

use thiserror::Error;

/// CanIPlay 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum CanIPlayError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测器构建错误
    #[error("探测器错误: {0}")]
    Probe(#[from] ProbeError),

    /// 结果存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 目标目录相关错误
    #[error("目标目录错误: {0}")]
    Catalog(#[from] CatalogError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探测器错误类型
///
/// 仅覆盖HTTP客户端的构建，探测过程本身不会返回错误
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// 结果存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 状态文件读写失败
    #[error("状态文件读写失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 状态文件内容无效
    #[error("状态文件内容无效 {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 目标目录错误类型
#[derive(Error, Debug)]
pub enum CatalogError {
    /// 自定义游戏缺少有效的服务器位置
    #[error("游戏 {name} 至少需要一个有效的服务器位置")]
    NoLocations { name: String },

    /// 服务器位置格式无效
    #[error("无效的服务器位置: {0}，格式应为 REGION=URL")]
    InvalidLocation(String),

    /// 未找到目标
    #[error("未找到目标: {id}")]
    TargetNotFound { id: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, CanIPlayError>;
