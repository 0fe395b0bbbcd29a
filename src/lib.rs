//! CanIPlay - 游戏服务器可达性探测引擎
//!
//! 从当前网络环境判断一组游戏服务器端点是否可达：
//! - 单次探测（HTTP请求或图片加载两种策略，带超时与启发式判定）
//! - 稳定性测试（多样本延迟、抖动与丢包率）
//! - 分批并发扫描，支持协作式取消
//! - 结果与滚动历史存储及持久化
//! - 结构化日志记录

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod probe;

// 重新导出主要类型
pub use catalog::{Catalog, ProbeTarget, TargetFilter};
pub use config::{Config, GlobalConfig, TargetConfig};
pub use engine::{ResultStore, ScanOptions, ScanOrchestrator, SharedStore};
pub use error::{CanIPlayError, Result};
pub use probe::{HttpProber, ProbeOutcome, ProbeStatus, Prober, ScanResult, StabilityResult};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
