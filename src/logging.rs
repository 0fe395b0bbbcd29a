//! 日志系统模块
//!
//! 提供结构化日志配置和管理功能

use crate::config::GlobalConfig;
use crate::probe::ScanResult;
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化结果
    init_result: Result<(), String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

impl Default for GlobalLoggingState {
    fn default() -> Self {
        Self {
            initialized: false,
            init_result: Ok(()),
            current_config: None,
        }
    }
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn lock_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// 根据配置文件中的全局设置构建日志配置
    ///
    /// 设置了日志文件时只写入文件，不再输出到控制台
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            level: parse_level(&global.log_level),
            file_path: global.log_file.clone(),
            console: global.log_file.is_none(),
            json_format: global.log_format == "json",
            module_levels: global
                .log_modules
                .iter()
                .map(|(module, level)| (module.clone(), parse_level(level)))
                .collect(),
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 创建新的日志系统
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 当前实例的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 初始化日志系统
    ///
    /// 全局只初始化一次，重复调用直接返回新的实例
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        {
            let state = lock_state();
            if state.initialized && !force_reinit {
                return match &state.init_result {
                    Ok(()) => Ok(Self::new(config)),
                    Err(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = lock_state();
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_result = init_result.as_ref().map(|_| ()).map_err(|e| e.to_string());
        }

        init_result?;
        Ok(Self::new(config))
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // log crate 到 tracing 的桥接
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)?;
        Ok(())
    }

    /// 初始化 LogTracer
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 构建环境过滤器
    fn build_env_filter(config: &LogConfig) -> EnvFilter {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("忽略无效的模块日志级别 {}: {}", module, e),
            }
        }

        env_filter
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = Self::build_env_filter(config);

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .boxed()
        };

        let result = if config.console {
            registry().with(env_filter).with(fmt_layer).try_init()
        } else if let Some(file_path) = &config.file_path {
            // 文件输出，不做轮转
            let file = std::fs::File::create(file_path)
                .map(Mutex::new)
                .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
            let file_layer = if config.json_format {
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .boxed()
            };

            registry().with(env_filter).with(file_layer).try_init()
        } else {
            registry().with(env_filter).with(fmt_layer).try_init()
        };

        match result {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    // 已经初始化过
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner).initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE.get().and_then(|state| {
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current_config
                .clone()
        })
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if GLOBAL_LOGGING_STATE.get().is_some() {
            let mut state = lock_state();
            state.initialized = false;
            state.init_result = Ok(());
            state.current_config = None;
        }
    }

    /// 记录一个目标的扫描结果
    ///
    /// 字段在JSON格式下成为独立的键
    pub fn probe_log(target_id: &str, result: &ScanResult) {
        let status = result.status();
        if status.is_reachable() {
            tracing::info!(
                target_id,
                status = %status,
                latency_ms = ?result.latency_ms(),
                jitter_ms = ?result.jitter_ms(),
                packet_loss = ?result.packet_loss(),
                note = ?result.note(),
                "目标扫描完成"
            );
        } else {
            tracing::info!(
                target_id,
                status = %status,
                packet_loss = ?result.packet_loss(),
                "目标不可达"
            );
        }
    }
}

/// 将字符串日志级别转换为 LevelFilter，无法识别时返回 Info
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let result1 = LoggingSystem::setup_logging(config.clone());
        assert!(result1.is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次调用不会重复初始化
        let result2 = LoggingSystem::setup_logging(config);
        assert!(result2.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(LoggingSystem::is_initialized());

        let result = LoggingSystem::setup_logging_with_options(config, true);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format_and_modules() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;
        config
            .module_levels
            .insert("caniplay::probe".to_string(), LevelFilter::Debug);

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();

        assert_eq!(LoggingSystem::current_config(), Some(config));
    }

    #[test]
    fn test_probe_log_does_not_panic() {
        let ok: ScanResult = ProbeOutcome::reachable(Duration::from_millis(12)).into();
        let failed: ScanResult = ProbeOutcome::timeout("Request timed out").into();
        LoggingSystem::probe_log("a", &ok);
        LoggingSystem::probe_log("b", &failed);
    }

    #[test]
    fn test_log_config_from_global() {
        let mut global = GlobalConfig::default();
        let config = LogConfig::from_global(&global);
        assert_eq!(config, LogConfig::default());

        global.log_level = "warn".to_string();
        global.log_format = "json".to_string();
        global.log_file = Some(PathBuf::from("/tmp/caniplay.log"));
        global
            .log_modules
            .insert("caniplay::probe".to_string(), "trace".to_string());

        let config = LogConfig::from_global(&global);
        assert_eq!(config.level, LevelFilter::Warn);
        assert!(config.json_format);
        assert!(!config.console);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/caniplay.log")));
        assert_eq!(
            config.module_levels.get("caniplay::probe"),
            Some(&LevelFilter::Trace)
        );
    }

    #[test]
    #[serial]
    fn test_json_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;
        config.json_format = true;

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
        assert!(!system.config().console);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }
}
