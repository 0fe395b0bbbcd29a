//! CanIPlay 主程序入口
//!
//! 游戏服务器可达性探测工具

use anyhow::{Context, Result};
use caniplay::cli::args::{Args, Commands};
use caniplay::cli::commands::{
    AddCommand, Command, HistoryCommand, InitCommand, RemoveCommand, ResultsCommand,
    RetestCommand, ScanCommand, TargetsCommand, ValidateCommand, VersionCommand,
};
use caniplay::config::{ConfigLoader, TomlConfigLoader};
use caniplay::logging::{LogConfig, LoggingSystem};
use log::LevelFilter;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let log_config = resolve_log_config(&args).await;

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("CanIPlay v{} 启动", caniplay::VERSION);

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 确定日志配置
///
/// 格式、文件与模块级别来自配置文件；级别优先级为 命令行 > 详细模式 > 配置文件 > info
async fn resolve_log_config(args: &Args) -> LogConfig {
    let path = args.get_config_path();
    let mut config = if path.exists() {
        match TomlConfigLoader::new(true).load_from_file(&path).await {
            Ok(config) => LogConfig::from_global(&config.global),
            Err(_) => LogConfig::default(),
        }
    } else {
        LogConfig::default()
    };

    if let Some(level) = args.log_level {
        config.level = level.into();
    } else if args.verbose {
        config.level = LevelFilter::Debug;
    }

    config
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Scan { .. } => Box::new(ScanCommand),
        Commands::Retest { .. } => Box::new(RetestCommand),
        Commands::Results { .. } => Box::new(ResultsCommand),
        Commands::History { .. } => Box::new(HistoryCommand),
        Commands::Targets { .. } => Box::new(TargetsCommand),
        Commands::Add { .. } => Box::new(AddCommand),
        Commands::Remove { .. } => Box::new(RemoveCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command
        .execute(args)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
