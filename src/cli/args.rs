//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::catalog::RegionArea;
use crate::engine::StatusFilter;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CanIPlay - 游戏服务器可达性探测工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "caniplay",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "CANIPLAY_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别（未指定时使用配置文件中的级别）
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "CANIPLAY_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出")]
    pub verbose: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 扫描目标
    Scan {
        /// 进行稳定性测试（多样本）
        #[arg(short, long, help = "进行稳定性测试")]
        stability: bool,

        /// 稳定性测试样本数量
        #[arg(long, value_name = "COUNT", help = "稳定性测试样本数量")]
        samples: Option<usize>,

        /// 只扫描指定ID的目标
        #[arg(short, long = "target", value_name = "ID", help = "只扫描指定ID的目标")]
        targets: Vec<String>,

        /// 按游戏名称或发行商过滤
        #[arg(short, long, value_name = "NAME", help = "按游戏名称或发行商过滤")]
        game: Option<String>,

        /// 按区域过滤
        #[arg(short, long, value_name = "REGION", help = "按区域过滤")]
        region: Option<String>,

        /// 按大区过滤
        #[arg(short, long, value_enum, help = "按大区过滤")]
        area: Option<AreaArg>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 快速重测单个目标
    Retest {
        /// 目标ID
        #[arg(value_name = "ID", help = "目标ID")]
        target: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 查看已保存的结果
    Results {
        /// 按游戏名称或发行商过滤
        #[arg(short, long, value_name = "NAME", help = "按游戏名称或发行商过滤")]
        game: Option<String>,

        /// 按区域过滤
        #[arg(short, long, value_name = "REGION", help = "按区域过滤")]
        region: Option<String>,

        /// 按大区过滤
        #[arg(short, long, value_enum, help = "按大区过滤")]
        area: Option<AreaArg>,

        /// 按状态过滤
        #[arg(short, long, value_enum, help = "按状态过滤")]
        status: Option<StatusArg>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 查看目标历史
    History {
        /// 目标ID
        #[arg(value_name = "ID", help = "目标ID")]
        target: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 列出所有目标
    Targets {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 添加自定义游戏
    Add {
        /// 游戏名称
        #[arg(value_name = "NAME", help = "游戏名称")]
        name: String,

        /// 发行商
        #[arg(short, long, value_name = "PUBLISHER", help = "发行商")]
        publisher: Option<String>,

        /// 位置，格式为 REGION=URL，可重复
        #[arg(
            short,
            long = "location",
            value_name = "REGION=URL",
            required = true,
            help = "位置（REGION=URL），可重复"
        )]
        locations: Vec<String>,
    },

    /// 删除自定义游戏
    Remove {
        /// 游戏名称
        #[arg(value_name = "NAME", help = "游戏名称")]
        name: String,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "caniplay.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// 表格格式
    Table,
}

/// 大区参数
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum AreaArg {
    /// 亚太
    Asia,
    /// 欧洲
    Europe,
    /// 美洲
    Americas,
    /// 大洋洲
    Oceania,
    /// 中东
    MiddleEast,
    /// 全球
    Global,
}

impl From<AreaArg> for RegionArea {
    fn from(area: AreaArg) -> Self {
        match area {
            AreaArg::Asia => RegionArea::AsiaPacific,
            AreaArg::Europe => RegionArea::Europe,
            AreaArg::Americas => RegionArea::Americas,
            AreaArg::Oceania => RegionArea::Oceania,
            AreaArg::MiddleEast => RegionArea::MiddleEast,
            AreaArg::Global => RegionArea::Global,
        }
    }
}

/// 状态参数
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum StatusArg {
    /// 可达
    Playable,
    /// 阻断或超时
    Blocked,
}

impl From<StatusArg> for StatusFilter {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Playable => StatusFilter::Playable,
            StatusArg::Blocked => StatusFilter::Blocked,
        }
    }
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_command() {
        let args = Args::try_parse_from([
            "caniplay",
            "--log-level",
            "debug",
            "scan",
            "--stability",
            "--samples",
            "3",
            "-t",
            "valorant-tokyo",
            "-t",
            "apex-eu",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Debug));
        match args.command {
            Commands::Scan {
                stability,
                samples,
                targets,
                format,
                ..
            } => {
                assert!(stability);
                assert_eq!(samples, Some(3));
                assert_eq!(targets, vec!["valorant-tokyo", "apex-eu"]);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_requires_location() {
        assert!(Args::try_parse_from(["caniplay", "add", "My Game"]).is_err());

        let args = Args::try_parse_from([
            "caniplay",
            "add",
            "My Game",
            "-l",
            "EU=eu.example.com",
            "-l",
            "US=https://us.example.com",
        ])
        .unwrap();
        match args.command {
            Commands::Add {
                name,
                publisher,
                locations,
            } => {
                assert_eq!(name, "My Game");
                assert_eq!(publisher, None);
                assert_eq!(locations.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_results_filters() {
        let args = Args::try_parse_from([
            "caniplay",
            "results",
            "--game",
            "riot",
            "--area",
            "middle-east",
            "--status",
            "blocked",
        ])
        .unwrap();

        match args.command {
            Commands::Results {
                game,
                region,
                area,
                status,
                format,
            } => {
                assert_eq!(game.as_deref(), Some("riot"));
                assert_eq!(region, None);
                assert_eq!(area.map(RegionArea::from), Some(RegionArea::MiddleEast));
                assert_eq!(status.map(StatusFilter::from), Some(StatusFilter::Blocked));
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Args::try_parse_from(["caniplay", "results", "--status", "maybe"]).is_err());
    }

    #[test]
    fn test_explicit_config_path() {
        let args =
            Args::try_parse_from(["caniplay", "--config", "/tmp/x.toml", "targets"]).unwrap();
        assert_eq!(args.get_config_path(), PathBuf::from("/tmp/x.toml"));
        assert!(!args.verbose);
    }
}
