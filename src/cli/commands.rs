//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::catalog::{Catalog, CustomTargetStore, Location, ProbeTarget, RegionArea, TargetFilter};
use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::engine::{
    filter_by_status, summarize_groups, GroupSummary, HistorySummary, ProgressCallback,
    ResultStore, ScanOrchestrator, ScanProgress, ScanStatistics, SharedStore, StateFile,
    StatusFilter,
};
use crate::error::{ConfigError, Result};
use crate::probe::{DisplayStatus, HttpProber, LatencyQuality, ScanResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `init` 命令写入的示例配置
pub const SAMPLE_CONFIG: &str = r#"# CanIPlay 配置文件

[global]
probe_timeout_ms = 5000
sample_count = 5
sample_delay_ms = 500
batch_size = 4
batch_delay_ms = 100
history_limit = 10
log_level = "info"
log_format = "text"
# log_file = "/path/to/caniplay.log"
# user_agent = "caniplay"
# state_file = "/path/to/state.json"
# custom_targets_file = "/path/to/custom_targets.json"

[[targets]]
id = "valorant-tokyo"
name = "Valorant"
publisher = "Riot Games"
region = "Tokyo"
endpoint = "https://playvalorant.com/favicon.ico"
display_endpoint = "Tokyo, Japan"

[[targets]]
id = "valorant-singapore"
name = "Valorant"
publisher = "Riot Games"
region = "Singapore"
endpoint = "https://playvalorant.com/favicon.ico"
display_endpoint = "Singapore"

[[targets]]
id = "cs2-useast"
name = "Counter-Strike 2"
publisher = "Valve"
region = "US East"
endpoint = "https://www.counter-strike.net/favicon.ico"
display_endpoint = "Virginia, USA"

[[targets]]
id = "battlenet-us"
name = "Battle.net"
publisher = "Blizzard"
region = "Americas"
endpoint = "https://us.battle.net/favicon.ico"
display_endpoint = "us.battle.net"

[[targets]]
id = "battlenet-eu"
name = "Battle.net"
publisher = "Blizzard"
region = "Europe"
endpoint = "https://eu.battle.net/favicon.ico"
display_endpoint = "eu.battle.net"

[[targets]]
id = "steam-store"
name = "Steam"
publisher = "Valve"
region = "Global"
endpoint = "https://store.steampowered.com/"
display_endpoint = "store.steampowered.com"
"#;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 命令运行上下文：配置、目标目录与存储位置
pub struct AppContext {
    /// 已加载的配置
    pub config: Config,
    /// 合并后的目标目录
    pub catalog: Catalog,
    /// 自定义目标存储
    pub custom_store: CustomTargetStore,
    /// 状态文件
    pub state_file: StateFile,
}

impl AppContext {
    /// 加载配置与自定义目标
    ///
    /// 未显式指定配置文件且默认位置不存在时使用默认配置
    pub async fn load(args: &Args) -> Result<Self> {
        let config_path = args.get_config_path();
        let config = if args.config.is_none() && !config_path.exists() {
            debug!("未找到配置文件 {}，使用默认配置", config_path.display());
            Config::default()
        } else {
            TomlConfigLoader::new(true)
                .load_from_file(&config_path)
                .await?
        };

        Ok(Self::from_config(config).await)
    }

    /// 根据已有配置构建上下文
    pub async fn from_config(config: Config) -> Self {
        let custom_store = CustomTargetStore::new(
            config
                .global
                .custom_targets_file
                .clone()
                .unwrap_or_else(CustomTargetStore::default_path),
        );
        let state_file = StateFile::new(
            config
                .global
                .state_file
                .clone()
                .unwrap_or_else(StateFile::default_path),
        );

        let custom = custom_store.load().await;
        let catalog = Catalog::merge(custom, config.probe_targets());
        debug!("目标目录共 {} 个目标", catalog.len());

        Self {
            config,
            catalog,
            custom_store,
            state_file,
        }
    }

    /// 目标目录不能为空
    fn require_targets(&self) -> Result<()> {
        if self.catalog.is_empty() {
            return Err(ConfigError::ValidationError(
                "至少需要配置一个目标或添加自定义游戏（运行 caniplay init 生成示例配置）"
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// 创建共享存储并恢复已保存的状态
    async fn load_store(&self) -> SharedStore {
        let store = ResultStore::shared(self.config.global.history_limit);
        self.state_file.rehydrate_into(&mut *store.write().await).await;
        store
    }

    /// 保存存储状态，失败只记录警告
    async fn save_store(&self, store: &SharedStore) {
        if let Err(e) = self.state_file.save(&*store.read().await).await {
            warn!("保存扫描结果失败: {}", e);
        }
    }

    /// 创建编排器
    fn orchestrator(&self, store: SharedStore, sample_count: Option<usize>) -> Result<ScanOrchestrator> {
        let global = &self.config.global;
        let prober = HttpProber::new(global.probe_timeout(), global.user_agent.as_deref())?;

        let mut options = global.scan_options();
        if let Some(count) = sample_count {
            options.sample_count = count;
        }

        Ok(ScanOrchestrator::new(Arc::new(prober), store, options))
    }
}

/// 单行结果输出
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    id: &'a str,
    name: &'a str,
    publisher: &'a str,
    region: &'a str,
    endpoint: &'a str,
    quality: LatencyQuality,
    result: Option<&'a ScanResult>,
}

impl<'a> ResultRow<'a> {
    fn new(target: &'a ProbeTarget, result: Option<&'a ScanResult>) -> Self {
        Self {
            id: &target.id,
            name: &target.name,
            publisher: &target.publisher,
            region: &target.region,
            endpoint: target.display(),
            quality: LatencyQuality::from_latency(result.and_then(ScanResult::latency_ms)),
            result,
        }
    }
}

/// 结果的展示状态，可达但延迟较差时显示为高延迟
pub fn display_status(result: Option<&ScanResult>) -> DisplayStatus {
    match result {
        None => DisplayStatus::Pending,
        Some(result) => {
            let status = DisplayStatus::from(result.status());
            if status == DisplayStatus::Reachable
                && LatencyQuality::from_latency(result.latency_ms()) == LatencyQuality::Poor
            {
                DisplayStatus::Warning
            } else {
                status
            }
        }
    }
}

fn format_latency(latency_ms: Option<u64>) -> String {
    latency_ms
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// 格式化单个结果为一行文本
pub fn format_result_line(label: &str, result: Option<&ScanResult>) -> String {
    let info = display_status(result).info();
    let mut line = format!("{} {} - {}", info.icon, label, info.label);

    if let Some(result) = result {
        if let Some(latency) = result.latency_ms() {
            line.push_str(&format!(
                " - {} ({})",
                format_latency(Some(latency)),
                LatencyQuality::from_latency(Some(latency))
            ));
        }
        if let Some(jitter) = result.jitter_ms() {
            line.push_str(&format!(" 抖动 {jitter}ms"));
        }
        if let Some(loss) = result.packet_loss() {
            line.push_str(&format!(" 丢包 {loss}%"));
        }
        if let Some(note) = result.note() {
            line.push_str(&format!(" [{note}]"));
        }
    }

    line
}

fn target_label(target: &ProbeTarget) -> String {
    format!("{} ({})", target.name, target.region)
}

fn print_text_results(rows: &[ResultRow<'_>]) {
    for row in rows {
        println!(
            "{}",
            format_result_line(&format!("{} ({})", row.name, row.region), row.result)
        );
    }
}

fn print_table_results(rows: &[ResultRow<'_>]) {
    println!(
        "{:<24} {:<20} {:<14} {:<12} {:<10} {:<10} {:<8}",
        "目标ID", "游戏", "区域", "状态", "延迟", "抖动", "丢包"
    );
    println!("{}", "-".repeat(104));

    for row in rows {
        let info = display_status(row.result).info();
        let latency = format_latency(row.result.and_then(ScanResult::latency_ms));
        let jitter = format_latency(row.result.and_then(ScanResult::jitter_ms));
        let loss = row
            .result
            .and_then(ScanResult::packet_loss)
            .map(|l| format!("{l}%"))
            .unwrap_or_else(|| "N/A".to_string());

        println!(
            "{:<24} {:<20} {:<14} {:<12} {:<10} {:<10} {:<8}",
            row.id,
            row.name,
            row.region,
            format!("{} {}", info.icon, info.label),
            latency,
            jitter,
            loss
        );
    }
}

fn print_statistics(stats: &ScanStatistics) {
    println!();
    println!(
        "统计: 共 {} 个，可达 {} 个，阻断 {} 个，平均延迟 {}",
        stats.total,
        stats.reachable,
        stats.blocked,
        format_latency(stats.avg_latency_ms)
    );
}

fn print_groups(groups: &[GroupSummary]) {
    println!();
    println!("游戏汇总:");
    for group in groups {
        let best = match (&group.best_latency_ms, &group.best_region) {
            (Some(ms), Some(region)) => format!("，最佳 {ms}ms ({region})"),
            _ => String::new(),
        };
        println!(
            "  {} ({}) - {}{}",
            group.name,
            group.publisher,
            group.status_label(),
            best
        );
    }
}

fn print_rows(
    rows: &[ResultRow<'_>],
    stats: &ScanStatistics,
    groups: Option<&[GroupSummary]>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "results": rows,
                "statistics": stats,
                "groups": groups,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            print_table_results(rows);
            print_statistics(stats);
            if let Some(groups) = groups {
                print_groups(groups);
            }
        }
        OutputFormat::Text => {
            print_text_results(rows);
            print_statistics(stats);
            if let Some(groups) = groups {
                print_groups(groups);
            }
        }
    }
    Ok(())
}

/// 扫描命令
pub struct ScanCommand;

#[async_trait]
impl Command for ScanCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Scan {
            stability,
            samples,
            targets,
            game,
            region,
            area,
            format,
        } = &args.command
        {
            let filter = TargetFilter {
                ids: targets.clone(),
                game: game.clone(),
                region: region.clone(),
                area: area.map(RegionArea::from),
            };
            let ctx = AppContext::load(args).await?;
            self.scan(&ctx, &filter, *stability, *samples, *format).await
        } else {
            Ok(())
        }
    }
}

impl ScanCommand {
    /// 扫描过滤后的目标并保存状态
    pub async fn scan(
        &self,
        ctx: &AppContext,
        filter: &TargetFilter,
        stability: bool,
        samples: Option<usize>,
        format: OutputFormat,
    ) -> Result<()> {
        ctx.require_targets()?;

        let selected = ctx.catalog.filter(filter);
        if selected.is_empty() {
            eprintln!("没有匹配过滤条件的目标");
            return Ok(());
        }

        let store = ctx.load_store().await;
        let orchestrator = Arc::new(ctx.orchestrator(Arc::clone(&store), samples)?);

        let callback = if format == OutputFormat::Json {
            None
        } else {
            println!("开始扫描 {} 个目标...", selected.len());
            let labels: HashMap<String, String> = selected
                .iter()
                .map(|t| (t.id.clone(), target_label(t)))
                .collect();
            let callback: ProgressCallback = Arc::new(move |progress: &ScanProgress<'_>| {
                let label = labels
                    .get(progress.target_id)
                    .map(String::as_str)
                    .unwrap_or(progress.target_id);
                println!(
                    "[{}/{}] {}",
                    progress.completed,
                    progress.total,
                    format_result_line(label, Some(progress.result))
                );
            });
            Some(callback)
        };

        // Ctrl-C 请求协作式取消
        let interrupt = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("收到中断信号，正在取消扫描");
                    orchestrator.cancel();
                }
            })
        };

        orchestrator.scan_all(&selected, callback, stability).await;
        interrupt.abort();

        ctx.save_store(&store).await;

        let guard = store.read().await;
        let rows: Vec<ResultRow<'_>> = selected
            .iter()
            .map(|t| ResultRow::new(t, guard.get_result(&t.id)))
            .collect();
        let stats = ScanStatistics::from_store(&guard);

        if format != OutputFormat::Json {
            println!();
        }
        print_rows(&rows, &stats, None, format)
    }
}

/// 重测命令
pub struct RetestCommand;

#[async_trait]
impl Command for RetestCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Retest { target, format } = &args.command {
            let ctx = AppContext::load(args).await?;
            let target = ctx.catalog.find(target)?.clone();

            let store = ctx.load_store().await;
            let orchestrator = ctx.orchestrator(Arc::clone(&store), None)?;

            if *format != OutputFormat::Json {
                println!("重测 {} ...", target_label(&target));
            }
            let result = orchestrator.retest(&target).await;
            ctx.save_store(&store).await;

            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&ResultRow::new(&target, Some(&result)))?
                    );
                }
                _ => println!(
                    "{}",
                    format_result_line(&target_label(&target), Some(&result))
                ),
            }
        }
        Ok(())
    }
}

/// 结果查看命令
pub struct ResultsCommand;

#[async_trait]
impl Command for ResultsCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Results {
            game,
            region,
            area,
            status,
            format,
        } = &args.command
        {
            let filter = TargetFilter {
                game: game.clone(),
                region: region.clone(),
                area: area.map(RegionArea::from),
                ..Default::default()
            };
            let ctx = AppContext::load(args).await?;
            let store = ctx.load_store().await;
            let guard = store.read().await;

            let selected = Self::select(&ctx.catalog, &guard, &filter, status.map(StatusFilter::from));
            let rows: Vec<ResultRow<'_>> = selected
                .iter()
                .map(|t| ResultRow::new(t, guard.get_result(&t.id)))
                .collect();
            let stats = ScanStatistics::for_targets(&selected, &guard);
            let groups = summarize_groups(&selected, &guard);

            print_rows(&rows, &stats, Some(&groups), *format)?;
        }
        Ok(())
    }
}

impl ResultsCommand {
    /// 按目标条件和结果状态选出要展示的目标
    pub fn select(
        catalog: &Catalog,
        store: &ResultStore,
        filter: &TargetFilter,
        status: Option<StatusFilter>,
    ) -> Vec<ProbeTarget> {
        let selected = catalog.filter(filter);
        match status {
            Some(status) => filter_by_status(selected, store, status),
            None => selected,
        }
    }
}

/// 历史查看命令
pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::History { target, format } = &args.command {
            let ctx = AppContext::load(args).await?;
            let target = ctx.catalog.find(target)?;
            let store = ctx.load_store().await;
            let history = store.read().await.get_history(&target.id);
            let summary = HistorySummary::from_entries(&history);

            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "id": target.id,
                        "history": history,
                        "summary": summary,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                _ => {
                    println!("{} 的历史记录:", target_label(target));
                    if history.is_empty() {
                        println!("  暂无记录");
                    }
                    for entry in &history {
                        let info = DisplayStatus::from(entry.status).info();
                        println!(
                            "  {} {} {} {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            info.icon,
                            info.label,
                            format_latency(entry.latency_ms)
                        );
                    }
                    println!(
                        "最小 {} / 平均 {} / 最大 {}",
                        format_latency(summary.min_latency_ms),
                        format_latency(summary.avg_latency_ms),
                        format_latency(summary.max_latency_ms)
                    );
                }
            }
        }
        Ok(())
    }
}

/// 目标列表命令
pub struct TargetsCommand;

#[async_trait]
impl Command for TargetsCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Targets { format } = &args.command {
            let ctx = AppContext::load(args).await?;
            let targets = ctx.catalog.targets();

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(targets)?);
                }
                OutputFormat::Table => {
                    println!(
                        "{:<28} {:<20} {:<14} {:<14} {:<40}",
                        "目标ID", "游戏", "发行商", "区域", "端点"
                    );
                    println!("{}", "-".repeat(116));
                    for t in targets {
                        println!(
                            "{:<28} {:<20} {:<14} {:<14} {:<40}",
                            t.id, t.name, t.publisher, t.region, t.endpoint
                        );
                    }
                }
                OutputFormat::Text => {
                    for t in targets {
                        let marker = if t.is_custom { " [自定义]" } else { "" };
                        println!("{} - {} ({}){}", t.id, t.name, t.region, marker);
                        println!("    {}", t.display());
                    }
                    println!("共 {} 个目标", targets.len());
                }
            }
        }
        Ok(())
    }
}

/// 添加自定义游戏命令
pub struct AddCommand;

#[async_trait]
impl Command for AddCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Add {
            name,
            publisher,
            locations,
        } = &args.command
        {
            let locations = locations
                .iter()
                .map(|l| l.parse::<Location>())
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let ctx = AppContext::load(args).await?;
            let added = ctx
                .custom_store
                .add_game(name, publisher.as_deref(), &locations)
                .await?;

            println!("✓ 已添加 \"{}\"，共 {} 个服务器位置:", name, added.len());
            for target in &added {
                println!("  {} - {} ({})", target.id, target.region, target.endpoint);
            }
        }
        Ok(())
    }
}

/// 删除自定义游戏命令
pub struct RemoveCommand;

#[async_trait]
impl Command for RemoveCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Remove { name } = &args.command {
            let ctx = AppContext::load(args).await?;
            let removed = ctx.custom_store.remove_game(name).await?;

            if removed == 0 {
                eprintln!("未找到名为 \"{name}\" 的自定义游戏");
            } else {
                println!("✓ 已删除 \"{name}\" 的 {removed} 个目标");
            }
        }
        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                _ => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    pub async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加您的探测目标");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  探测超时: {}ms", config.global.probe_timeout_ms);
            println!(
                "  稳定性测试: {} 个样本，间隔 {}ms",
                config.global.sample_count, config.global.sample_delay_ms
            );
            println!(
                "  批大小: {}，批间隔 {}ms",
                config.global.batch_size, config.global.batch_delay_ms
            );
            println!("  历史条数: {}", config.global.history_limit);
            println!("  日志级别: {}", config.global.log_level);

            println!("目标配置:");
            for (i, target) in config.targets.iter().enumerate() {
                println!(
                    "  {}. {} - {} ({})",
                    i + 1,
                    target.id,
                    target.name,
                    target.region
                );
                println!("     端点: {}", target.endpoint);
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个目标配置", config.targets.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeOutcome, StabilityResult};
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sample_config_is_valid() {
        let config = TomlConfigLoader::new(false)
            .load_from_string(SAMPLE_CONFIG)
            .await
            .unwrap();
        assert!(config.targets.len() >= 5);
        assert_eq!(config.global, crate::config::GlobalConfig::default());
    }

    #[tokio::test]
    async fn test_init_writes_sample_and_respects_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("caniplay.toml");

        InitCommand.create_config_file(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_CONFIG);

        std::fs::write(&path, "# edited").unwrap();
        InitCommand.create_config_file(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");

        InitCommand.create_config_file(&path, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_CONFIG);
    }

    #[test]
    fn test_display_status_mapping() {
        assert_eq!(display_status(None), DisplayStatus::Pending);

        let fast: ScanResult = ProbeOutcome::reachable(Duration::from_millis(40)).into();
        assert_eq!(display_status(Some(&fast)), DisplayStatus::Reachable);

        let slow: ScanResult = ProbeOutcome::reachable(Duration::from_millis(220)).into();
        assert_eq!(display_status(Some(&slow)), DisplayStatus::Warning);

        let timeout: ScanResult = ProbeOutcome::timeout("Request timed out").into();
        assert_eq!(display_status(Some(&timeout)), DisplayStatus::Timeout);
    }

    #[test]
    fn test_format_result_line() {
        let result: ScanResult = StabilityResult {
            status: crate::probe::ProbeStatus::Reachable,
            latency_ms: Some(55),
            min_latency_ms: Some(40),
            max_latency_ms: Some(70),
            jitter_ms: Some(10),
            packet_loss: 20,
            samples: 5,
            timestamp: Utc::now(),
        }
        .into();

        let line = format_result_line("Valorant (Tokyo)", Some(&result));
        assert!(line.starts_with("✓ Valorant (Tokyo) - Playable"));
        assert!(line.contains("55ms (good)"));
        assert!(line.contains("抖动 10ms"));
        assert!(line.contains("丢包 20%"));

        let pending = format_result_line("X", None);
        assert_eq!(pending, "○ X - Pending");
    }

    #[tokio::test]
    async fn test_context_merges_custom_targets_first() {
        let dir = TempDir::new().unwrap();
        let mut config = TomlConfigLoader::new(false)
            .load_from_string(SAMPLE_CONFIG)
            .await
            .unwrap();
        config.global.custom_targets_file = Some(dir.path().join("custom.json"));
        config.global.state_file = Some(dir.path().join("state.json"));

        let store = CustomTargetStore::new(dir.path().join("custom.json"));
        store
            .add_game(
                "My Game",
                None,
                &["EU=eu.example.com".parse::<Location>().unwrap()],
            )
            .await
            .unwrap();

        let ctx = AppContext::from_config(config).await;
        assert!(ctx.catalog.targets()[0].is_custom);
        assert_eq!(ctx.catalog.targets()[0].publisher, "Custom");
        assert!(ctx.require_targets().is_ok());
    }

    #[tokio::test]
    async fn test_results_selection_combines_filters() {
        let config = TomlConfigLoader::new(false)
            .load_from_string(SAMPLE_CONFIG)
            .await
            .unwrap();
        let catalog = Catalog::merge(Vec::new(), config.probe_targets());

        let mut store = ResultStore::default();
        store.record(
            "valorant-tokyo",
            ProbeOutcome::reachable(Duration::from_millis(30)).into(),
        );
        store.record("valorant-singapore", ProbeOutcome::blocked("refused").into());
        store.record("cs2-useast", ProbeOutcome::timeout("Request timed out").into());

        let ids = |targets: Vec<ProbeTarget>| -> Vec<String> {
            targets.into_iter().map(|t| t.id).collect()
        };

        let by_publisher = TargetFilter {
            game: Some("valve".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ids(ResultsCommand::select(&catalog, &store, &by_publisher, None)),
            vec!["cs2-useast", "steam-store"]
        );

        let blocked = ResultsCommand::select(
            &catalog,
            &store,
            &TargetFilter::default(),
            Some(StatusFilter::Blocked),
        );
        assert_eq!(ids(blocked), vec!["valorant-singapore", "cs2-useast"]);

        let asia_playable = TargetFilter {
            area: Some(RegionArea::AsiaPacific),
            ..Default::default()
        };
        assert_eq!(
            ids(ResultsCommand::select(
                &catalog,
                &store,
                &asia_playable,
                Some(StatusFilter::Playable)
            )),
            vec!["valorant-tokyo"]
        );

        let americas = TargetFilter {
            area: Some(RegionArea::Americas),
            ..Default::default()
        };
        assert_eq!(
            ids(ResultsCommand::select(&catalog, &store, &americas, None)),
            vec!["cs2-useast", "battlenet-us"]
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.global.custom_targets_file = Some(dir.path().join("custom.json"));

        let ctx = AppContext::from_config(config).await;
        assert!(ctx.require_targets().is_err());
    }
}
