//! 单目标探测器
//!
//! 为每个目标选择探测策略并执行一次带超时的探测，本层不做重试

use crate::catalog::ProbeTarget;
use crate::error::ProbeError;
use crate::probe::outcome::ProbeOutcome;
use crate::probe::strategy::ProbeStrategy;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// 默认探测超时时间
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// 探测器trait，定义单次探测接口
///
/// 实现必须把所有失败归类为 `ProbeOutcome`，不能向调用方传播错误
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对目标执行一次探测
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome;
}

/// 基于HTTP客户端的探测器
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 单次探测超时时间
    timeout: Duration,
}

impl HttpProber {
    /// 创建新的探测器
    ///
    /// # 参数
    /// * `timeout` - 单次探测超时时间
    /// * `user_agent` - 自定义User-Agent，为空时使用默认值
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, ProbeError> {
        let user_agent = user_agent
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", crate::APP_NAME, crate::VERSION));

        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client, timeout })
    }

    /// 使用默认超时创建探测器
    pub fn with_default_timeout() -> Result<Self, ProbeError> {
        Self::new(DEFAULT_PROBE_TIMEOUT, None)
    }

    /// 获取超时时间
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 使用指定超时探测任意URL
    pub async fn probe_url(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let strategy = ProbeStrategy::select(url);
        debug!("探测 {} (策略: {})", url, strategy);
        strategy.run(&self.client, url, timeout).await
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        self.probe_url(&target.endpoint, self.timeout).await
    }
}
