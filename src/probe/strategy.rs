//! 探测策略实现
//!
//! 提供两种可互换的探测方式：HTTP请求探测与图片加载探测。
//!
//! 两种方式都把跨域响应视为不透明的：响应能完成就说明主机可达，
//! 失败时只能依靠耗时推断。这些阈值是近似判断，无法区分
//! "主机响应了但被策略拦截" 与 "主机不可达"，结果中的 `note`
//! 字段用于标记这类推断。

use crate::probe::outcome::ProbeOutcome;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Client, Url};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// HTTP请求探测失败时，耗时低于超时预算的该比例仍判定为可达
pub const REQUEST_FAST_FAILURE_RATIO: f64 = 0.8;

/// 图片加载失败时，耗时低于该值仍判定为可达
pub const IMAGE_FAST_ERROR_THRESHOLD: Duration = Duration::from_millis(1000);

/// 视为图片资源的扩展名
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "ico", "svg", "webp"];

/// 探测策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// HTTP请求探测
    HttpRequest,
    /// 图片加载探测
    ImageLoad,
}

impl ProbeStrategy {
    /// 根据端点URL选择探测策略
    ///
    /// URL路径以图片扩展名结尾（忽略查询串）时使用图片加载探测，
    /// 其余情况（包括无法解析的URL）使用HTTP请求探测
    pub fn select(url: &str) -> Self {
        let Ok(parsed) = Url::parse(url) else {
            return ProbeStrategy::HttpRequest;
        };

        let extension = parsed
            .path()
            .rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => ProbeStrategy::ImageLoad,
            _ => ProbeStrategy::HttpRequest,
        }
    }

    /// 执行探测
    pub async fn run(&self, client: &Client, url: &str, budget: Duration) -> ProbeOutcome {
        match self {
            ProbeStrategy::HttpRequest => probe_request(client, url, budget).await,
            ProbeStrategy::ImageLoad => probe_image(client, url, budget).await,
        }
    }
}

impl std::fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStrategy::HttpRequest => write!(f, "http"),
            ProbeStrategy::ImageLoad => write!(f, "image"),
        }
    }
}

/// HTTP请求探测
///
/// 禁用缓存发起GET请求并与超时竞争。任何完成的响应（不论状态码）都视为可达。
/// 超时后请求future被丢弃，连接随之中止。
pub async fn probe_request(client: &Client, url: &str, budget: Duration) -> ProbeOutcome {
    let start = Instant::now();

    let request = client
        .get(url)
        .header(CACHE_CONTROL, "no-store")
        .header(PRAGMA, "no-cache")
        .send();

    match timeout(budget, request).await {
        Ok(Ok(response)) => {
            debug!("HTTP探测完成: {} -> {}", url, response.status());
            ProbeOutcome::reachable(start.elapsed())
        }
        Ok(Err(e)) if e.is_timeout() => ProbeOutcome::timeout("Request timed out"),
        Ok(Err(e)) => {
            debug!("HTTP探测失败: {} - {}", url, e);
            classify_request_failure(start.elapsed(), budget, e.to_string())
        }
        Err(_) => ProbeOutcome::timeout("Request timed out"),
    }
}

/// 对非超时的请求失败进行分类
pub fn classify_request_failure(elapsed: Duration, budget: Duration, error: String) -> ProbeOutcome {
    if elapsed < budget.mul_f64(REQUEST_FAST_FAILURE_RATIO) {
        ProbeOutcome::heuristic_reachable(elapsed, "Request rejected quickly, host likely reachable")
    } else {
        ProbeOutcome::blocked(error)
    }
}

/// 图片加载探测
///
/// 附加缓存破坏参数后下载资源，成功、失败与超时三条路径互斥，
/// 先完成者决定结果
pub async fn probe_image(client: &Client, url: &str, budget: Duration) -> ProbeOutcome {
    let busted = cache_busted_url(url, chrono::Utc::now().timestamp_millis());
    let start = Instant::now();

    match timeout(budget, load_image(client, &busted)).await {
        Ok(Ok(())) => ProbeOutcome::reachable(start.elapsed()),
        Ok(Err(reason)) => {
            debug!("图片加载失败: {} - {}", url, reason);
            classify_image_error(start.elapsed())
        }
        Err(_) => ProbeOutcome::timeout("Image load timed out"),
    }
}

/// 对图片加载错误进行分类
pub fn classify_image_error(elapsed: Duration) -> ProbeOutcome {
    if elapsed < IMAGE_FAST_ERROR_THRESHOLD {
        ProbeOutcome::heuristic_reachable(elapsed, "Image error but fast response")
    } else {
        ProbeOutcome::blocked("Image failed to load")
    }
}

/// 下载并确认资源为图片
async fn load_image(client: &Client, url: &str) -> std::result::Result<(), String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status().as_u16()));
    }

    let is_image = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("image/"));

    if !is_image {
        return Err("response is not an image".to_string());
    }

    response.bytes().await.map_err(|e| e.to_string())?;
    Ok(())
}

/// 追加缓存破坏参数 `_t`
pub fn cache_busted_url(url: &str, stamp: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_t={stamp}")
}
