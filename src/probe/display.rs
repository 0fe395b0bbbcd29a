//! 展示辅助
//!
//! 延迟质量分级与状态标签映射，供渲染层使用

use crate::probe::outcome::ProbeStatus;
use serde::{Deserialize, Serialize};

/// 延迟质量等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyQuality {
    /// 小于50ms
    Excellent,
    /// 小于100ms
    Good,
    /// 小于150ms
    Acceptable,
    /// 150ms及以上
    Poor,
    /// 无延迟数据
    Unknown,
}

impl LatencyQuality {
    /// 根据延迟计算质量等级
    pub fn from_latency(latency_ms: Option<u64>) -> Self {
        match latency_ms {
            None => LatencyQuality::Unknown,
            Some(ms) if ms < 50 => LatencyQuality::Excellent,
            Some(ms) if ms < 100 => LatencyQuality::Good,
            Some(ms) if ms < 150 => LatencyQuality::Acceptable,
            Some(_) => LatencyQuality::Poor,
        }
    }

    /// 等级名称
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyQuality::Excellent => "excellent",
            LatencyQuality::Good => "good",
            LatencyQuality::Acceptable => "acceptable",
            LatencyQuality::Poor => "poor",
            LatencyQuality::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LatencyQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 展示状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Reachable,
    Blocked,
    Timeout,
    Warning,
    Testing,
    Pending,
}

/// 状态展示信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    /// 显示标签
    pub label: &'static str,
    /// 样式类名
    pub class: &'static str,
    /// 图标
    pub icon: &'static str,
}

impl DisplayStatus {
    /// 获取展示信息
    pub fn info(&self) -> StatusInfo {
        let (label, class, icon) = match self {
            DisplayStatus::Reachable => ("Playable", "reachable", "✓"),
            DisplayStatus::Blocked => ("Blocked", "blocked", "✗"),
            DisplayStatus::Timeout => ("Timeout", "blocked", "⏱"),
            DisplayStatus::Warning => ("High Ping", "warning", "⚠"),
            DisplayStatus::Testing => ("Testing", "testing", "◌"),
            DisplayStatus::Pending => ("Pending", "pending", "○"),
        };
        StatusInfo { label, class, icon }
    }

    /// 从字符串解析，未知值回退为 `Pending`
    pub fn parse_or_pending(value: &str) -> Self {
        match value {
            "reachable" => DisplayStatus::Reachable,
            "blocked" => DisplayStatus::Blocked,
            "timeout" => DisplayStatus::Timeout,
            "warning" => DisplayStatus::Warning,
            "testing" => DisplayStatus::Testing,
            _ => DisplayStatus::Pending,
        }
    }
}

impl From<ProbeStatus> for DisplayStatus {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Reachable => DisplayStatus::Reachable,
            ProbeStatus::Blocked => DisplayStatus::Blocked,
            ProbeStatus::Timeout => DisplayStatus::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_quality_thresholds() {
        assert_eq!(LatencyQuality::from_latency(None), LatencyQuality::Unknown);
        assert_eq!(LatencyQuality::from_latency(Some(0)), LatencyQuality::Excellent);
        assert_eq!(LatencyQuality::from_latency(Some(49)), LatencyQuality::Excellent);
        assert_eq!(LatencyQuality::from_latency(Some(50)), LatencyQuality::Good);
        assert_eq!(LatencyQuality::from_latency(Some(99)), LatencyQuality::Good);
        assert_eq!(LatencyQuality::from_latency(Some(100)), LatencyQuality::Acceptable);
        assert_eq!(LatencyQuality::from_latency(Some(149)), LatencyQuality::Acceptable);
        assert_eq!(LatencyQuality::from_latency(Some(150)), LatencyQuality::Poor);
        assert_eq!(LatencyQuality::from_latency(Some(5000)), LatencyQuality::Poor);
    }

    #[test]
    fn test_status_info_mapping() {
        assert_eq!(DisplayStatus::Reachable.info().label, "Playable");
        assert_eq!(DisplayStatus::Timeout.info().class, "blocked");
        assert_eq!(DisplayStatus::Warning.info().label, "High Ping");
        assert_eq!(DisplayStatus::Pending.info().icon, "○");
    }

    #[test]
    fn test_unknown_status_falls_back_to_pending() {
        assert_eq!(DisplayStatus::parse_or_pending("warning"), DisplayStatus::Warning);
        assert_eq!(DisplayStatus::parse_or_pending("nonsense"), DisplayStatus::Pending);
        assert_eq!(
            DisplayStatus::from(ProbeStatus::Timeout).info(),
            DisplayStatus::Timeout.info()
        );
    }
}
