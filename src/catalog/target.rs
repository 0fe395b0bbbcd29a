//! 探测目标定义
//!
//! 目标由外部目录（配置文件或用户自定义）提供，引擎只按引用读取

use serde::{Deserialize, Serialize};

/// 探测目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_endpoint: Option<String>,
    /// 是否为用户自定义目标
    #[serde(default)]
    pub is_custom: bool,
    /// 自定义游戏ID（同一次添加的所有位置共享）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_game_id: Option<String>,
}

impl ProbeTarget {
    /// 创建新的探测目标
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        publisher: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            publisher: publisher.into(),
            region: region.into(),
            endpoint: endpoint.into(),
            display_endpoint: None,
            is_custom: false,
            custom_game_id: None,
        }
    }

    /// 设置展示用端点描述
    pub fn with_display_endpoint(mut self, display: impl Into<String>) -> Self {
        self.display_endpoint = Some(display.into());
        self
    }

    /// 分组键（游戏名称 + 发行商）
    pub fn group_key(&self) -> String {
        format!("{}-{}", self.name, self.publisher)
    }

    /// 展示用端点，未设置时回退为探测URL
    pub fn display(&self) -> &str {
        self.display_endpoint.as_deref().unwrap_or(&self.endpoint)
    }
}

/// 大区划分，按区域名称中的关键字归类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionArea {
    /// 亚太
    AsiaPacific,
    /// 欧洲
    Europe,
    /// 美洲
    Americas,
    /// 大洋洲
    Oceania,
    /// 中东
    MiddleEast,
    /// 全球（CDN等）
    Global,
}

impl RegionArea {
    /// 归类关键字（小写，部分带分隔符以避免误匹配）
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            RegionArea::AsiaPacific => &[
                "asia",
                "apac",
                "singapore",
                "mumbai",
                "tokyo",
                "japan",
                "korea",
                "india",
                "seoul",
                "hong kong",
                "southeast",
            ],
            RegionArea::Europe => &[
                "europe",
                "eu ",
                "eu-",
                "amsterdam",
                "frankfurt",
                "london",
                "paris",
                "stockholm",
                "russia",
            ],
            RegionArea::Americas => &[
                "america",
                "na ",
                "na-",
                "us ",
                "us-",
                "chicago",
                "virginia",
                "oregon",
                "brazil",
                "texas",
            ],
            RegionArea::Oceania => &["oceania", "australia", "sydney"],
            RegionArea::MiddleEast => &["middle east", "bahrain"],
            RegionArea::Global => &["global", "cdn"],
        }
    }

    /// 判断区域名称是否属于该大区
    pub fn contains(&self, region: &str) -> bool {
        let region = region.to_lowercase();
        self.keywords().iter().any(|kw| region.contains(kw))
    }
}

impl std::fmt::Display for RegionArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RegionArea::AsiaPacific => "Asia Pacific",
            RegionArea::Europe => "Europe",
            RegionArea::Americas => "Americas",
            RegionArea::Oceania => "Oceania",
            RegionArea::MiddleEast => "Middle East",
            RegionArea::Global => "Global",
        };
        write!(f, "{label}")
    }
}

/// 目标过滤条件
#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    /// 指定的目标ID（为空表示不限）
    pub ids: Vec<String>,
    /// 游戏名称或发行商子串（不区分大小写）
    pub game: Option<String>,
    /// 区域子串（不区分大小写）
    pub region: Option<String>,
    /// 大区
    pub area: Option<RegionArea>,
}

impl TargetFilter {
    /// 判断目标是否匹配
    pub fn matches(&self, target: &ProbeTarget) -> bool {
        if !self.ids.is_empty() && !self.ids.iter().any(|id| id == &target.id) {
            return false;
        }

        if let Some(game) = &self.game {
            if !contains_ignore_case(&target.name, game)
                && !contains_ignore_case(&target.publisher, game)
            {
                return false;
            }
        }

        if let Some(region) = &self.region {
            if !contains_ignore_case(&target.region, region) {
                return false;
            }
        }

        if let Some(area) = &self.area {
            if !area.contains(&target.region) {
                return false;
            }
        }

        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valorant() -> ProbeTarget {
        ProbeTarget::new(
            "valorant-tokyo",
            "Valorant",
            "Riot Games",
            "Tokyo",
            "https://playvalorant.com/favicon.ico",
        )
        .with_display_endpoint("Tokyo, Japan")
    }

    #[test]
    fn test_group_key_and_display() {
        let target = valorant();
        assert_eq!(target.group_key(), "Valorant-Riot Games");
        assert_eq!(target.display(), "Tokyo, Japan");

        let bare = ProbeTarget::new("x", "X", "Y", "Z", "https://x.example/");
        assert_eq!(bare.display(), "https://x.example/");
    }

    #[test]
    fn test_filter_matching() {
        let target = valorant();

        assert!(TargetFilter::default().matches(&target));

        let by_id = TargetFilter {
            ids: vec!["valorant-tokyo".to_string()],
            ..Default::default()
        };
        assert!(by_id.matches(&target));

        let by_game = TargetFilter {
            game: Some("valo".to_string()),
            ..Default::default()
        };
        assert!(by_game.matches(&target));

        let wrong_region = TargetFilter {
            region: Some("frankfurt".to_string()),
            ..Default::default()
        };
        assert!(!wrong_region.matches(&target));

        let by_region = TargetFilter {
            region: Some("TOK".to_string()),
            ..Default::default()
        };
        assert!(by_region.matches(&target));
    }

    #[test]
    fn test_filter_game_matches_publisher() {
        let target = valorant();

        let by_publisher = TargetFilter {
            game: Some("riot".to_string()),
            ..Default::default()
        };
        assert!(by_publisher.matches(&target));

        let neither = TargetFilter {
            game: Some("valve".to_string()),
            ..Default::default()
        };
        assert!(!neither.matches(&target));
    }

    #[test]
    fn test_filter_by_area() {
        let target = valorant();

        let asia = TargetFilter {
            area: Some(RegionArea::AsiaPacific),
            ..Default::default()
        };
        assert!(asia.matches(&target));

        let europe = TargetFilter {
            area: Some(RegionArea::Europe),
            ..Default::default()
        };
        assert!(!europe.matches(&target));
    }

    #[test]
    fn test_region_area_keywords() {
        assert!(RegionArea::Europe.contains("EU West"));
        assert!(RegionArea::Europe.contains("Frankfurt"));
        assert!(RegionArea::Europe.contains("Russia"));
        assert!(!RegionArea::Europe.contains("EU"));

        assert!(RegionArea::Americas.contains("US East"));
        assert!(RegionArea::Americas.contains("NA Central"));
        assert!(RegionArea::Americas.contains("North America"));
        assert!(RegionArea::Americas.contains("Brazil"));
        assert!(!RegionArea::Americas.contains("Australia"));

        assert!(RegionArea::AsiaPacific.contains("Southeast Asia"));
        assert!(RegionArea::AsiaPacific.contains("Hong Kong"));
        assert!(RegionArea::Oceania.contains("Sydney"));
        assert!(RegionArea::MiddleEast.contains("Bahrain"));
        assert!(RegionArea::Global.contains("Global CDN"));

        assert_eq!(RegionArea::MiddleEast.to_string(), "Middle East");
    }

    #[test]
    fn test_target_deserializes_without_optional_fields() {
        let json = r#"{"id":"a","name":"A","publisher":"P","region":"R","endpoint":"https://a.example/"}"#;
        let target: ProbeTarget = serde_json::from_str(json).unwrap();
        assert!(!target.is_custom);
        assert!(target.display_endpoint.is_none());
        assert!(target.custom_game_id.is_none());
    }
}
