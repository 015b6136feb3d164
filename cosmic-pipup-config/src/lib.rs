use cosmic_config::{CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry};
use std::time::Duration;

pub const ID: &str = "io.github.CosmicPipup";

/// Screen placement of popups that do not request one
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Anchor {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    Center,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, CosmicConfigEntry)]
#[version = 1]
pub struct PopupsConfig {
    /// Drop incoming popups
    pub do_not_disturb: bool,
    pub anchor: Anchor,
    /// Lifetime in seconds of popups that do not request one
    pub default_duration_secs: u32,
    /// Upper bound in seconds for requested lifetimes
    pub max_duration_secs: u32,
    /// Time in milliseconds an image fetch may take
    pub fetch_timeout_ms: u32,
    /// Time in milliseconds a video may take to prepare. `None` waits forever.
    #[serde(default = "default_video_prepare_timeout")]
    pub video_prepare_timeout_ms: Option<u32>,
    /// Minimum popup width in pixels (default: 240)
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    /// Padding around popup content in pixels (default: 20)
    #[serde(default = "default_padding")]
    pub padding: u16,
    /// Whether popups show their media; text only when false (default: true)
    #[serde(default = "default_true")]
    pub show_media: bool,
    /// Whether animated images play (default: true)
    #[serde(default = "default_true")]
    pub enable_animations: bool,
}

impl Default for PopupsConfig {
    fn default() -> Self {
        Self {
            do_not_disturb: false,
            anchor: Anchor::default(),
            default_duration_secs: 30,
            max_duration_secs: 600,
            fetch_timeout_ms: 20_000,
            video_prepare_timeout_ms: default_video_prepare_timeout(),
            min_width: default_min_width(),
            padding: default_padding(),
            show_media: default_true(),
            enable_animations: default_true(),
        }
    }
}

impl PopupsConfig {
    /// Lifetime for a popup, clamped to `max_duration_secs`
    pub fn popup_duration(&self, requested: Option<Duration>) -> Duration {
        let max = Duration::from_secs(u64::from(self.max_duration_secs.max(1)));
        requested
            .unwrap_or_else(|| Duration::from_secs(u64::from(self.default_duration_secs)))
            .min(max)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.fetch_timeout_ms))
    }

    pub fn video_prepare_timeout(&self) -> Option<Duration> {
        self.video_prepare_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

// Default value helpers for serde
const fn default_true() -> bool {
    true
}

const fn default_video_prepare_timeout() -> Option<u32> {
    Some(20_000)
}

const fn default_min_width() -> u32 {
    240
}

const fn default_padding() -> u16 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PopupsConfig::default();

        assert!(!config.do_not_disturb);
        assert_eq!(config.anchor, Anchor::TopRight);
        assert_eq!(config.default_duration_secs, 30);
        assert_eq!(config.max_duration_secs, 600);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(20));
        assert_eq!(config.video_prepare_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.min_width, 240);
        assert_eq!(config.padding, 20);
        assert!(config.show_media);
        assert!(config.enable_animations);
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let minimal_json = r#"{
            "do_not_disturb": false,
            "anchor": "BottomLeft",
            "default_duration_secs": 10,
            "max_duration_secs": 60,
            "fetch_timeout_ms": 5000
        }"#;

        let config: PopupsConfig = serde_json::from_str(minimal_json).unwrap();

        assert_eq!(config.anchor, Anchor::BottomLeft);
        assert_eq!(config.default_duration_secs, 10);
        assert_eq!(config.video_prepare_timeout_ms, Some(20_000));
        assert_eq!(config.min_width, 240);
        assert!(config.show_media);
        assert!(config.enable_animations);
    }

    #[test]
    fn test_unbounded_video_preparation() {
        let config = PopupsConfig {
            video_prepare_timeout_ms: None,
            ..PopupsConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"video_prepare_timeout_ms\":null"));

        let config: PopupsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.video_prepare_timeout(), None);
    }

    #[test]
    fn test_popup_duration() {
        let config = PopupsConfig::default();

        assert_eq!(config.popup_duration(None), Duration::from_secs(30));
        assert_eq!(
            config.popup_duration(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            config.popup_duration(Some(Duration::from_secs(3600))),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_default_helpers() {
        assert!(default_true());
        assert_eq!(default_min_width(), 240);
        assert_eq!(default_padding(), 20);
        assert_eq!(default_video_prepare_timeout(), Some(20_000));
    }
}
