use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tileview::ManagerConfig;
use tileview_core::LonLat;

/// Environment variable naming the tile server, read after `.env` is loaded.
pub const ORIGIN_ENV: &str = "TILES_ORIGIN";

pub fn load_file(path: &Path) -> Result<ManagerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
}

/// File settings first, then the environment, then flags.
pub fn layered(
    file: Option<ManagerConfig>,
    env_origin: Option<String>,
    flag_origin: Option<String>,
) -> ManagerConfig {
    let mut config = file.unwrap_or_default();
    if let Some(origin) = env_origin.filter(|o| !o.trim().is_empty()) {
        config.origin = origin;
    }
    if let Some(origin) = flag_origin {
        config.origin = origin;
    }
    config
}

/// One step of a replay script: either a raw zoom transform or a map
/// center and zoom level, followed by a pause.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Transform {
        k: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        wait_ms: u64,
    },
    Center {
        center: LonLat,
        zoom: f64,
        #[serde(default)]
        wait_ms: u64,
    },
}

impl Step {
    pub fn wait_ms(&self) -> u64 {
        match self {
            Step::Transform { wait_ms, .. } | Step::Center { wait_ms, .. } => *wait_ms,
        }
    }
}

pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay script: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse replay script: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileview::BelowThresholdPolicy;

    #[test]
    fn test_toml_fields_are_optional() {
        let config: ManagerConfig = toml::from_str(
            r#"
            origin = "http://tiles.local:9000"
            max_concurrent = 2
            below_threshold = "evict"
            "#,
        )
        .unwrap();
        assert_eq!(config.origin, "http://tiles.local:9000");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.below_threshold, BelowThresholdPolicy::Evict);
        assert_eq!(config.debounce_ms, 300);
    }

    #[test]
    fn test_flag_beats_env_beats_file() {
        let file = ManagerConfig { origin: "http://file".into(), ..Default::default() };
        let from_env = layered(Some(file.clone()), Some("http://env".into()), None);
        assert_eq!(from_env.origin, "http://env");
        let from_flag = layered(Some(file.clone()), Some("http://env".into()), Some("http://flag".into()));
        assert_eq!(from_flag.origin, "http://flag");
        let blank_env = layered(Some(file), Some("  ".into()), None);
        assert_eq!(blank_env.origin, "http://file");
        assert_eq!(layered(None, None, None), ManagerConfig::default());
    }

    #[test]
    fn test_script_accepts_both_step_shapes() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                {"k": 1024, "x": -500, "y": 20, "wait_ms": 50},
                {"center": [-86.8, 33.5], "zoom": 11}
            ]"#,
        )
        .unwrap();
        assert_eq!(steps[0], Step::Transform { k: 1024.0, x: -500.0, y: 20.0, wait_ms: 50 });
        assert_eq!(steps[1], Step::Center { center: [-86.8, 33.5], zoom: 11.0, wait_ms: 0 });
        assert_eq!(steps[1].wait_ms(), 0);
    }
}
