use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::gesture::{validate_definitions, GestureDefinition, PredicateThresholds};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub thresholds: PredicateThresholds,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ランドマーク推定器からの接続を待ち受けるアドレス
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// ジェスチャー定義ファイル
    #[serde(default = "default_emotes_path")]
    pub emotes_path: PathBuf,
    #[serde(default)]
    pub debug: bool,
    /// 統計ログの間隔 (秒)。0 で無効
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

fn default_listen_addr() -> String { "127.0.0.1:9300".to_string() }
fn default_emotes_path() -> PathBuf { PathBuf::from("emotes/emotes.toml") }
fn default_stats_interval() -> u64 { 300 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            emotes_path: default_emotes_path(),
            debug: false,
            stats_interval_secs: default_stats_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectionConfig {
    /// 発火までに候補が続く必要のある時間 (秒)
    #[serde(default = "default_hold_time")]
    pub hold_time: f32,
    /// 同じジェスチャーが再発火できるまでの時間 (秒)
    #[serde(default = "default_cooldown_time")]
    pub cooldown_time: f32,
    /// 安定化フィルタの窓サイズ (フレーム)
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// 窓内で必要な出現回数
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: usize,
}

fn default_hold_time() -> f32 { 1.0 }
fn default_cooldown_time() -> f32 { 2.0 }
fn default_window_size() -> usize { 2 }
fn default_min_occurrences() -> usize { 1 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            hold_time: default_hold_time(),
            cooldown_time: default_cooldown_time(),
            window_size: default_window_size(),
            min_occurrences: default_min_occurrences(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.hold_time.is_finite() && self.hold_time >= 0.0) {
            bail!("detection.hold_time must be >= 0 (got {})", self.hold_time);
        }
        if !(self.cooldown_time.is_finite() && self.cooldown_time >= 0.0) {
            bail!("detection.cooldown_time must be >= 0 (got {})", self.cooldown_time);
        }
        if self.window_size == 0 {
            bail!("detection.window_size must be at least 1");
        }
        if self.min_occurrences == 0 || self.min_occurrences > self.window_size {
            bail!(
                "detection.min_occurrences must be within 1..={} (got {})",
                self.window_size,
                self.min_occurrences
            );
        }
        Ok(())
    }

    pub fn hold(&self) -> Duration {
        Duration::try_from_secs_f32(self.hold_time).unwrap_or_default()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(self.cooldown_time).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Osc,
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TriggerConfig {
    #[serde(default = "default_sink")]
    pub sink: SinkKind,
    /// クリッププレイヤーの OSC 受信アドレス
    #[serde(default = "default_osc_addr")]
    pub osc_addr: String,
}

fn default_sink() -> SinkKind { SinkKind::Osc }
fn default_osc_addr() -> String { "127.0.0.1:9301".to_string() }

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            osc_addr: default_osc_addr(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&content)?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.detection.validate()?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト値で続行。あるのに不正ならエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// `emotes.toml` の構造。`[[emote]]` の並び順が優先順位
#[derive(Debug, Deserialize)]
struct EmoteFile {
    #[serde(default, rename = "emote")]
    emotes: Vec<GestureDefinition>,
}

pub fn parse_definitions(content: &str) -> Result<Vec<GestureDefinition>> {
    let file: EmoteFile = toml::from_str(content)?;
    validate_definitions(&file.emotes)?;
    Ok(file.emotes)
}

/// ジェスチャー定義を読み込む。メディアファイルが無い場合は警告のみ
pub fn load_definitions<P: AsRef<Path>>(path: P) -> Result<Vec<GestureDefinition>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let defs = parse_definitions(&content)
        .with_context(|| format!("invalid gesture definitions in {}", path.display()))?;

    for def in &defs {
        if !def.action.video_path.exists() {
            warn!("video for {} not found: {}", def.name, def.action.video_path.display());
        }
        if let Some(audio) = &def.action.audio_path {
            if !audio.exists() {
                warn!("audio for {} not found: {}", def.name, audio.display());
            }
        }
    }
    info!("loaded {} gesture definitions from {}", defs.len(), path.display());
    Ok(defs)
}
