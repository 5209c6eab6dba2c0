//! 記録済みランドマーク (JSON Lines) を検出器に流して発火タイミングを確認する
//!
//! 1 行 1 フレーム: `{"t": 1.25, "snapshot": {"pose": {...}, "hands": [...]}}`
//!
//! 推定器の生配列をそのまま書き出した形式も読める:
//! `{"t": 1.25, "pose_points": [[x, y, z, visibility], ...], "hand_points": [{"handedness": "left", "points": [[x, y, z], ...]}]}`

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use emote_stream::config::{load_definitions, Config};
use emote_stream::gesture::GestureDetector;
use emote_stream::landmark::{HandLandmarks, Handedness, LandmarkSnapshot};
use emote_stream::stats::SessionStats;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay recorded landmarks through the gesture detector")]
struct Cli {
    /// JSON Lines file
    input: PathBuf,

    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override [app] emotes_path
    #[arg(long)]
    emotes: Option<PathBuf>,

    #[arg(long)]
    debug: bool,
}

/// 手の点には可視度が無いので一律にこの値を与える
const HAND_POINT_VISIBILITY: f32 = 1.0;

#[derive(Debug, Deserialize)]
struct RawHand {
    #[serde(default)]
    handedness: Option<Handedness>,
    points: Vec<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct Record {
    /// セッション開始からの秒数
    t: f64,
    #[serde(default)]
    snapshot: Option<LandmarkSnapshot>,
    #[serde(default)]
    pose_points: Vec<[f32; 4]>,
    #[serde(default)]
    hand_points: Vec<RawHand>,
}

impl Record {
    fn into_snapshot(self) -> LandmarkSnapshot {
        if let Some(snapshot) = self.snapshot {
            return snapshot;
        }
        self.hand_points.iter().fold(
            LandmarkSnapshot::from_pose_points(&self.pose_points),
            |snap, hand| {
                snap.with_hand(HandLandmarks::from_points(
                    hand.handedness,
                    &hand.points,
                    HAND_POINT_VISIBILITY,
                ))
            },
        )
    }
}

fn parse_record(line: &str) -> Result<(Duration, LandmarkSnapshot)> {
    let record: Record = serde_json::from_str(line)?;
    let t = Duration::try_from_secs_f64(record.t)
        .with_context(|| format!("invalid timestamp {}", record.t))?;
    Ok((t, record.into_snapshot()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emote_stream=warn,replay=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    let emotes_path = cli.emotes.unwrap_or(config.app.emotes_path);

    let defs = load_definitions(&emotes_path)?;
    let mut detector = GestureDetector::new(defs, config.thresholds, &config.detection)?;
    detector.set_debug(cli.debug);

    let file = File::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?;
    info!("replaying {}", cli.input.display());

    let mut stats = SessionStats::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (t, snapshot) = parse_record(&line)
            .with_context(|| format!("{}:{}", cli.input.display(), i + 1))?;

        let out = detector.process(&snapshot, t);
        stats.record(&out, t);
        if let Some(ev) = &out.trigger {
            println!(
                "{:>9.3}s  {:<16} {}",
                t.as_secs_f64(),
                ev.gesture_name,
                ev.action.video_path.display()
            );
        }
    }

    println!("{}", stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emote_stream::gesture::{GestureKind, PredicateThresholds};
    use emote_stream::landmark::{sample, HandLandmark, PoseLandmark};

    #[test]
    fn test_parse_record() {
        let (t, snap) = parse_record(
            r#"{"t": 1.5, "snapshot": {"pose": {"nose": {"x": 0.5, "y": 0.3, "visibility": 0.9}}}}"#,
        )
        .unwrap();
        assert_eq!(t, Duration::from_millis(1500));
        let nose = snap.pose(PoseLandmark::Nose).unwrap();
        assert_eq!(nose.x, 0.5);
        assert_eq!(nose.z, 0.0);
    }

    #[test]
    fn test_parse_record_without_snapshot() {
        let (_, snap) = parse_record(r#"{"t": 0.0}"#).unwrap();
        assert!(snap.is_empty());
    }

    #[test]
    fn test_parse_raw_points() {
        let mut pose = vec![[0.0f32; 4]; PoseLandmark::COUNT];
        pose[PoseLandmark::LeftWrist as usize] = [0.2, 0.1, -0.3, 0.8];
        let mut hand = vec![[0.0f32; 3]; HandLandmark::COUNT];
        hand[HandLandmark::MiddleTip as usize] = [0.4, 0.2, 0.0];
        let line = serde_json::json!({
            "t": 0.5,
            "pose_points": pose,
            "hand_points": [{"handedness": "right", "points": hand}],
        })
        .to_string();

        let (t, snap) = parse_record(&line).unwrap();
        assert_eq!(t, Duration::from_millis(500));
        assert_eq!(snap.pose.len(), PoseLandmark::COUNT);
        let lw = snap.pose(PoseLandmark::LeftWrist).unwrap();
        assert_eq!((lw.x, lw.z, lw.visibility), (0.2, -0.3, 0.8));

        assert_eq!(snap.hands.len(), 1);
        assert_eq!(snap.hands[0].handedness, Some(Handedness::Right));
        let tip = snap.hands[0].get(HandLandmark::MiddleTip).unwrap();
        assert_eq!(tip.x, 0.4);
        assert_eq!(tip.visibility, HAND_POINT_VISIBILITY);
    }

    #[test]
    fn test_raw_points_extra_entries_ignored() {
        let pose = vec![[0.5f32, 0.5, 0.0, 1.0]; PoseLandmark::COUNT + 4];
        let line = serde_json::json!({"t": 0.0, "pose_points": pose}).to_string();
        let (_, snap) = parse_record(&line).unwrap();
        assert_eq!(snap.pose.len(), PoseLandmark::COUNT);
        assert!(snap.hands.is_empty());
    }

    #[test]
    fn test_raw_points_classify_like_named_snapshot() {
        // 名前付きの合成姿勢を生配列に直しても同じ判定になる
        let named = sample::for_kind(GestureKind::HandsUp);
        let mut pose = vec![[0.0f32; 4]; PoseLandmark::COUNT];
        for (id, lm) in &named.pose {
            pose[*id as usize] = [lm.x, lm.y, lm.z, lm.visibility];
        }
        let line = serde_json::json!({"t": 0.0, "pose_points": pose}).to_string();
        let (_, raw) = parse_record(&line).unwrap();

        let thresholds = PredicateThresholds::default();
        let named_hit = emote_stream::gesture::evaluate(GestureKind::HandsUp, &named, &thresholds).unwrap();
        let raw_hit = emote_stream::gesture::evaluate(GestureKind::HandsUp, &raw, &thresholds).unwrap();
        assert!(named_hit);
        assert_eq!(raw_hit, named_hit);
    }

    #[test]
    fn test_parse_record_rejects_negative_time() {
        assert!(parse_record(r#"{"t": -1.0, "snapshot": {}}"#).is_err());
    }
}
