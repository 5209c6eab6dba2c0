use serde::{Deserialize, Serialize};

/// 述語ごとの閾値テーブル
///
/// 座標はすべて正規化画像座標 (0.0〜1.0) 上の値。`config.toml` の `[thresholds]` から読む。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateThresholds {
    /// これ未満の可視度の点は存在しないものとして扱う
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    #[serde(default)]
    pub hands_up: HandsUpThresholds,
    #[serde(default)]
    pub hands_on_head: HandsOnHeadThresholds,
    #[serde(default)]
    pub violin: ViolinThresholds,
    #[serde(default)]
    pub peace_out: PeaceOutThresholds,
    #[serde(default)]
    pub middle_finger: MiddleFingerThresholds,
    #[serde(default)]
    pub shot_in_head: ShotInHeadThresholds,
}

fn default_min_visibility() -> f32 { 0.3 }

impl Default for PredicateThresholds {
    fn default() -> Self {
        Self {
            min_visibility: default_min_visibility(),
            hands_up: HandsUpThresholds::default(),
            hands_on_head: HandsOnHeadThresholds::default(),
            violin: ViolinThresholds::default(),
            peace_out: PeaceOutThresholds::default(),
            middle_finger: MiddleFingerThresholds::default(),
            shot_in_head: ShotInHeadThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandsUpThresholds {
    /// 手首が鼻よりどれだけ上にあるべきか
    #[serde(default = "default_hands_up_nose_margin")]
    pub nose_margin: f32,
    /// 左右の手首の最小横距離
    #[serde(default = "default_hands_up_separation")]
    pub min_wrist_separation: f32,
}

fn default_hands_up_nose_margin() -> f32 { 0.03 }
fn default_hands_up_separation() -> f32 { 0.15 }

impl Default for HandsUpThresholds {
    fn default() -> Self {
        Self {
            nose_margin: default_hands_up_nose_margin(),
            min_wrist_separation: default_hands_up_separation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandsOnHeadThresholds {
    /// 頭部重心 (両耳と鼻の平均) から手首までの最大距離
    #[serde(default = "default_hands_on_head_distance")]
    pub max_head_distance: f32,
}

fn default_hands_on_head_distance() -> f32 { 0.18 }

impl Default for HandsOnHeadThresholds {
    fn default() -> Self {
        Self {
            max_head_distance: default_hands_on_head_distance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolinThresholds {
    /// 上げた手がもう片方よりどれだけ高いか
    #[serde(default = "default_violin_raise")]
    pub raise_margin: f32,
    /// 伸ばした手が肩よりどれだけ外側か
    #[serde(default = "default_violin_side")]
    pub side_margin: f32,
}

fn default_violin_raise() -> f32 { 0.05 }
fn default_violin_side() -> f32 { 0.05 }

impl Default for ViolinThresholds {
    fn default() -> Self {
        Self {
            raise_margin: default_violin_raise(),
            side_margin: default_violin_side(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeaceOutThresholds {
    /// 指先が PIP 関節よりどれだけ上なら「伸びている」か
    #[serde(default = "default_peace_extension")]
    pub extension_margin: f32,
    /// 人差し指と中指の指先の最小横距離
    #[serde(default = "default_peace_finger_separation")]
    pub min_finger_separation: f32,
    /// 手が検出されないときの体フォールバック: 手首の最小横距離
    #[serde(default = "default_peace_fallback_separation")]
    pub fallback_wrist_separation: f32,
}

fn default_peace_extension() -> f32 { 0.01 }
fn default_peace_finger_separation() -> f32 { 0.02 }
fn default_peace_fallback_separation() -> f32 { 0.1 }

impl Default for PeaceOutThresholds {
    fn default() -> Self {
        Self {
            extension_margin: default_peace_extension(),
            min_finger_separation: default_peace_finger_separation(),
            fallback_wrist_separation: default_peace_fallback_separation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddleFingerThresholds {
    /// 中指の先端が他の指先よりどれだけ上にあるべきか
    #[serde(default = "default_middle_tip_margin")]
    pub tip_margin: f32,
    /// 体フォールバック: 手首と鼻の最大横距離
    #[serde(default = "default_middle_center_tolerance")]
    pub center_tolerance: f32,
    /// 体フォールバック: 手首が鼻よりどれだけ上か
    #[serde(default = "default_middle_raise")]
    pub raise_margin: f32,
}

fn default_middle_tip_margin() -> f32 { 0.02 }
fn default_middle_center_tolerance() -> f32 { 0.1 }
fn default_middle_raise() -> f32 { 0.05 }

impl Default for MiddleFingerThresholds {
    fn default() -> Self {
        Self {
            tip_margin: default_middle_tip_margin(),
            center_tolerance: default_middle_center_tolerance(),
            raise_margin: default_middle_raise(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotInHeadThresholds {
    /// 頭部の点 (両耳・鼻) のいずれかと手首の最大距離
    #[serde(default = "default_shot_distance")]
    pub max_head_distance: f32,
    /// 手首の高さの許容 (肩 + slack より上)
    #[serde(default = "default_shot_shoulder_slack")]
    pub shoulder_slack: f32,
}

fn default_shot_distance() -> f32 { 0.12 }
fn default_shot_shoulder_slack() -> f32 { 0.1 }

impl Default for ShotInHeadThresholds {
    fn default() -> Self {
        Self {
            max_head_distance: default_shot_distance(),
            shoulder_slack: default_shot_shoulder_slack(),
        }
    }
}
