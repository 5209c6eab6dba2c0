use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::keypoint::{HandLandmark, Landmark, PoseLandmark};

/// 左右どちらの手か (推定器の判定結果。述語では使わない)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

/// 1 つの手のランドマーク集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    #[serde(default)]
    pub handedness: Option<Handedness>,
    #[serde(default)]
    pub landmarks: BTreeMap<HandLandmark, Landmark>,
}

impl HandLandmarks {
    pub fn new(handedness: Option<Handedness>) -> Self {
        Self {
            handedness,
            landmarks: BTreeMap::new(),
        }
    }

    pub fn with(mut self, id: HandLandmark, landmark: Landmark) -> Self {
        self.landmarks.insert(id, landmark);
        self
    }

    pub fn get(&self, id: HandLandmark) -> Option<&Landmark> {
        self.landmarks.get(&id)
    }

    /// 推定器の 21 点配列から構築。手の点には可視度が無いので `visibility` を一律に与える
    pub fn from_points(handedness: Option<Handedness>, points: &[[f32; 3]], visibility: f32) -> Self {
        let landmarks = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                HandLandmark::from_index(i).map(|id| {
                    let mut lm = Landmark::new(p[0], p[1], visibility);
                    lm.z = p[2];
                    (id, lm)
                })
            })
            .collect();
        Self {
            handedness,
            landmarks,
        }
    }
}

/// 1 フレーム分のランドマーク
///
/// 検出されなかった点はマップに存在しない。空のスナップショットは
/// 「このフレームでは何も推定できなかった」ことを表す。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSnapshot {
    #[serde(default)]
    pub pose: BTreeMap<PoseLandmark, Landmark>,
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
}

impl LandmarkSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pose.is_empty() && self.hands.iter().all(|h| h.landmarks.is_empty())
    }

    pub fn with_pose(mut self, id: PoseLandmark, landmark: Landmark) -> Self {
        self.pose.insert(id, landmark);
        self
    }

    pub fn with_hand(mut self, hand: HandLandmarks) -> Self {
        self.hands.push(hand);
        self
    }

    pub fn pose(&self, id: PoseLandmark) -> Option<&Landmark> {
        self.pose.get(&id)
    }

    /// 推定器の `(x, y, z, visibility)` 配列から体のランドマークを構築
    pub fn from_pose_points(points: &[[f32; 4]]) -> Self {
        let pose = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                PoseLandmark::from_index(i).map(|id| {
                    let mut lm = Landmark::new(p[0], p[1], p[3]);
                    lm.z = p[2];
                    (id, lm)
                })
            })
            .collect();
        Self {
            pose,
            hands: Vec::new(),
        }
    }
}
