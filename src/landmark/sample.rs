//! 合成ランドマーク。ジェスチャーごとの典型的な姿勢を返す
//!
//! pose_sender での動作確認と、述語・検出器のテストで使う。
//! 鏡像表示前提なので人物の左側が画像の左 (x が小さい側) に来る。

use crate::gesture::GestureKind;

use super::keypoint::{HandLandmark, Landmark, PoseLandmark};
use super::snapshot::{HandLandmarks, Handedness, LandmarkSnapshot};

const VISIBLE: f32 = 0.95;

fn lm(x: f32, y: f32) -> Landmark {
    Landmark::new(x, y, VISIBLE)
}

/// 正面を向いて腕を下ろした姿勢。どの述語にも一致しない
pub fn neutral() -> LandmarkSnapshot {
    use PoseLandmark::*;
    LandmarkSnapshot::empty()
        .with_pose(Nose, lm(0.50, 0.30))
        .with_pose(LeftEye, lm(0.48, 0.28))
        .with_pose(RightEye, lm(0.52, 0.28))
        .with_pose(LeftEar, lm(0.46, 0.29))
        .with_pose(RightEar, lm(0.54, 0.29))
        .with_pose(LeftShoulder, lm(0.40, 0.45))
        .with_pose(RightShoulder, lm(0.60, 0.45))
        .with_pose(LeftElbow, lm(0.38, 0.60))
        .with_pose(RightElbow, lm(0.62, 0.60))
        .with_pose(LeftWrist, lm(0.38, 0.75))
        .with_pose(RightWrist, lm(0.62, 0.75))
        .with_pose(LeftHip, lm(0.44, 0.78))
        .with_pose(RightHip, lm(0.56, 0.78))
}

/// `kind` の述語に一致するスナップショット
///
/// 優先順位の低い種類が同時に一致することはある (例: hands_on_head は shot_in_head も満たす)。
pub fn for_kind(kind: GestureKind) -> LandmarkSnapshot {
    use PoseLandmark::*;
    match kind {
        GestureKind::HandsUp => neutral()
            .with_pose(LeftWrist, lm(0.35, 0.15))
            .with_pose(RightWrist, lm(0.65, 0.15)),
        GestureKind::HandsOnHead => neutral()
            .with_pose(LeftWrist, lm(0.44, 0.31))
            .with_pose(RightWrist, lm(0.56, 0.31)),
        GestureKind::Violin => neutral()
            .with_pose(LeftWrist, lm(0.30, 0.50))
            .with_pose(RightWrist, lm(0.66, 0.38)),
        GestureKind::PeaceOut => neutral()
            .with_pose(RightWrist, lm(0.63, 0.58))
            .with_hand(peace_hand()),
        GestureKind::MiddleFinger => neutral()
            .with_pose(RightWrist, lm(0.63, 0.58))
            .with_hand(middle_finger_hand()),
        GestureKind::ShotInHead => neutral().with_pose(RightWrist, lm(0.57, 0.33)),
    }
}

fn peace_hand() -> HandLandmarks {
    use HandLandmark::*;
    HandLandmarks::new(Some(Handedness::Right))
        .with(Wrist, lm(0.63, 0.58))
        .with(ThumbTip, lm(0.58, 0.50))
        .with(IndexPip, lm(0.60, 0.46))
        .with(IndexTip, lm(0.60, 0.40))
        .with(MiddlePip, lm(0.64, 0.46))
        .with(MiddleTip, lm(0.64, 0.39))
        .with(RingPip, lm(0.67, 0.49))
        .with(RingTip, lm(0.67, 0.50))
        .with(PinkyPip, lm(0.69, 0.50))
        .with(PinkyTip, lm(0.69, 0.51))
}

fn middle_finger_hand() -> HandLandmarks {
    use HandLandmark::*;
    HandLandmarks::new(Some(Handedness::Right))
        .with(Wrist, lm(0.63, 0.58))
        .with(ThumbTip, lm(0.57, 0.47))
        .with(IndexPip, lm(0.61, 0.44))
        .with(IndexTip, lm(0.61, 0.47))
        .with(MiddlePip, lm(0.62, 0.44))
        .with(MiddleTip, lm(0.62, 0.36))
        .with(RingPip, lm(0.64, 0.45))
        .with(RingTip, lm(0.64, 0.46))
        .with(PinkyPip, lm(0.66, 0.47))
        .with(PinkyTip, lm(0.66, 0.48))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_has_core_points() {
        let snap = neutral();
        for id in [
            PoseLandmark::Nose,
            PoseLandmark::LeftWrist,
            PoseLandmark::RightWrist,
            PoseLandmark::LeftShoulder,
            PoseLandmark::RightShoulder,
            PoseLandmark::LeftEar,
            PoseLandmark::RightEar,
        ] {
            assert!(snap.pose(id).is_some(), "missing {}", id.as_str());
        }
        assert!(snap.hands.is_empty());
    }

    #[test]
    fn test_hand_samples_carry_one_hand() {
        assert_eq!(for_kind(GestureKind::PeaceOut).hands.len(), 1);
        assert_eq!(for_kind(GestureKind::MiddleFinger).hands.len(), 1);
        assert!(for_kind(GestureKind::HandsUp).hands.is_empty());
    }
}
