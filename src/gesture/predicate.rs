//! ジェスチャー述語
//!
//! 各述語はスナップショットを読むだけの純関数。必要な点が欠けている、
//! または可視度が閾値未満なら `false` を返す。座標が非有限値のときだけ
//! [`PredicateError`] になり、呼び出し側 (検出器) で「不一致」として扱われる。

use thiserror::Error;

use crate::landmark::{HandLandmark, HandLandmarks, Landmark, LandmarkSnapshot, PoseLandmark};

use super::kind::GestureKind;
use super::thresholds::{
    HandsOnHeadThresholds, HandsUpThresholds, MiddleFingerThresholds, PeaceOutThresholds,
    PredicateThresholds, ShotInHeadThresholds, ViolinThresholds,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    #[error("landmark {0} has a non-finite coordinate")]
    NonFinite(String),
}

/// `kind` の述語をスナップショットに適用する
pub fn evaluate(
    kind: GestureKind,
    snapshot: &LandmarkSnapshot,
    thresholds: &PredicateThresholds,
) -> Result<bool, PredicateError> {
    let view = View {
        snapshot,
        min_visibility: thresholds.min_visibility,
    };
    match kind {
        GestureKind::HandsUp => hands_up(&view, &thresholds.hands_up),
        GestureKind::HandsOnHead => hands_on_head(&view, &thresholds.hands_on_head),
        GestureKind::Violin => violin(&view, &thresholds.violin),
        GestureKind::PeaceOut => peace_out(&view, &thresholds.peace_out),
        GestureKind::MiddleFinger => middle_finger(&view, &thresholds.middle_finger),
        GestureKind::ShotInHead => shot_in_head(&view, &thresholds.shot_in_head),
    }
}

/// 可視度フィルタ付きの読み取りビュー
struct View<'a> {
    snapshot: &'a LandmarkSnapshot,
    min_visibility: f32,
}

impl View<'_> {
    fn pose(&self, id: PoseLandmark) -> Result<Option<Landmark>, PredicateError> {
        checked(self.snapshot.pose(id), self.min_visibility, || id.as_str().to_string())
    }

    fn pose_all<const N: usize>(
        &self,
        ids: [PoseLandmark; N],
    ) -> Result<Option<[Landmark; N]>, PredicateError> {
        let mut out = [Landmark::default(); N];
        for (slot, id) in out.iter_mut().zip(ids) {
            match self.pose(id)? {
                Some(lm) => *slot = lm,
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    fn hand_all<const N: usize>(
        &self,
        hand: &HandLandmarks,
        ids: [HandLandmark; N],
    ) -> Result<Option<[Landmark; N]>, PredicateError> {
        let mut out = [Landmark::default(); N];
        for (slot, id) in out.iter_mut().zip(ids) {
            match checked(hand.get(id), self.min_visibility, || format!("hand.{:?}", id))? {
                Some(lm) => *slot = lm,
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }
}

fn checked(
    landmark: Option<&Landmark>,
    min_visibility: f32,
    name: impl FnOnce() -> String,
) -> Result<Option<Landmark>, PredicateError> {
    match landmark {
        Some(lm) if lm.is_visible(min_visibility) => {
            if lm.is_finite() {
                Ok(Some(*lm))
            } else {
                Err(PredicateError::NonFinite(name()))
            }
        }
        _ => Ok(None),
    }
}

fn hands_up(v: &View, t: &HandsUpThresholds) -> Result<bool, PredicateError> {
    use PoseLandmark::*;
    let Some([lw, rw, nose, ls, rs]) =
        v.pose_all([LeftWrist, RightWrist, Nose, LeftShoulder, RightShoulder])?
    else {
        return Ok(false);
    };

    let above_nose = lw.y < nose.y - t.nose_margin && rw.y < nose.y - t.nose_margin;
    let above_shoulders = lw.y < ls.y && rw.y < rs.y;
    let separated = (lw.x - rw.x).abs() > t.min_wrist_separation;
    Ok(above_nose && above_shoulders && separated)
}

fn hands_on_head(v: &View, t: &HandsOnHeadThresholds) -> Result<bool, PredicateError> {
    use PoseLandmark::*;
    let Some([lw, rw, le, re, nose]) =
        v.pose_all([LeftWrist, RightWrist, LeftEar, RightEar, Nose])?
    else {
        return Ok(false);
    };

    let center = Landmark::new(
        (le.x + re.x + nose.x) / 3.0,
        (le.y + re.y + nose.y) / 3.0,
        1.0,
    );
    Ok(lw.distance(&center) < t.max_head_distance && rw.distance(&center) < t.max_head_distance)
}

fn violin(v: &View, t: &ViolinThresholds) -> Result<bool, PredicateError> {
    use PoseLandmark::*;
    let Some([lw, rw, ls, rs, _nose]) =
        v.pose_all([LeftWrist, RightWrist, LeftShoulder, RightShoulder, Nose])?
    else {
        return Ok(false);
    };

    // 右手を上げて左手を横へ、またはその鏡像
    let right_bow = rw.y < lw.y - t.raise_margin && lw.x < ls.x - t.side_margin;
    let left_bow = lw.y < rw.y - t.raise_margin && rw.x > rs.x + t.side_margin;
    Ok(right_bow || left_bow)
}

fn peace_out(v: &View, t: &PeaceOutThresholds) -> Result<bool, PredicateError> {
    use HandLandmark::*;
    for hand in &v.snapshot.hands {
        let Some([it, mt, rt, pt, ip, mp]) =
            v.hand_all(hand, [IndexTip, MiddleTip, RingTip, PinkyTip, IndexPip, MiddlePip])?
        else {
            continue;
        };

        let index_extended = it.y < ip.y - t.extension_margin;
        let middle_extended = mt.y < mp.y - t.extension_margin;
        let index_higher = it.y < rt.y && it.y < pt.y;
        let middle_higher = mt.y < rt.y && mt.y < pt.y;
        let separated = (it.x - mt.x).abs() > t.min_finger_separation;

        if (index_extended || index_higher) && (middle_extended || middle_higher) && separated {
            return Ok(true);
        }
    }

    // 手が取れないときは両手を上げて開いた形で代用
    let Some([lw, rw, nose]) = v.pose_all([
        PoseLandmark::LeftWrist,
        PoseLandmark::RightWrist,
        PoseLandmark::Nose,
    ])?
    else {
        return Ok(false);
    };
    Ok(lw.y < nose.y && rw.y < nose.y && (lw.x - rw.x).abs() > t.fallback_wrist_separation)
}

fn middle_finger(v: &View, t: &MiddleFingerThresholds) -> Result<bool, PredicateError> {
    use HandLandmark::*;
    for hand in &v.snapshot.hands {
        let Some([mt, it, rt, pt, tt]) =
            v.hand_all(hand, [MiddleTip, IndexTip, RingTip, PinkyTip, ThumbTip])?
        else {
            continue;
        };

        if [it, rt, pt, tt].iter().all(|o| mt.y < o.y - t.tip_margin) {
            return Ok(true);
        }
    }

    // フォールバック: 片手だけ顔の前に上げ、もう片方は下ろしている
    use PoseLandmark::*;
    let Some([lw, rw, nose, ls, rs]) =
        v.pose_all([LeftWrist, RightWrist, Nose, LeftShoulder, RightShoulder])?
    else {
        return Ok(false);
    };
    let raised = |w: &Landmark| {
        (w.x - nose.x).abs() < t.center_tolerance && w.y < nose.y - t.raise_margin
    };
    Ok((raised(&lw) && rw.y > rs.y) || (raised(&rw) && lw.y > ls.y))
}

fn shot_in_head(v: &View, t: &ShotInHeadThresholds) -> Result<bool, PredicateError> {
    use PoseLandmark::*;
    // 肩も高さ比較に使うので可視判定の対象に含める
    let Some([lw, rw, nose, ls, rs]) =
        v.pose_all([LeftWrist, RightWrist, Nose, LeftShoulder, RightShoulder])?
    else {
        return Ok(false);
    };

    let mut head = vec![nose];
    for id in [LeftEar, RightEar] {
        if let Some(p) = v.pose(id)? {
            head.push(p);
        }
    }
    let near_head = |w: &Landmark| {
        head.iter()
            .map(|h| w.distance(h))
            .fold(f32::INFINITY, f32::min)
            < t.max_head_distance
    };

    let left = near_head(&lw) && lw.y < ls.y + t.shoulder_slack;
    let right = near_head(&rw) && rw.y < rs.y + t.shoulder_slack;
    Ok(left || right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::sample;

    fn eval(kind: GestureKind, snap: &LandmarkSnapshot) -> bool {
        evaluate(kind, snap, &PredicateThresholds::default()).unwrap()
    }

    fn matching(snap: &LandmarkSnapshot) -> Vec<GestureKind> {
        GestureKind::ALL
            .iter()
            .copied()
            .filter(|k| eval(*k, snap))
            .collect()
    }

    #[test]
    fn test_each_sample_matches_its_kind() {
        for kind in GestureKind::ALL {
            assert!(eval(kind, &sample::for_kind(kind)), "{} sample did not match", kind);
        }
    }

    #[test]
    fn test_neutral_matches_nothing() {
        assert!(matching(&sample::neutral()).is_empty());
    }

    #[test]
    fn test_empty_snapshot_matches_nothing() {
        assert!(matching(&LandmarkSnapshot::empty()).is_empty());
    }

    #[test]
    fn test_violin_and_shot_samples_are_exclusive() {
        assert_eq!(matching(&sample::for_kind(GestureKind::Violin)), vec![GestureKind::Violin]);
        assert_eq!(
            matching(&sample::for_kind(GestureKind::ShotInHead)),
            vec![GestureKind::ShotInHead]
        );
    }

    #[test]
    fn test_hands_up_requires_separation() {
        let snap = sample::neutral()
            .with_pose(PoseLandmark::LeftWrist, Landmark::new(0.45, 0.15, 1.0))
            .with_pose(PoseLandmark::RightWrist, Landmark::new(0.55, 0.15, 1.0));
        assert!(!eval(GestureKind::HandsUp, &snap));
    }

    #[test]
    fn test_missing_landmark_is_false() {
        let mut snap = sample::for_kind(GestureKind::HandsUp);
        snap.pose.remove(&PoseLandmark::Nose);
        assert!(!eval(GestureKind::HandsUp, &snap));
    }

    #[test]
    fn test_low_visibility_treated_as_missing() {
        let snap = sample::for_kind(GestureKind::HandsOnHead)
            .with_pose(PoseLandmark::LeftEar, Landmark::new(0.46, 0.29, 0.1));
        assert!(!eval(GestureKind::HandsOnHead, &snap));

        let mut relaxed = PredicateThresholds::default();
        relaxed.min_visibility = 0.05;
        assert!(evaluate(GestureKind::HandsOnHead, &snap, &relaxed).unwrap());
    }

    #[test]
    fn test_shot_in_head_gates_shoulders() {
        let snap = sample::for_kind(GestureKind::ShotInHead)
            .with_pose(PoseLandmark::RightShoulder, Landmark::new(0.60, 0.45, 0.1));
        assert!(!eval(GestureKind::ShotInHead, &snap));

        let mut relaxed = PredicateThresholds::default();
        relaxed.min_visibility = 0.05;
        assert!(evaluate(GestureKind::ShotInHead, &snap, &relaxed).unwrap());
    }

    #[test]
    fn test_non_finite_coordinate_is_error() {
        let snap = sample::for_kind(GestureKind::HandsUp)
            .with_pose(PoseLandmark::Nose, Landmark::new(f32::NAN, 0.3, 1.0));
        let result = evaluate(GestureKind::HandsUp, &snap, &PredicateThresholds::default());
        assert_eq!(result, Err(PredicateError::NonFinite("nose".to_string())));
    }

    #[test]
    fn test_non_finite_invisible_point_is_ignored() {
        let snap = sample::for_kind(GestureKind::HandsUp)
            .with_pose(PoseLandmark::Nose, Landmark::new(f32::NAN, 0.3, 0.0));
        assert_eq!(
            evaluate(GestureKind::HandsUp, &snap, &PredicateThresholds::default()),
            Ok(false)
        );
    }

    #[test]
    fn test_violin_mirror() {
        let snap = sample::neutral()
            .with_pose(PoseLandmark::LeftWrist, Landmark::new(0.34, 0.38, 1.0))
            .with_pose(PoseLandmark::RightWrist, Landmark::new(0.70, 0.50, 1.0));
        assert!(eval(GestureKind::Violin, &snap));
    }

    #[test]
    fn test_violin_requires_nose() {
        let mut snap = sample::for_kind(GestureKind::Violin);
        snap.pose.remove(&PoseLandmark::Nose);
        assert!(!eval(GestureKind::Violin, &snap));
    }

    #[test]
    fn test_peace_out_pose_fallback() {
        // 手なし、両手首が鼻より上で離れている
        let snap = sample::neutral()
            .with_pose(PoseLandmark::LeftWrist, Landmark::new(0.40, 0.25, 1.0))
            .with_pose(PoseLandmark::RightWrist, Landmark::new(0.60, 0.25, 1.0));
        assert!(eval(GestureKind::PeaceOut, &snap));
    }

    #[test]
    fn test_peace_out_fingers_together_is_false() {
        let mut snap = sample::for_kind(GestureKind::PeaceOut);
        let hand = &mut snap.hands[0];
        hand.landmarks
            .insert(HandLandmark::MiddleTip, Landmark::new(0.605, 0.39, 1.0));
        assert!(!eval(GestureKind::PeaceOut, &snap));
    }

    #[test]
    fn test_incomplete_hand_is_skipped() {
        // 指先が欠けた手が先頭にあっても 2 番目の手で判定できる
        let mut snap = sample::for_kind(GestureKind::MiddleFinger);
        let full = snap.hands[0].clone();
        let mut partial = full.clone();
        partial.landmarks.remove(&HandLandmark::ThumbTip);
        snap.hands = vec![partial, full];
        assert!(eval(GestureKind::MiddleFinger, &snap));
    }

    #[test]
    fn test_middle_finger_not_highest() {
        let mut snap = sample::for_kind(GestureKind::MiddleFinger);
        snap.hands[0]
            .landmarks
            .insert(HandLandmark::IndexTip, Landmark::new(0.61, 0.37, 1.0));
        assert!(!eval(GestureKind::MiddleFinger, &snap));
    }

    #[test]
    fn test_middle_finger_pose_fallback() {
        let snap = sample::neutral()
            .with_pose(PoseLandmark::RightWrist, Landmark::new(0.52, 0.20, 1.0));
        assert!(eval(GestureKind::MiddleFinger, &snap));
    }

    #[test]
    fn test_shot_in_head_uses_visible_head_points_only() {
        // 右耳が見えなければ鼻と左耳からの距離で判定
        let snap = sample::for_kind(GestureKind::ShotInHead)
            .with_pose(PoseLandmark::RightEar, Landmark::new(0.54, 0.29, 0.0));
        // 手首 (0.57, 0.33) から鼻 (0.50, 0.30) まで約 0.076
        assert!(eval(GestureKind::ShotInHead, &snap));

        let far = sample::neutral()
            .with_pose(PoseLandmark::RightWrist, Landmark::new(0.66, 0.33, 1.0))
            .with_pose(PoseLandmark::RightEar, Landmark::new(0.54, 0.29, 0.0));
        assert!(!eval(GestureKind::ShotInHead, &far));
    }

    #[test]
    fn test_shot_in_head_wrist_below_shoulder_is_false() {
        let mut t = PredicateThresholds::default();
        t.shot_in_head.max_head_distance = 1.0;
        let snap = sample::neutral();
        // 手首 y=0.75 は肩 0.45 + 0.1 より下
        assert!(!evaluate(GestureKind::ShotInHead, &snap, &t).unwrap());
    }
}
