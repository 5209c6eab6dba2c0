use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 認識できるジェスチャーの種類
///
/// 述語は [`crate::gesture::predicate::evaluate`] で種類ごとに 1 つずつ定義される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// 両手を頭より上に上げて広げる
    HandsUp,
    /// 両手を頭に当てる
    HandsOnHead,
    /// 片手を上げ、もう片方を横に伸ばす (バイオリンを弾く形)
    Violin,
    /// 人差し指と中指で V サイン
    PeaceOut,
    /// 中指だけを立てる
    MiddleFinger,
    /// 片手をこめかみに当てる
    ShotInHead,
}

impl GestureKind {
    pub const ALL: [GestureKind; 6] = [
        Self::HandsUp,
        Self::HandsOnHead,
        Self::Violin,
        Self::PeaceOut,
        Self::MiddleFinger,
        Self::ShotInHead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HandsUp => "hands_up",
            Self::HandsOnHead => "hands_on_head",
            Self::Violin => "violin",
            Self::PeaceOut => "peace_out",
            Self::MiddleFinger => "middle_finger",
            Self::ShotInHead => "shot_in_head",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown gesture kind: {}", s))
    }
}
