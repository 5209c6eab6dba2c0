use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::kind::GestureKind;

/// トリガー時に再生するクリップ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRef {
    pub video_path: PathBuf,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActionRef {
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self {
            video_path: path.into(),
            audio_path: None,
            description: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.video_path.as_os_str().is_empty()
    }
}

/// ジェスチャー定義。並び順がそのまま判定の優先順位になる
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub name: String,
    #[serde(rename = "gesture")]
    pub kind: GestureKind,
    #[serde(flatten)]
    pub action: ActionRef,
}

impl GestureDefinition {
    pub fn new(name: impl Into<String>, kind: GestureKind, action: ActionRef) -> Self {
        Self {
            name: name.into(),
            kind,
            action,
        }
    }
}

/// 発火イベント。1 フレームに高々 1 つ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub gesture_name: String,
    pub kind: GestureKind,
    pub action: ActionRef,
}

impl TriggerEvent {
    pub fn from_definition(def: &GestureDefinition) -> Self {
        Self {
            gesture_name: def.name.clone(),
            kind: def.kind,
            action: def.action.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("gesture definition #{0} has an empty name")]
    EmptyName(usize),
    #[error("duplicate gesture name: {0}")]
    DuplicateName(String),
    #[error("gesture {0} has no video_path")]
    EmptyAction(String),
}

/// 名前の一意性とアクションの有無を検証する
///
/// 同じ種類が複数回割り当てられている場合、後ろの定義は決して発火しないので警告だけ出す。
pub fn validate_definitions(defs: &[GestureDefinition]) -> Result<(), DefinitionError> {
    let mut names = HashSet::new();
    let mut kinds = HashSet::new();

    for (i, def) in defs.iter().enumerate() {
        if def.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName(i));
        }
        if !names.insert(def.name.as_str()) {
            return Err(DefinitionError::DuplicateName(def.name.clone()));
        }
        if def.action.is_empty() {
            return Err(DefinitionError::EmptyAction(def.name.clone()));
        }
        if !kinds.insert(def.kind) {
            warn!(
                "gesture {} reuses kind {} and is shadowed by an earlier definition",
                def.name, def.kind
            );
        }
    }
    Ok(())
}
