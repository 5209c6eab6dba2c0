use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::landmark::LandmarkSnapshot;

use super::definition::{validate_definitions, DefinitionError, GestureDefinition, TriggerEvent};
use super::hold::{DetectionState, HoldOutcome, Status};
use super::kind::GestureKind;
use super::predicate;
use super::thresholds::PredicateThresholds;

/// 1 フレーム処理の出力。発火フレームでは `status` は空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub status: Option<Status>,
    pub trigger: Option<TriggerEvent>,
}

/// フレーム単位のジェスチャー検出器
///
/// 定義の並び順で述語を評価し (最初に一致したものが生候補)、安定化フィルタと
/// ホールド/クールダウン状態機械を通して高々 1 つのトリガーを返す。
/// 状態は呼び出し側が排他的に所有し、フレームは 1 つずつ順に渡すこと。
pub struct GestureDetector {
    definitions: Vec<GestureDefinition>,
    thresholds: PredicateThresholds,
    state: DetectionState,
    debug: bool,
    last_now: Option<Duration>,
}

impl GestureDetector {
    pub fn new(
        definitions: Vec<GestureDefinition>,
        thresholds: PredicateThresholds,
        detection: &DetectionConfig,
    ) -> Result<Self, DefinitionError> {
        validate_definitions(&definitions)?;
        Ok(Self {
            definitions,
            thresholds,
            state: DetectionState::from_config(detection),
            debug: false,
            last_now: None,
        })
    }

    /// 1 フレーム処理する。`now` はセッション開始からの経過時間
    pub fn process(&mut self, snapshot: &LandmarkSnapshot, now: Duration) -> FrameOutput {
        let now = self.monotonic(now);
        let raw = self.classify(snapshot);

        match self.state.advance(raw, now) {
            HoldOutcome::Idle => FrameOutput::default(),
            HoldOutcome::Progress(status) => {
                if status.elapsed.is_zero() {
                    self.annotate(format_args!("candidate {} started at {:.3}s", status.kind, now.as_secs_f32()));
                }
                FrameOutput {
                    status: Some(status),
                    trigger: None,
                }
            }
            HoldOutcome::Blocked(kind) => {
                self.annotate(format_args!("{} held but still cooling down", kind));
                FrameOutput::default()
            }
            HoldOutcome::Fire(kind) => {
                let trigger = self.trigger_for(kind);
                if let Some(ev) = &trigger {
                    info!("gesture {} fired at {:.3}s", ev.gesture_name, now.as_secs_f32());
                }
                FrameOutput {
                    status: None,
                    trigger,
                }
            }
        }
    }

    /// 生候補: 定義順で最初に述語が真になった種類
    ///
    /// 述語のエラーはその述語の不一致として扱い、次の定義の評価を続ける。
    pub fn classify(&self, snapshot: &LandmarkSnapshot) -> Option<GestureKind> {
        for def in &self.definitions {
            match predicate::evaluate(def.kind, snapshot, &self.thresholds) {
                Ok(true) => return Some(def.kind),
                Ok(false) => {}
                Err(e) => self.annotate(format_args!("predicate for {} failed: {}", def.name, e)),
            }
        }
        None
    }

    /// 定義セットを丸ごと差し替える
    ///
    /// 検証に失敗した場合は定義も状態も変更しない。成功時は進行中の候補と
    /// 安定化窓を破棄する (発火履歴とクールダウンは維持)。
    pub fn reload(&mut self, definitions: Vec<GestureDefinition>) -> Result<(), DefinitionError> {
        validate_definitions(&definitions)?;
        self.definitions = definitions;
        self.state.reset_candidate();
        info!("reloaded {} gesture definitions", self.definitions.len());
        Ok(())
    }

    /// しきい値とタイミングを差し替える
    ///
    /// 検証に失敗した場合は何も変更しない。成功時の状態の扱いは `reload` と同じ。
    pub fn reconfigure(
        &mut self,
        thresholds: PredicateThresholds,
        detection: &DetectionConfig,
    ) -> anyhow::Result<()> {
        detection.validate()?;
        self.thresholds = thresholds;
        self.state.reconfigure(detection);
        info!(
            "detection reconfigured: hold={}s cooldown={}s window={} min_occurrences={}",
            detection.hold_time, detection.cooldown_time, detection.window_size, detection.min_occurrences
        );
        Ok(())
    }

    /// 内部イベントの注釈を info レベルに上げる。検出結果には影響しない
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        info!("debug annotations {}", if enabled { "on" } else { "off" });
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn definitions(&self) -> &[GestureDefinition] {
        &self.definitions
    }

    pub fn thresholds(&self) -> &PredicateThresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    fn trigger_for(&self, kind: GestureKind) -> Option<TriggerEvent> {
        let def = self.definitions.iter().find(|d| d.kind == kind);
        if def.is_none() {
            warn!("no definition bound to {}", kind);
        }
        def.map(TriggerEvent::from_definition)
    }

    /// 巻き戻った時刻は直前の時刻に丸める
    fn monotonic(&mut self, now: Duration) -> Duration {
        let now = match self.last_now {
            Some(prev) if now < prev => {
                warn!(
                    "timestamp went backwards ({:.3}s < {:.3}s), clamping",
                    now.as_secs_f32(),
                    prev.as_secs_f32()
                );
                prev
            }
            _ => now,
        };
        self.last_now = Some(now);
        now
    }

    fn annotate(&self, args: fmt::Arguments<'_>) {
        if self.debug {
            info!("{}", args);
        } else {
            debug!("{}", args);
        }
    }
}
