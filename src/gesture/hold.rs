use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;

use super::kind::GestureKind;
use super::stability::StabilityFilter;

/// ホールド進捗。表示用で状態機械には影響しない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub kind: GestureKind,
    pub elapsed: Duration,
    /// 0.0〜1.0
    pub progress: f32,
    pub ready: bool,
}

impl Status {
    fn started(kind: GestureKind) -> Self {
        Self {
            kind,
            elapsed: Duration::ZERO,
            progress: 0.0,
            ready: false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}... {:.1}s ({:.0}%)",
            self.kind,
            self.elapsed.as_secs_f32(),
            self.progress * 100.0
        )
    }
}

/// 1 フレーム分の状態遷移の結果
#[derive(Debug, Clone, PartialEq)]
pub enum HoldOutcome {
    /// 候補なし
    Idle,
    /// ホールド中
    Progress(Status),
    /// ホールドは満了したが同じジェスチャーがクールダウン中
    Blocked(GestureKind),
    /// 発火
    Fire(GestureKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    kind: GestureKind,
    since: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fired {
    kind: GestureKind,
    at: Duration,
}

/// ホールド/クールダウン状態機械
///
/// 時刻はセッション開始からの経過時間を呼び出し側が毎フレーム渡す。
/// 候補が無ければ即座にリセットし、候補が変われば経過時間を 0 からやり直す。
pub struct DetectionState {
    recent: StabilityFilter,
    candidate: Option<Candidate>,
    last_fired: Option<Fired>,
    hold: Duration,
    cooldown: Duration,
}

impl DetectionState {
    pub fn new(hold: Duration, cooldown: Duration, window_size: usize, min_occurrences: usize) -> Self {
        Self {
            recent: StabilityFilter::new(window_size, min_occurrences),
            candidate: None,
            last_fired: None,
            hold,
            cooldown,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.hold(),
            config.cooldown(),
            config.window_size,
            config.min_occurrences,
        )
    }

    /// 生候補を安定化フィルタに通してから状態を進める
    pub fn advance(&mut self, raw: Option<GestureKind>, now: Duration) -> HoldOutcome {
        let stable = self.recent.push(raw);
        self.step(stable, now)
    }

    fn step(&mut self, stable: Option<GestureKind>, now: Duration) -> HoldOutcome {
        let Some(kind) = stable else {
            self.candidate = None;
            return HoldOutcome::Idle;
        };

        let since = match self.candidate {
            Some(c) if c.kind == kind => c.since,
            _ => {
                self.candidate = Some(Candidate { kind, since: now });
                return HoldOutcome::Progress(Status::started(kind));
            }
        };

        let elapsed = now.saturating_sub(since);
        if elapsed < self.hold {
            return HoldOutcome::Progress(Status {
                kind,
                elapsed,
                progress: hold_progress(elapsed, self.hold),
                ready: false,
            });
        }

        if !self.gate_open(kind, now) {
            return HoldOutcome::Blocked(kind);
        }

        self.last_fired = Some(Fired { kind, at: now });
        self.candidate = None;
        self.recent.clear();
        HoldOutcome::Fire(kind)
    }

    /// 別のジェスチャーならクールダウン中でも即発火できる
    fn gate_open(&self, kind: GestureKind, now: Duration) -> bool {
        match self.last_fired {
            None => true,
            Some(f) => f.kind != kind || now.saturating_sub(f.at) > self.cooldown,
        }
    }

    /// 候補と安定化窓を破棄する (定義の再読み込み時)。発火履歴は残す
    pub fn reset_candidate(&mut self) {
        self.candidate = None;
        self.recent.clear();
    }

    /// タイミングと窓を差し替える。窓の大きさが変わり得るので候補も破棄する
    pub fn reconfigure(&mut self, config: &DetectionConfig) {
        self.hold = config.hold();
        self.cooldown = config.cooldown();
        self.recent = StabilityFilter::new(config.window_size, config.min_occurrences);
        self.candidate = None;
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn active_candidate(&self) -> Option<GestureKind> {
        self.candidate.map(|c| c.kind)
    }

    pub fn candidate_start_time(&self) -> Option<Duration> {
        self.candidate.map(|c| c.since)
    }

    pub fn last_fired_kind(&self) -> Option<GestureKind> {
        self.last_fired.map(|f| f.kind)
    }

    pub fn last_fired_time(&self) -> Option<Duration> {
        self.last_fired.map(|f| f.at)
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }
}

/// 判定は `Duration` で行い、こちらは表示用の比率だけを返す
fn hold_progress(elapsed: Duration, hold: Duration) -> f32 {
    if hold.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / hold.as_secs_f64()).min(1.0) as f32
}
