use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::gesture::FrameOutput;

/// セッション統計。経過時間は呼び出し側が渡す
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    frames: u64,
    frames_with_status: u64,
    triggers: BTreeMap<String, u64>,
    elapsed: Duration,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, output: &FrameOutput, now: Duration) {
        self.frames += 1;
        if output.status.is_some() {
            self.frames_with_status += 1;
        }
        if let Some(ev) = &output.trigger {
            *self.triggers.entry(ev.gesture_name.clone()).or_insert(0) += 1;
        }
        self.elapsed = self.elapsed.max(now);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn frames_with_status(&self) -> u64 {
        self.frames_with_status
    }

    pub fn total_triggers(&self) -> u64 {
        self.triggers.values().sum()
    }

    pub fn triggers(&self, name: &str) -> u64 {
        self.triggers.get(name).copied().unwrap_or(0)
    }

    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[stats] {:.0}s frames={} ({:.1} fps) holding={} triggers={}",
            self.elapsed.as_secs_f64(),
            self.frames,
            self.fps(),
            self.frames_with_status,
            self.total_triggers()
        )?;
        for (name, n) in &self.triggers {
            write!(f, " {}={}", name, n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{ActionRef, GestureDefinition, GestureKind, Status, TriggerEvent};

    fn trigger(name: &str) -> FrameOutput {
        let def = GestureDefinition::new(name, GestureKind::HandsUp, ActionRef::video("a.mp4"));
        FrameOutput {
            status: None,
            trigger: Some(TriggerEvent::from_definition(&def)),
        }
    }

    fn holding() -> FrameOutput {
        FrameOutput {
            status: Some(Status {
                kind: GestureKind::HandsUp,
                elapsed: Duration::ZERO,
                progress: 0.0,
                ready: false,
            }),
            trigger: None,
        }
    }

    #[test]
    fn test_empty() {
        let stats = SessionStats::new();
        assert_eq!(stats.frames(), 0);
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.total_triggers(), 0);
    }

    #[test]
    fn test_counts() {
        let mut stats = SessionStats::new();
        stats.record(&FrameOutput::default(), Duration::from_millis(0));
        stats.record(&holding(), Duration::from_millis(500));
        stats.record(&trigger("wave"), Duration::from_millis(1000));
        stats.record(&trigger("wave"), Duration::from_millis(1500));
        stats.record(&trigger("bang"), Duration::from_millis(2000));

        assert_eq!(stats.frames(), 5);
        assert_eq!(stats.frames_with_status(), 1);
        assert_eq!(stats.triggers("wave"), 2);
        assert_eq!(stats.triggers("bang"), 1);
        assert_eq!(stats.triggers("violin"), 0);
        assert_eq!(stats.total_triggers(), 3);
        assert!((stats.fps() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_display_lists_triggers() {
        let mut stats = SessionStats::new();
        stats.record(&trigger("wave"), Duration::from_secs(1));
        let s = stats.to_string();
        assert!(s.contains("frames=1"));
        assert!(s.contains("wave=1"));
    }
}
