use std::collections::VecDeque;

use super::kind::GestureKind;

/// 直近 N フレームの生候補を保持し、単発のちらつきを抑えるフィルタ
///
/// 今フレームの候補が窓内に `min_occurrences` 回以上現れていれば安定候補とみなす。
pub struct StabilityFilter {
    window: VecDeque<Option<GestureKind>>,
    capacity: usize,
    min_occurrences: usize,
}

impl StabilityFilter {
    /// `capacity` と `min_occurrences` は 1 以上に丸める
    pub fn new(capacity: usize, min_occurrences: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_occurrences: min_occurrences.max(1),
        }
    }

    /// 生候補を積み、安定候補を返す
    pub fn push(&mut self, raw: Option<GestureKind>) -> Option<GestureKind> {
        self.window.push_back(raw);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let kind = raw?;
        let count = self.window.iter().filter(|k| **k == Some(kind)).count();
        (count >= self.min_occurrences).then_some(kind)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAVE: GestureKind = GestureKind::HandsUp;
    const OTHER: GestureKind = GestureKind::Violin;

    #[test]
    fn test_single_occurrence_passes_by_default() {
        let mut f = StabilityFilter::new(2, 1);
        assert_eq!(f.push(Some(WAVE)), Some(WAVE));
    }

    #[test]
    fn test_none_is_never_stable() {
        let mut f = StabilityFilter::new(2, 1);
        f.push(Some(WAVE));
        assert_eq!(f.push(None), None);
    }

    #[test]
    fn test_isolated_blip_suppressed() {
        let mut f = StabilityFilter::new(3, 2);
        assert_eq!(f.push(None), None);
        assert_eq!(f.push(Some(WAVE)), None);
        assert_eq!(f.push(None), None);
        assert_eq!(f.push(None), None);
    }

    #[test]
    fn test_repeat_becomes_stable() {
        let mut f = StabilityFilter::new(3, 2);
        assert_eq!(f.push(Some(WAVE)), None);
        assert_eq!(f.push(Some(WAVE)), Some(WAVE));
        // 1 フレーム欠けても窓内に 2 回あれば安定のまま
        assert_eq!(f.push(Some(OTHER)), None);
        assert_eq!(f.push(Some(WAVE)), Some(WAVE));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut f = StabilityFilter::new(2, 2);
        f.push(Some(WAVE));
        f.push(None);
        assert_eq!(f.len(), 2);
        // 最初の WAVE は追い出される
        assert_eq!(f.push(Some(WAVE)), None);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut f = StabilityFilter::new(2, 2);
        f.push(Some(WAVE));
        f.clear();
        assert!(f.is_empty());
        assert_eq!(f.push(Some(WAVE)), None);
    }

    #[test]
    fn test_zero_arguments_clamped() {
        let mut f = StabilityFilter::new(0, 0);
        assert_eq!(f.capacity(), 1);
        assert_eq!(f.push(Some(WAVE)), Some(WAVE));
        assert_eq!(f.len(), 1);
    }
}
