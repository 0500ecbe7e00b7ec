use std::collections::VecDeque;

pub const MIN_HISTORY_SECONDS: f32 = 1.0;
pub const MAX_HISTORY_SECONDS: f32 = 15.0;
pub const DEFAULT_HISTORY_SECONDS: f32 = 5.0;

/// Frame durations over a sliding window of wall-clock time.
#[derive(Debug, Clone)]
pub struct FrameTimeHistory {
    /// (end of frame in seconds since the first sample, frame duration in ms)
    samples: VecDeque<(f64, f32)>,
    elapsed_seconds: f64,
    window_seconds: f32,
}

impl Default for FrameTimeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SECONDS)
    }
}

impl FrameTimeHistory {
    pub fn new(window_seconds: f32) -> Self {
        Self {
            samples: VecDeque::new(),
            elapsed_seconds: 0.0,
            window_seconds: window_seconds.clamp(MIN_HISTORY_SECONDS, MAX_HISTORY_SECONDS),
        }
    }

    pub fn push(&mut self, frame_millis: f32) {
        self.elapsed_seconds += f64::from(frame_millis) / 1000.0;
        self.samples.push_back((self.elapsed_seconds, frame_millis));
        self.prune();
    }

    pub fn window_seconds(&self) -> f32 {
        self.window_seconds
    }

    pub fn set_window_seconds(&mut self, seconds: f32) {
        self.window_seconds = seconds.clamp(MIN_HISTORY_SECONDS, MAX_HISTORY_SECONDS);
        self.prune();
    }

    /// Durations in ms, oldest first.
    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|&(_, millis)| millis).collect()
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().map(|&(_, millis)| millis)
    }

    pub fn average(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f32 = self.samples.iter().map(|&(_, millis)| millis).sum();
        Some(total / self.samples.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn prune(&mut self) {
        let cutoff = self.elapsed_seconds - f64::from(self.window_seconds);
        while self.samples.front().is_some_and(|&(time, _)| time < cutoff) {
            self.samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_samples_older_than_window() {
        let mut history = FrameTimeHistory::new(1.0);
        for _ in 0..24 {
            history.push(125.0);
        }

        // 3 s of frames, only the last second survives
        assert_eq!(history.len(), 9);
        assert_eq!(history.latest(), Some(125.0));
    }

    #[test]
    fn test_shrinking_window_prunes_immediately() {
        let mut history = FrameTimeHistory::new(10.0);
        for _ in 0..50 {
            history.push(125.0);
        }
        assert_eq!(history.len(), 50);

        history.set_window_seconds(2.0);
        assert_eq!(history.len(), 17);
    }

    #[test]
    fn test_window_is_clamped() {
        assert_eq!(FrameTimeHistory::new(0.0).window_seconds(), MIN_HISTORY_SECONDS);
        assert_eq!(FrameTimeHistory::new(60.0).window_seconds(), MAX_HISTORY_SECONDS);
    }

    #[test]
    fn test_average() {
        let mut history = FrameTimeHistory::default();
        assert_eq!(history.average(), None);
        history.push(2.0);
        history.push(4.0);
        assert_eq!(history.values(), vec![2.0, 4.0]);
        assert_eq!(history.average(), Some(3.0));
    }
}
