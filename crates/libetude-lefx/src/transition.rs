//! Smooth weight transitions. Plain `f32`/`u64` arithmetic — no crate
//! pulls its weight for four easing curves and a clamp.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCurve {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl TransitionCurve {
    /// Applies the curve to a linear progress value in `[0, 1]`.
    fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => t * (2.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// An in-flight weight transition for one extension. `start_time_ms` and
/// `now_ms` (passed to `current_weight`) are both caller-supplied
/// monotonic timestamps — this type never reads the clock itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub prev_weight: f32,
    pub target_weight: f32,
    pub duration_ms: u64,
    pub start_time_ms: u64,
    pub curve: TransitionCurve,
}

impl Transition {
    pub fn new(prev_weight: f32, target_weight: f32, duration_ms: u64, start_time_ms: u64, curve: TransitionCurve) -> Self {
        Self { prev_weight, target_weight, duration_ms, start_time_ms, curve }
    }

    /// The interpolated weight at `now_ms`. Clamped to `[0, 1]` progress
    /// before the curve is applied, so a `now_ms` before `start_time_ms`
    /// or past `start_time_ms + duration_ms` still returns a sane value.
    pub fn current_weight(&self, now_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return self.target_weight;
        }
        let elapsed = now_ms.saturating_sub(self.start_time_ms) as f32;
        let progress = (elapsed / self.duration_ms as f32).clamp(0.0, 1.0);
        let eased = self.curve.apply(progress);
        self.prev_weight + (self.target_weight - self.prev_weight) * eased
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        now_ms >= self.start_time_ms + self.duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_transition_reaches_target_at_end() {
        let t = Transition::new(0.0, 1.0, 1000, 0, TransitionCurve::Linear);
        assert_eq!(t.current_weight(0), 0.0);
        assert_eq!(t.current_weight(500), 0.5);
        assert_eq!(t.current_weight(1000), 1.0);
        assert!(t.is_complete(1000));
    }

    #[test]
    fn progress_clamps_past_the_end() {
        let t = Transition::new(0.0, 1.0, 1000, 0, TransitionCurve::Linear);
        assert_eq!(t.current_weight(5000), 1.0);
    }

    #[test]
    fn ease_in_starts_slower_than_linear() {
        let linear = Transition::new(0.0, 1.0, 1000, 0, TransitionCurve::Linear);
        let ease_in = Transition::new(0.0, 1.0, 1000, 0, TransitionCurve::EaseIn);
        assert!(ease_in.current_weight(250) < linear.current_weight(250));
    }

    #[test]
    fn multiple_transitions_are_independent() {
        let a = Transition::new(0.0, 1.0, 1000, 0, TransitionCurve::Linear);
        let b = Transition::new(1.0, 0.0, 2000, 0, TransitionCurve::Linear);
        assert_eq!(a.current_weight(500), 0.5);
        assert_eq!(b.current_weight(500), 0.75);
    }
}
