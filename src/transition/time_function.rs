#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeFunction {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Overshoots slightly past 1.0 before settling.
    EaseOutBack,
}

impl TimeFunction {
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) * 0.5)
                }
            }
            Self::EaseOutBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
        }
    }
}

/// Progress of a segment spanning `[start, end]` at `time`, clamped to `[0, 1]`.
///
/// Degenerate spans are treated as lasting `1e-6` seconds so a zero-length
/// segment jumps straight to its end value instead of producing NaN.
pub fn segment_progress(time: f32, start: f32, end: f32) -> f32 {
    let span = (end - start).max(1e-6);
    ((time - start) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_curve_pins_endpoints() {
        for timing in [
            TimeFunction::Linear,
            TimeFunction::EaseIn,
            TimeFunction::EaseOut,
            TimeFunction::EaseInOut,
            TimeFunction::EaseOutBack,
        ] {
            assert!(timing.sample(0.0).abs() < 1e-5, "{timing:?} at 0");
            assert!((timing.sample(1.0) - 1.0).abs() < 1e-5, "{timing:?} at 1");
        }
    }

    #[test]
    fn ease_out_back_overshoots() {
        assert!(TimeFunction::EaseOutBack.sample(0.7) > 1.0);
    }

    #[test]
    fn zero_length_segment_is_complete() {
        assert_eq!(segment_progress(2.5, 2.0, 2.0), 1.0);
        assert!(segment_progress(2.0, 2.0, 2.0).is_finite());
        assert_eq!(segment_progress(1.0, 2.0, 2.0), 0.0);
    }
}
