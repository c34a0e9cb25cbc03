use std::f32::consts::{PI, TAU};

use glam::Vec2;

use super::{Effect, EffectCurve, EffectParam, EffectTime, TransformDelta};
use crate::transition::TimeFunction;

pub const CLICK_BOUNCE_CHANNEL: &str = "click_bounce";
pub const CLICK_BOUNCE_DURATION: f32 = 0.22;
const CLICK_BOUNCE_STRENGTH: f32 = 0.12;

#[derive(Clone, Debug)]
pub struct Breathe {
    pub amplitude: EffectParam,
    pub period: f32,
}

impl EffectCurve for Breathe {
    fn name(&self) -> &'static str {
        "breathe"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        let period = self.period.max(1e-6);
        let phase = TAU * time.elapsed / period;
        TransformDelta::scaled(1.0 + self.amplitude.get() * phase.sin())
    }
}

/// Quick squash toward `1 - strength` and back to rest.
#[derive(Clone, Debug)]
pub struct ClickBounce {
    pub strength: f32,
}

impl EffectCurve for ClickBounce {
    fn name(&self) -> &'static str {
        "click_bounce"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        let progress = time.progress.unwrap_or(1.0);
        if progress >= 1.0 {
            return TransformDelta::IDENTITY;
        }
        TransformDelta::scaled(1.0 - self.strength * (PI * progress).sin())
    }
}

#[derive(Clone, Debug)]
pub struct Shake {
    pub amplitude: EffectParam,
    pub frequency: f32,
}

impl EffectCurve for Shake {
    fn name(&self) -> &'static str {
        "shake"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        let decay = 1.0 - time.progress.unwrap_or(0.0);
        let x = self.amplitude.get() * (TAU * self.frequency * time.elapsed).sin() * decay;
        TransformDelta::offset(Vec2::new(x, 0.0))
    }
}

#[derive(Clone, Debug)]
pub struct Fade {
    pub from: f32,
    pub to: f32,
    pub timing: TimeFunction,
}

impl EffectCurve for Fade {
    fn name(&self) -> &'static str {
        "fade"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        let t = self.timing.sample(time.progress.unwrap_or(1.0));
        TransformDelta::faded(self.from + (self.to - self.from) * t)
    }
}

#[derive(Clone, Debug)]
pub struct Slide {
    pub from: Vec2,
    pub to: Vec2,
    pub timing: TimeFunction,
}

impl EffectCurve for Slide {
    fn name(&self) -> &'static str {
        "slide"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        let t = self.timing.sample(time.progress.unwrap_or(1.0));
        TransformDelta::offset(self.from.lerp(self.to, t))
    }
}

#[derive(Clone, Debug)]
pub struct Spin {
    pub degrees_per_second: f32,
}

impl EffectCurve for Spin {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn sample(&self, time: EffectTime) -> TransformDelta {
        TransformDelta::rotated((self.degrees_per_second * time.elapsed) % 360.0)
    }
}

#[derive(Clone, Debug)]
pub struct Constant(pub TransformDelta);

impl EffectCurve for Constant {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn sample(&self, _time: EffectTime) -> TransformDelta {
        self.0
    }
}

impl Effect {
    /// Endless sinusoidal scale around 1.0.
    pub fn breathe(amplitude: impl Into<EffectParam>, period: f32) -> Self {
        Self::new(Breathe {
            amplitude: amplitude.into(),
            period,
        })
    }

    pub fn click_bounce() -> Self {
        Self::new(ClickBounce {
            strength: CLICK_BOUNCE_STRENGTH,
        })
        .duration(CLICK_BOUNCE_DURATION)
        .channel(CLICK_BOUNCE_CHANNEL)
    }

    pub fn shake(amplitude: impl Into<EffectParam>, frequency: f32, duration: f32) -> Self {
        Self::new(Shake {
            amplitude: amplitude.into(),
            frequency,
        })
        .duration(duration)
    }

    pub fn fade(from: f32, to: f32, duration: f32) -> Self {
        Self::new(Fade {
            from,
            to,
            timing: TimeFunction::Linear,
        })
        .duration(duration)
    }

    pub fn slide(from: Vec2, to: Vec2, duration: f32, timing: TimeFunction) -> Self {
        Self::new(Slide { from, to, timing }).duration(duration)
    }

    pub fn spin(degrees_per_second: f32) -> Self {
        Self::new(Spin { degrees_per_second })
    }

    pub fn constant(delta: TransformDelta) -> Self {
        Self::new(Constant(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectStatus;

    #[test]
    fn click_bounce_squashes_then_finishes_at_rest() {
        let mut bounce = Effect::click_bounce();
        assert_eq!(bounce.channel_name(), Some(CLICK_BOUNCE_CHANNEL));
        bounce.update(CLICK_BOUNCE_DURATION / 2.0);
        assert!(bounce.delta().scale < 1.0);

        let mut status = EffectStatus::Running;
        for _ in 0..20 {
            status = bounce.update(0.016);
            if status == EffectStatus::Finished {
                break;
            }
        }
        assert_eq!(status, EffectStatus::Finished);
        assert_eq!(bounce.delta().scale, 1.0);
    }

    #[test]
    fn breathe_amplitude_can_be_driven_externally() {
        let amplitude = EffectParam::new(0.0);
        let mut breathe = Effect::breathe(amplitude.clone(), 1.0);
        breathe.update(0.25);
        assert_eq!(breathe.delta().scale, 1.0);

        amplitude.set(0.2);
        breathe.update(0.0);
        assert!((breathe.delta().scale - 1.2).abs() < 1e-4);
    }

    #[test]
    fn fade_reaches_target_alpha() {
        let mut fade = Effect::fade(1.0, 0.0, 0.5);
        assert_eq!(fade.update(0.6), EffectStatus::Finished);
        assert_eq!(fade.delta().alpha, 0.0);
    }

    #[test]
    fn shake_decays_to_no_offset() {
        let mut shake = Effect::shake(4.0, 10.0, 0.3);
        shake.update(0.31);
        assert!(shake.delta().position_offset.x.abs() < 1e-4);
    }
}
