use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::SmolStr;

mod delta;
mod kinds;

pub use delta::*;
pub use kinds::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

fn next_effect_id() -> EffectId {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    EffectId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A float shared between an effect and whoever drives it.
///
/// Effects read their tunable parameters (weight, amplitude, ...) through
/// these cells every frame, so a keyframe animation or game code holding a
/// clone can change them while the effect is running.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectParam(Rc<Cell<f32>>);

impl EffectParam {
    pub fn new(value: f32) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    pub fn get(&self) -> f32 {
        self.0.get()
    }

    pub fn set(&self, value: f32) {
        self.0.set(value);
    }
}

impl From<f32> for EffectParam {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectTime {
    pub elapsed: f32,
    /// `elapsed / duration` for finite effects, `None` for infinite ones.
    pub progress: Option<f32>,
}

pub trait EffectCurve {
    fn name(&self) -> &'static str;

    fn sample(&self, time: EffectTime) -> TransformDelta;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectStatus {
    Running,
    Finished,
}

pub struct Effect {
    id: EffectId,
    channel: Option<SmolStr>,
    priority: i32,
    blend: BlendMode,
    weight: EffectParam,
    elapsed: f32,
    duration: f32,
    looping: bool,
    ping_pong: bool,
    reversing: bool,
    cancelled: bool,
    current: TransformDelta,
    curve: Box<dyn EffectCurve>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("curve", &self.curve.name())
            .field("channel", &self.channel)
            .field("priority", &self.priority)
            .field("blend", &self.blend)
            .field("elapsed", &self.elapsed)
            .field("duration", &self.duration)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl Effect {
    pub fn new(curve: impl EffectCurve + 'static) -> Self {
        Self {
            id: next_effect_id(),
            channel: None,
            priority: 0,
            blend: BlendMode::Add,
            weight: EffectParam::new(1.0),
            elapsed: 0.0,
            duration: -1.0,
            looping: false,
            ping_pong: false,
            reversing: false,
            cancelled: false,
            current: TransformDelta::IDENTITY,
            curve: Box::new(curve),
        }
    }

    pub fn channel(mut self, channel: impl Into<SmolStr>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn weight(self, weight: f32) -> Self {
        self.weight.set(weight.clamp(0.0, 1.0));
        self
    }

    /// Drive the weight from a shared parameter instead of a fixed value.
    pub fn weight_param(mut self, weight: EffectParam) -> Self {
        self.weight = weight;
        self
    }

    /// Seconds; zero or negative means the effect runs until cancelled.
    pub fn duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn ping_pong(mut self, ping_pong: bool) -> Self {
        self.ping_pong = ping_pong;
        self
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn priority_value(&self) -> i32 {
        self.priority
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    pub fn weight_value(&self) -> f32 {
        self.weight.get().clamp(0.0, 1.0)
    }

    pub fn shared_weight(&self) -> EffectParam {
        self.weight.clone()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_infinite(&self) -> bool {
        self.duration <= 0.0
    }

    pub fn is_reversing(&self) -> bool {
        self.reversing
    }

    pub fn curve_name(&self) -> &'static str {
        self.curve.name()
    }

    /// Takes effect on the next [`Effect::update`].
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Delta computed by the last update.
    pub fn delta(&self) -> TransformDelta {
        self.current
    }

    fn time(&self) -> EffectTime {
        EffectTime {
            elapsed: self.elapsed,
            progress: (!self.is_infinite())
                .then(|| (self.elapsed / self.duration).clamp(0.0, 1.0)),
        }
    }

    pub fn update(&mut self, dt: f32) -> EffectStatus {
        if self.cancelled {
            self.current = TransformDelta::IDENTITY;
            return EffectStatus::Finished;
        }
        let finished = self.advance(dt.max(0.0));
        self.current = self.curve.sample(self.time());
        if finished {
            EffectStatus::Finished
        } else {
            EffectStatus::Running
        }
    }

    fn advance(&mut self, dt: f32) -> bool {
        if self.is_infinite() {
            self.elapsed += dt;
            return false;
        }
        let duration = self.duration;

        if !self.ping_pong {
            self.elapsed += dt;
            if self.elapsed >= duration {
                if self.looping {
                    self.elapsed %= duration;
                } else {
                    self.elapsed = duration;
                    return true;
                }
            }
            return false;
        }

        if !self.reversing {
            self.elapsed += dt;
            if self.elapsed >= duration {
                let overshoot = self.elapsed - duration;
                self.reversing = true;
                self.elapsed = duration - overshoot;
                if self.elapsed <= 0.0 {
                    // Already past the start again in the same step.
                    if !self.looping {
                        self.elapsed = 0.0;
                        return true;
                    }
                    self.reversing = false;
                    self.elapsed = (-self.elapsed).min(duration);
                }
            }
            false
        } else {
            self.elapsed -= dt;
            if self.elapsed <= 0.0 {
                if self.looping {
                    self.reversing = false;
                    self.elapsed = (-self.elapsed).min(duration);
                } else {
                    self.elapsed = 0.0;
                    return true;
                }
            }
            false
        }
    }
}

/// Folds the deltas of `effects` in ascending priority order.
///
/// The sort is stable: effects with equal priority combine in insertion
/// order. A higher-priority `Override` discards everything folded before it.
pub fn combine_effects<'a>(effects: impl IntoIterator<Item = &'a Effect>) -> TransformDelta {
    let mut ordered: Vec<&Effect> = effects.into_iter().filter(|e| !e.cancelled).collect();
    ordered.sort_by_key(|effect| effect.priority);
    ordered.iter().fold(TransformDelta::IDENTITY, |total, effect| {
        total.combine(effect.current, effect.blend, effect.weight_value())
    })
}
