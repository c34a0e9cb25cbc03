use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::SmolStr;

use super::{TimeFunction, segment_progress};
use crate::effect::EffectParam;
use crate::view::NodeState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

fn next_animation_id() -> AnimationId {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    AnimationId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    /// Easing used on the segment that ends at this keyframe.
    pub timing: TimeFunction,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            timing: TimeFunction::Linear,
        }
    }

    pub const fn timing(mut self, timing: TimeFunction) -> Self {
        self.timing = timing;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationStatus {
    Running,
    Finished,
}

type Setter = Box<dyn FnMut(&mut NodeState, f32)>;
type Completion = Box<dyn FnOnce(&mut NodeState)>;

pub struct Animation {
    id: AnimationId,
    channel: Option<SmolStr>,
    keyframes: Vec<Keyframe>,
    elapsed: f32,
    started: bool,
    looping: bool,
    cancelled: bool,
    setter: Setter,
    on_complete: Option<Completion>,
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("keyframes", &self.keyframes.len())
            .field("elapsed", &self.elapsed)
            .field("looping", &self.looping)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl Animation {
    pub fn on_node<F>(keyframes: impl IntoIterator<Item = Keyframe>, setter: F) -> Self
    where
        F: FnMut(&mut NodeState, f32) + 'static,
    {
        let mut keyframes: Vec<Keyframe> = keyframes.into_iter().collect();
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            id: next_animation_id(),
            channel: None,
            keyframes,
            elapsed: 0.0,
            started: false,
            looping: false,
            cancelled: false,
            setter: Box::new(setter),
            on_complete: None,
        }
    }

    /// Animates a shared effect parameter such as a weight or amplitude.
    pub fn on_param(keyframes: impl IntoIterator<Item = Keyframe>, param: EffectParam) -> Self {
        Self::on_node(keyframes, move |_, value| param.set(value))
    }

    pub fn channel(mut self, channel: impl Into<SmolStr>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Runs once, after the final value has been applied. Never runs for
    /// looping or cancelled animations.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut NodeState) + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn value_at(&self, time: f32) -> Option<f32> {
        let first = self.keyframes.first()?;
        if time <= first.time {
            return Some(first.value);
        }
        let next = self.keyframes.partition_point(|k| k.time <= time);
        let Some(b) = self.keyframes.get(next) else {
            return self.keyframes.last().map(|k| k.value);
        };
        let a = self.keyframes[next - 1];
        let t = b.timing.sample(segment_progress(time, a.time, b.time));
        Some(a.value + (b.value - a.value) * t)
    }

    pub fn update(&mut self, dt: f32, node: &mut NodeState) -> AnimationStatus {
        if self.cancelled {
            return AnimationStatus::Finished;
        }
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return AnimationStatus::Finished;
        };
        let (first_value, last) = (first.value, *last);

        if !self.started {
            self.started = true;
            (self.setter)(node, first_value);
        }

        self.elapsed += dt.max(0.0);
        if self.elapsed >= last.time {
            if self.looping && last.time > 0.0 {
                self.elapsed %= last.time;
            } else {
                (self.setter)(node, last.value);
                if let Some(callback) = self.on_complete.take() {
                    callback(node);
                }
                return AnimationStatus::Finished;
            }
        }

        if let Some(value) = self.value_at(self.elapsed) {
            (self.setter)(node, value);
        }
        AnimationStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4
    }

    fn recorder() -> (Rc<RefCell<Vec<f32>>>, impl FnMut(&mut NodeState, f32) + 'static) {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        (values, move |_: &mut NodeState, value: f32| sink.borrow_mut().push(value))
    }

    #[test]
    fn first_update_applies_initial_keyframe() {
        let (values, setter) = recorder();
        let mut animation = Animation::on_node(
            [Keyframe::new(0.0, 4.0), Keyframe::new(1.0, 8.0)],
            setter,
        );
        let mut node = NodeState::default();
        animation.update(0.0, &mut node);
        assert_eq!(values.borrow().first().copied(), Some(4.0));
    }

    #[test]
    fn interpolates_inside_bracketing_segment() {
        let (values, setter) = recorder();
        let mut animation = Animation::on_node(
            [
                Keyframe::new(2.0, 0.0),
                Keyframe::new(0.0, 0.0),
                Keyframe::new(1.0, 10.0),
            ],
            setter,
        );
        let mut node = NodeState::default();
        animation.update(0.5, &mut node);
        assert!(approx_eq(*values.borrow().last().unwrap(), 5.0));
        animation.update(1.0, &mut node);
        assert!(approx_eq(*values.borrow().last().unwrap(), 5.0));
    }

    #[test]
    fn segment_easing_comes_from_end_keyframe() {
        let animation = Animation::on_node(
            [
                Keyframe::new(0.0, 0.0),
                Keyframe::new(1.0, 1.0).timing(TimeFunction::EaseIn),
            ],
            |_, _| {},
        );
        assert!(approx_eq(animation.value_at(0.5).unwrap(), 0.25));
    }

    #[test]
    fn time_before_first_keyframe_holds_first_value() {
        let animation = Animation::on_node(
            [Keyframe::new(0.5, 3.0), Keyframe::new(1.0, 5.0)],
            |_, _| {},
        );
        assert_eq!(animation.value_at(0.2), Some(3.0));
        assert_eq!(animation.value_at(-1.0), Some(3.0));
    }

    #[test]
    fn completion_fires_exactly_once_with_final_value() {
        let (values, setter) = recorder();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let mut animation = Animation::on_node(
            [Keyframe::new(0.0, 0.0), Keyframe::new(0.3, 1.0)],
            setter,
        )
        .on_complete(move |_| counter.set(counter.get() + 1));
        let mut node = NodeState::default();

        assert_eq!(animation.update(0.2, &mut node), AnimationStatus::Running);
        assert_eq!(animation.update(0.2, &mut node), AnimationStatus::Finished);
        assert_eq!(animation.update(0.2, &mut node), AnimationStatus::Finished);
        assert_eq!(fired.get(), 1);
        assert_eq!(values.borrow().last().copied(), Some(1.0));
    }

    #[test]
    fn looping_wraps_without_completing() {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let mut animation = Animation::on_node(
            [Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)],
            |_, _| {},
        )
        .looping(true)
        .on_complete(move |_| flag.set(true));
        let mut node = NodeState::default();
        assert_eq!(animation.update(1.25, &mut node), AnimationStatus::Running);
        assert!(approx_eq(animation.elapsed(), 0.25));
        assert!(!fired.get());
    }

    #[test]
    fn cancelled_animation_finishes_without_callback() {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let mut animation = Animation::on_node([Keyframe::new(1.0, 1.0)], |_, _| {})
            .on_complete(move |_| flag.set(true));
        animation.cancel();
        let mut node = NodeState::default();
        assert_eq!(animation.update(0.1, &mut node), AnimationStatus::Finished);
        assert!(!fired.get());
    }

    #[test]
    fn drives_effect_parameter() {
        let weight = EffectParam::new(1.0);
        let mut animation = Animation::on_param(
            [Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.0)],
            weight.clone(),
        );
        let mut node = NodeState::default();
        animation.update(0.5, &mut node);
        assert!(approx_eq(weight.get(), 0.5));
    }

    #[test]
    fn empty_keyframes_finish_immediately() {
        let mut animation = Animation::on_node(Vec::new(), |_, _| {});
        let mut node = NodeState::default();
        assert_eq!(animation.update(0.1, &mut node), AnimationStatus::Finished);
    }
}
