//! Keyframed node animation.
//!
//! A channel drives one property of one node with `(time, value)` keyframes.
//! Sampling interpolates linearly between the two keys bracketing the time
//! (normalized lerp for rotations), holds the first/last value outside the
//! keyed range, and loops at the animation's `end_time`.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

/// Which node property a channel writes, with its keyframes (sorted by time).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ChannelTarget {
    Translation(Vec<Keyframe<Vector3<f32>>>),
    Rotation(Vec<Keyframe<UnitQuaternion<f32>>>),
    Scale(Vec<Keyframe<Vector3<f32>>>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Channel {
    pub node: usize,
    pub target: ChannelTarget,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub channels: Vec<Channel>,
    /// Loop length in seconds; non-positive disables looping.
    pub end_time: f32,
}

/// A sampled channel value, ready to be written into a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(UnitQuaternion<f32>),
    Scale(Vector3<f32>),
}

impl Animation {
    /// Wrap an absolute time into the loop.
    pub fn local_time(&self, time: f32) -> f32 {
        if self.end_time > 0.0 {
            time.rem_euclid(self.end_time)
        } else {
            time
        }
    }
}

impl Channel {
    /// Sample at a loop-local time. `None` for a channel with no keys.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        match &self.target {
            ChannelTarget::Translation(keys) => {
                sample_keys(keys, time, |a, b, t| a.lerp(b, t)).map(Sample::Translation)
            }
            ChannelTarget::Rotation(keys) => {
                sample_keys(keys, time, |a, b, t| a.nlerp(b, t)).map(Sample::Rotation)
            }
            ChannelTarget::Scale(keys) => {
                sample_keys(keys, time, |a, b, t| a.lerp(b, t)).map(Sample::Scale)
            }
        }
    }

    /// Key times are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        fn sorted<T>(keys: &[Keyframe<T>]) -> bool {
            keys.windows(2).all(|w| w[0].time <= w[1].time)
        }
        match &self.target {
            ChannelTarget::Translation(k) | ChannelTarget::Scale(k) => sorted(k),
            ChannelTarget::Rotation(k) => sorted(k),
        }
    }
}

fn sample_keys<T: Copy>(
    keys: &[Keyframe<T>],
    time: f32,
    lerp: impl Fn(&T, &T, f32) -> T,
) -> Option<T> {
    let first = keys.first()?;
    let last = keys[keys.len() - 1];
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }
    // First key strictly after `time`; its predecessor brackets from below.
    let hi = keys.partition_point(|k| k.time <= time);
    let (a, b) = (&keys[hi - 1], &keys[hi]);
    let span = b.time - a.time;
    let t = if span > 0.0 { (time - a.time) / span } else { 0.0 };
    Some(lerp(&a.value, &b.value, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn translation_channel() -> Channel {
        Channel {
            node: 0,
            target: ChannelTarget::Translation(vec![
                Keyframe { time: 0.0, value: Vector3::new(0.0, 0.0, 0.0) },
                Keyframe { time: 1.0, value: Vector3::new(10.0, 0.0, 0.0) },
                Keyframe { time: 3.0, value: Vector3::new(10.0, 20.0, 0.0) },
            ]),
        }
    }

    #[test]
    fn test_linear_between_keys() {
        let ch = translation_channel();
        match ch.sample(0.25) {
            Some(Sample::Translation(v)) => assert_relative_eq!(v.x, 2.5, epsilon = 1e-6),
            other => panic!("unexpected sample {other:?}"),
        }
        match ch.sample(2.0) {
            Some(Sample::Translation(v)) => {
                assert_relative_eq!(v, Vector3::new(10.0, 10.0, 0.0), epsilon = 1e-5)
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let ch = translation_channel();
        assert_eq!(ch.sample(-1.0), Some(Sample::Translation(Vector3::zeros())));
        assert_eq!(
            ch.sample(5.0),
            Some(Sample::Translation(Vector3::new(10.0, 20.0, 0.0)))
        );
    }

    #[test]
    fn test_loop_wraps() {
        let anim = Animation {
            name: "spin".into(),
            channels: vec![translation_channel()],
            end_time: 3.0,
        };
        assert_relative_eq!(anim.local_time(4.5), 1.5, epsilon = 1e-6);
        assert_relative_eq!(anim.local_time(-0.5), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_halfway() {
        let ch = Channel {
            node: 0,
            target: ChannelTarget::Rotation(vec![
                Keyframe { time: 0.0, value: UnitQuaternion::identity() },
                Keyframe {
                    time: 1.0,
                    value: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0),
                },
            ]),
        };
        match ch.sample(0.5) {
            Some(Sample::Rotation(q)) => assert_relative_eq!(q.angle(), 0.5, epsilon = 1e-3),
            other => panic!("unexpected sample {other:?}"),
        }
    }

    #[test]
    fn test_empty_channel() {
        let ch = Channel {
            node: 0,
            target: ChannelTarget::Scale(vec![]),
        };
        assert!(ch.sample(0.0).is_none());
    }
}
