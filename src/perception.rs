//! Derived perception values written to the blackboard by the perception service.

use crate::{Blackboard, Symbol};
use once_cell::sync::Lazy;
use tracing::debug;

/// Distance from the agent to the target, never negative.
pub static TARGET_DISTANCE: Lazy<Symbol> = Lazy::new(|| "targetDistance".into());
pub static TARGET_IN_FRONT: Lazy<Symbol> = Lazy::new(|| "targetInFront".into());
pub static TARGET_ON_RIGHT: Lazy<Symbol> = Lazy::new(|| "targetOnRight".into());
/// Lateral component of the unit heading towards the target, in `[0, 1]`.
/// Zero means dead ahead or dead behind.
pub static TARGET_OFF_CENTRE: Lazy<Symbol> = Lazy::new(|| "targetOffCentre".into());

/// A point in the agent's frame of reference: `x` to the right, `y` up and `z`
/// forward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocalPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// The unit vector in the same direction, or the zero vector if this point
    /// is the origin.
    pub fn normalized(&self) -> Self {
        let len = self.magnitude();
        if len == 0. {
            return Self::default();
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

/// Geometry collaborator supplied by the host. The world to local transform
/// happens on the host side.
pub trait Perception {
    /// Where the current target is relative to the agent, if there is one.
    fn target_local_position(&self) -> Option<LocalPoint>;
}

/// Refreshes the perception keys from the agent's view of its target.
///
/// Without a target the keys keep their previous values, so conditions keep
/// acting on the last thing the agent saw.
pub fn update_perception<P: Perception + ?Sized>(agent: &P, blackboard: &mut Blackboard) {
    let Some(local) = agent.target_local_position() else {
        debug!("no target to perceive");
        return;
    };
    let heading = local.normalized();
    blackboard.set(*TARGET_DISTANCE, local.magnitude());
    blackboard.set(*TARGET_IN_FRONT, heading.z > 0.);
    blackboard.set(*TARGET_ON_RIGHT, heading.x > 0.);
    blackboard.set(*TARGET_OFF_CENTRE, heading.x.abs());
}

#[cfg(test)]
mod test {
    use super::*;

    struct Fixed(Option<LocalPoint>);

    impl Perception for Fixed {
        fn target_local_position(&self) -> Option<LocalPoint> {
            self.0
        }
    }

    #[test]
    fn test_target_ahead_right() {
        let mut bb = Blackboard::new();
        update_perception(&Fixed(Some(LocalPoint::new(3., 0., 4.))), &mut bb);
        assert_eq!(bb.get_number(*TARGET_DISTANCE), 5.);
        assert!(bb.get_bool(*TARGET_IN_FRONT));
        assert!(bb.get_bool(*TARGET_ON_RIGHT));
        assert!((bb.get_number(*TARGET_OFF_CENTRE) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_target_behind_left() {
        let mut bb = Blackboard::new();
        update_perception(&Fixed(Some(LocalPoint::new(-1., 0., -1.))), &mut bb);
        assert!(!bb.get_bool(*TARGET_IN_FRONT));
        assert!(!bb.get_bool(*TARGET_ON_RIGHT));
        let off = bb.get_number(*TARGET_OFF_CENTRE);
        assert!((0. ..=1.).contains(&off));
        assert!((off - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_no_target_keeps_values() {
        let mut bb = Blackboard::new();
        bb.set(*TARGET_DISTANCE, 7.);
        update_perception(&Fixed(None), &mut bb);
        assert_eq!(bb.get_number(*TARGET_DISTANCE), 7.);
        assert!(!bb.contains(*TARGET_ON_RIGHT));
    }

    #[test]
    fn test_target_at_origin() {
        let mut bb = Blackboard::new();
        update_perception(&Fixed(Some(LocalPoint::default())), &mut bb);
        assert_eq!(bb.get_number(*TARGET_DISTANCE), 0.);
        assert_eq!(bb.get_number(*TARGET_OFF_CENTRE), 0.);
        assert!(!bb.get_bool(*TARGET_IN_FRONT));
    }
}
