use crate::Perception;

/// Side-effect sinks the tree drives. Amounts are in an agent defined range,
/// typically `[-1, 1]`, and nothing is returned to the tree.
pub trait Actuator {
    fn move_by(&mut self, amount: f32);

    fn turn(&mut self, amount: f32);

    fn fire(&mut self, amount: f32);
}

/// An agent the behavior library can build trees for: it senses a target and
/// can be actuated.
pub trait Tank: Actuator + Perception {}

impl<T: Actuator + Perception> Tank for T {}
