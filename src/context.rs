use crate::{Blackboard, Clock};
use std::time::Duration;

/// Everything a node can touch while it is started, ticked or stopped.
///
/// The agent is borrowed explicitly for the duration of one call from the host,
/// so callbacks never hold on to it between ticks.
pub struct Context<'a, A> {
    pub blackboard: &'a mut Blackboard,
    pub clock: &'a mut Clock,
    pub agent: &'a mut A,
}

impl<'a, A> Context<'a, A> {
    pub fn new(blackboard: &'a mut Blackboard, clock: &'a mut Clock, agent: &'a mut A) -> Self {
        Self {
            blackboard,
            clock,
            agent,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }
}
