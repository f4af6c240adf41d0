use crate::{
    BehaviorNode, Blackboard, BlackboardValue, BuildError, Clock, Context, Status, Symbol, TimerId,
};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// The tree driver, and the only node the host talks to.
///
/// The root owns the tree, the blackboard and the clock. The agent is lent to
/// every call, so the root never outlives or aliases the host's state.
/// Every operation takes `&mut self`, which rules out a tick overlapping
/// another tick, a start or a stop.
pub struct Root<A> {
    child: Box<dyn BehaviorNode<A>>,
    blackboard: Blackboard,
    /// Values the blackboard is reset to on `stop`.
    seeds: Vec<(Symbol, BlackboardValue)>,
    clock: Clock,
    active: bool,
}

impl<A> Root<A> {
    /// Wraps a tree after checking its structure. A tree that fails validation
    /// is never started.
    pub fn new(child: Box<dyn BehaviorNode<A>>) -> Result<Self, BuildError> {
        Self::with_blackboard(child, Blackboard::new())
    }

    /// Like [`Root::new`], with initial blackboard values. The values are
    /// restored every time the root is stopped, so a restarted tree sees them
    /// again.
    pub fn with_blackboard(
        child: Box<dyn BehaviorNode<A>>,
        blackboard: Blackboard,
    ) -> Result<Self, BuildError> {
        if let Some(policy) = child.selector_only_policy() {
            return Err(BuildError::PreemptionOutsideSelector {
                node: child.name().to_owned(),
                policy,
            });
        }
        child.validate()?;
        let seeds = blackboard
            .keys()
            .filter_map(|key| Some((key, blackboard.get(key)?.clone())))
            .collect();
        Ok(Self {
            child,
            blackboard,
            seeds,
            clock: Clock::new(),
            active: false,
        })
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Status of the top level node.
    pub fn status(&self) -> Status {
        self.child.status()
    }

    pub fn start(&mut self, agent: &mut A) {
        if self.active {
            return;
        }
        debug!(root = self.child.name(), "start");
        self.active = true;
        let mut ctx = Context::new(&mut self.blackboard, &mut self.clock, agent);
        self.child.start(&mut ctx);
    }

    /// Evaluates the tree once. A tree that finished on the previous tick is
    /// restarted first, which is how instantaneous actions are repeated frame
    /// after frame.
    pub fn tick(&mut self, agent: &mut A) {
        if !self.active {
            trace!("tick on an inactive root ignored");
            return;
        }
        let mut ctx = Context::new(&mut self.blackboard, &mut self.clock, agent);
        if self.child.status().is_terminated() {
            self.child.release(&mut ctx);
        }
        let res = self.child.tick(&mut ctx);
        trace!(?res, now = ?ctx.clock.now(), "tick");
    }

    /// Moves the clock forward by `dt`, firing every service timer that falls due
    /// on the way in time order. Values written by the services are visible to the
    /// next tick.
    pub fn advance(&mut self, agent: &mut A, dt: Duration) {
        let until = self.clock.now() + dt;
        while let Some(timer) = self.clock.pop_due(until) {
            self.dispatch(timer, agent);
        }
        self.clock.set_now(until);
    }

    /// Advances the clock by `dt` and ticks once, the usual per-frame call.
    pub fn update(&mut self, agent: &mut A, dt: Duration) {
        self.advance(agent, dt);
        self.tick(agent);
    }

    /// Stops the tree and cancels every timer and observer it holds. The
    /// blackboard is reset to the values the root was created with.
    pub fn stop(&mut self, agent: &mut A) {
        if !self.active {
            return;
        }
        let mut ctx = Context::new(&mut self.blackboard, &mut self.clock, agent);
        self.child.release(&mut ctx);
        self.active = false;
        if self.clock.num_timers() != 0 || self.blackboard.num_observers() != 0 {
            warn!(
                timers = self.clock.num_timers(),
                observers = self.blackboard.num_observers(),
                "tree left timers or observers behind"
            );
            self.clock.clear_timers();
        }
        self.blackboard.clear();
        for (key, value) in &self.seeds {
            self.blackboard.set(*key, value.clone());
        }
        debug!(root = self.child.name(), "stopped");
    }

    fn dispatch(&mut self, timer: TimerId, agent: &mut A) {
        let mut ctx = Context::new(&mut self.blackboard, &mut self.clock, agent);
        if !self.child.fire_timer(timer, &mut ctx) {
            warn!(?timer, "timer has no active owner, cancelling");
            self.clock.cancel(timer);
        }
    }
}
