//! # reactive-behavior-tree
//!
//! A behavior tree engine for agents that sense the world through periodic
//! perception and act on it through side-effecting commands, such as the AI of a
//! tank in a small arena game.
//!
//! ## Overview
//!
//! The tree is evaluated by a [`Root`], which the host ticks once per frame.
//! Nodes share state through a [`Blackboard`], a key/value store whose writes
//! notify observers.
//! A [`Service`] refreshes blackboard values on its own timer, independently of
//! how often the tree is ticked, and a [`BlackboardCondition`] watches a key so
//! that a change in perception can interrupt the branch that is currently
//! running.
//!
//! ## How it looks like
//!
//! First, you describe the agent the tree drives.
//! The agent is never captured by the tree; it is lent to every call instead.
//!
//! ```rust
//! struct Tank {
//!     turn_rate: f32,
//! }
//! ```
//!
//! Then you define a behavior tree. This one turns right while the target is on
//! the right and left otherwise.
//!
//! ```rust
//! # use reactive_behavior_tree::*;
//! # struct Tank { turn_rate: f32 }
//! let tree = Selector::new(vec![
//!     BlackboardCondition::new(
//!         "targetOnRight",
//!         Operator::Equal,
//!         true,
//!         RestartPolicy::ImmediateRestart,
//!         Action::new("turn right", |tank: &mut Tank| tank.turn_rate = 1.).boxed(),
//!     )
//!     .boxed(),
//!     Action::new("turn left", |tank: &mut Tank| tank.turn_rate = -1.).boxed(),
//! ]);
//! let root = Root::new(tree.boxed()).unwrap();
//! ```
//!
//! and drive it from the host loop.
//!
//! ```rust
//! # use reactive_behavior_tree::*;
//! # use std::time::Duration;
//! # struct Tank { turn_rate: f32 }
//! # let mut root = Root::new(Action::new("idle", |_: &mut Tank| ()).boxed()).unwrap();
//! let mut tank = Tank { turn_rate: 0. };
//! root.blackboard_mut().set("targetOnRight", true);
//! root.start(&mut tank);
//! root.update(&mut tank, Duration::from_millis(16));
//! root.stop(&mut tank);
//! ```
//!
//! `update` advances the tree's clock, firing any due service timers, and then
//! ticks the tree.
//!
//! ## Restart policies
//!
//! A [`BlackboardCondition`] keeps observing its key while it is active, and,
//! depending on its [`RestartPolicy`], also while a lower priority sibling runs
//! in the same [`Selector`].
//!
//! * `None`: changes are ignored until the guarded branch finishes by itself.
//! * `ImmediateRestart`: a guard that stops holding aborts its branch on the next
//!   tick, and a guard that starts holding pre-empts the lower priority branch
//!   and restarts the selector right at this condition.
//! * `LowerPriority`: a guard that starts holding aborts the lower priority branch
//!   and makes the selector give up, so that it is re-evaluated from the top.
//! * `Both`: `LowerPriority` plus aborting its own branch.
//!
//! ## Loading trees from text
//!
//! Trees can also be written in a small text format and instantiated through a
//! [`Registry`] of node types.
//!
//! ```raw
//! tree main = Service (interval <- "0.2", callback <- perception) {
//!     Selector {
//!         Condition (key <- targetOffCentre, op <- "<=", value <- "0.1",
//!                    restart <- immediate_restart) {
//!             Sequence {
//!                 Turn (amount <- "0")
//!                 Wait (duration <- "2")
//!                 Fire (amount <- "1")
//!             }
//!         }
//!         Condition (key <- targetOnRight, op <- "==", value <- "true",
//!                    restart <- immediate_restart) {
//!             Turn (amount <- "1")
//!         }
//!         Turn (amount <- "-1")
//!     }
//! }
//! ```
//!
//! A node type that is not registered but names another tree in the same source
//! is a subtree reference. Line comments start with `#`.

mod agent;
mod args;
mod blackboard;
mod clock;
pub mod config;
mod context;
pub mod error;
pub mod library;
mod nodes;
pub mod parser;
mod perception;
mod registry;
mod root;
mod symbol;

pub use crate::agent::{Actuator, Tank};
pub use crate::args::NodeArgs;
pub use crate::blackboard::{
    Blackboard, BlackboardChange, BlackboardValue, Observer, ObserverId, ValueKind,
};
pub use crate::clock::{Clock, TimerId};
pub use crate::context::Context;
pub use crate::nodes::{
    Action, BlackboardCondition, Children, Operator, Preemption, RestartPolicy, Selector, Sequence,
    Service, ServiceCallback, Wait,
};
pub use crate::perception::{
    update_perception, LocalPoint, Perception, TARGET_DISTANCE, TARGET_IN_FRONT,
    TARGET_OFF_CENTRE, TARGET_ON_RIGHT,
};
pub use crate::registry::{NodeConstructor, NodeResult, Registry, SharedServiceCallback};
pub use crate::root::Root;
pub use crate::symbol::Symbol;
pub use crate::{
    error::{AddChildError, AddChildResult, BuildError, ConfigError, LoadError},
    parser::{load, parse_file, TreeSource},
};
pub use ::once_cell::sync::Lazy;

/// The outcome of a single tick.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BehaviorResult {
    Success,
    Fail,
    /// The node should keep running in the next tick
    Running,
}

/// Where a node is in its lifecycle.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum Status {
    #[default]
    Inactive,
    Running,
    Succeeded,
    Failed,
}

impl Status {
    pub fn is_active(self) -> bool {
        !matches!(self, Status::Inactive)
    }

    /// The node finished and waits to be stopped before it can run again.
    pub fn is_terminated(self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed)
    }

    /// The result a terminated node keeps reporting until it is stopped.
    pub fn terminal_result(self) -> Option<BehaviorResult> {
        match self {
            Status::Succeeded => Some(BehaviorResult::Success),
            Status::Failed => Some(BehaviorResult::Fail),
            Status::Running | Status::Inactive => None,
        }
    }
}

impl From<BehaviorResult> for Status {
    fn from(res: BehaviorResult) -> Self {
        match res {
            BehaviorResult::Success => Status::Succeeded,
            BehaviorResult::Fail => Status::Failed,
            BehaviorResult::Running => Status::Running,
        }
    }
}

/// The node contract every tree element implements.
///
/// `A` is the agent type lent to the tree by the host.
pub trait BehaviorNode<A> {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn status(&self) -> Status;

    /// Activates the node. Starting an already started node does nothing.
    fn start(&mut self, ctx: &mut Context<A>);

    /// Advances the node, starting it first if it is inactive.
    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult;

    /// Deactivates the node and every active descendant. Stopping an inactive
    /// node does nothing.
    fn stop(&mut self, ctx: &mut Context<A>);

    /// Called when the parent leaves the active tree. Besides stopping, this drops
    /// the blackboard observers that outlive `stop` so that a condition can
    /// watch for pre-emption while a sibling runs.
    fn release(&mut self, ctx: &mut Context<A>) {
        self.stop(ctx);
    }

    /// Asked by a [`Selector`] before it ticks a lower priority child. Returns
    /// how this node wants to take over, if its guard started holding since it
    /// was last evaluated.
    fn preempts(&mut self, _ctx: &mut Context<A>) -> Option<Preemption> {
        None
    }

    /// Dispatches a fired timer to the service that owns it. Returns whether some
    /// node in this subtree owned the timer.
    fn fire_timer(&mut self, _timer: TimerId, _ctx: &mut Context<A>) -> bool {
        false
    }

    /// The restart policy of this node if it has no effect unless the parent is a
    /// [`Selector`]. Policies that also abort their own branch work anywhere.
    fn selector_only_policy(&self) -> Option<RestartPolicy> {
        None
    }

    /// Checks the structure of the subtree before it is ever started.
    fn validate(&self) -> Result<(), BuildError> {
        Ok(())
    }

    fn boxed(self) -> Box<dyn BehaviorNode<A>>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}
