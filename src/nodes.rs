use crate::{
    error::{AddChildError, AddChildResult},
    BehaviorNode, BehaviorResult, Blackboard, BlackboardValue, BuildError, Context, ObserverId,
    Status, Symbol, TimerId, ValueKind,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    rc::Rc,
    str::FromStr,
    time::Duration,
};
use tracing::{debug, trace};

pub type Children<A> = Vec<Box<dyn BehaviorNode<A>>>;

/// Leaf running a side-effecting command on the agent.
///
/// An action finishes within the tick that runs it, so it never reports
/// `Running`. Continuous actuation such as holding a turn rate comes from the
/// enclosing composite ticking the action again on every frame.
pub struct Action<A> {
    label: String,
    callback: Box<dyn FnMut(&mut A)>,
    status: Status,
}

impl<A> Action<A> {
    pub fn new(label: impl Into<String>, callback: impl FnMut(&mut A) + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Box::new(callback),
            status: Status::Inactive,
        }
    }
}

impl<A> BehaviorNode<A> for Action<A> {
    fn name(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, _ctx: &mut Context<A>) {
        if self.status == Status::Inactive {
            self.status = Status::Running;
        }
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if self.status == Status::Succeeded {
            return BehaviorResult::Success;
        }
        trace!(action = %self.label, "run");
        (self.callback)(ctx.agent);
        self.status = Status::Succeeded;
        BehaviorResult::Success
    }

    fn stop(&mut self, _ctx: &mut Context<A>) {
        self.status = Status::Inactive;
    }
}

/// Ticks its children in order until one fails.
pub struct Sequence<A> {
    children: Children<A>,
    current: usize,
    status: Status,
}

impl<A> Default for Sequence<A> {
    fn default() -> Self {
        Self {
            children: vec![],
            current: 0,
            status: Status::Inactive,
        }
    }
}

impl<A> Sequence<A> {
    pub fn new(children: Children<A>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    pub fn add_child(&mut self, node: Box<dyn BehaviorNode<A>>) -> AddChildResult {
        self.children.push(node);
        Ok(())
    }

    fn finish(&mut self, result: BehaviorResult, ctx: &mut Context<A>) -> BehaviorResult {
        for child in &mut self.children {
            child.release(ctx);
        }
        self.status = result.into();
        result
    }
}

impl<A> BehaviorNode<A> for Sequence<A> {
    fn name(&self) -> &str {
        "Sequence"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, _ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            return;
        }
        self.current = 0;
        self.status = Status::Running;
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if let Some(res) = self.status.terminal_result() {
            return res;
        }
        while let Some(child) = self.children.get_mut(self.current) {
            match child.tick(ctx) {
                BehaviorResult::Running => return BehaviorResult::Running,
                BehaviorResult::Fail => {
                    child.stop(ctx);
                    return self.finish(BehaviorResult::Fail, ctx);
                }
                BehaviorResult::Success => {
                    child.stop(ctx);
                    self.current += 1;
                }
            }
        }
        self.finish(BehaviorResult::Success, ctx)
    }

    fn stop(&mut self, ctx: &mut Context<A>) {
        if self.status == Status::Inactive {
            return;
        }
        if let Some(child) = self.children.get_mut(self.current) {
            child.stop(ctx);
        }
        self.status = Status::Inactive;
    }

    fn release(&mut self, ctx: &mut Context<A>) {
        self.stop(ctx);
        for child in &mut self.children {
            child.release(ctx);
        }
    }

    fn fire_timer(&mut self, timer: TimerId, ctx: &mut Context<A>) -> bool {
        self.status == Status::Running
            && self
                .children
                .get_mut(self.current)
                .map_or(false, |child| child.fire_timer(timer, ctx))
    }

    fn validate(&self) -> Result<(), BuildError> {
        for child in &self.children {
            if let Some(policy) = child.selector_only_policy() {
                return Err(BuildError::PreemptionOutsideSelector {
                    node: child.name().to_owned(),
                    policy,
                });
            }
            child.validate()?;
        }
        Ok(())
    }
}

/// Tries its children in priority order until one succeeds or keeps running.
///
/// The selector keeps arbitrating while a child runs: on every tick, children with
/// a higher priority than the running one get the chance to pre-empt it.
pub struct Selector<A> {
    children: Children<A>,
    current: usize,
    status: Status,
}

impl<A> Default for Selector<A> {
    fn default() -> Self {
        Self {
            children: vec![],
            current: 0,
            status: Status::Inactive,
        }
    }
}

impl<A> Selector<A> {
    pub fn new(children: Children<A>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    pub fn add_child(&mut self, node: Box<dyn BehaviorNode<A>>) -> AddChildResult {
        self.children.push(node);
        Ok(())
    }

    fn finish(&mut self, result: BehaviorResult, ctx: &mut Context<A>) -> BehaviorResult {
        for child in &mut self.children {
            child.release(ctx);
        }
        self.status = result.into();
        result
    }
}

impl<A> BehaviorNode<A> for Selector<A> {
    fn name(&self) -> &str {
        "Selector"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, _ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            return;
        }
        self.current = 0;
        self.status = Status::Running;
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if let Some(res) = self.status.terminal_result() {
            return res;
        }

        for higher in 0..self.current.min(self.children.len()) {
            let Some(preemption) = self.children[higher].preempts(ctx) else {
                continue;
            };
            debug!(
                by = self.children[higher].name(),
                aborted = self.children[self.current].name(),
                ?preemption,
                "pre-empting lower priority branch"
            );
            self.children[self.current].stop(ctx);
            match preemption {
                Preemption::Immediate => {
                    self.current = higher;
                    break;
                }
                Preemption::Deferred => return self.finish(BehaviorResult::Fail, ctx),
            }
        }

        while let Some(child) = self.children.get_mut(self.current) {
            match child.tick(ctx) {
                BehaviorResult::Running => return BehaviorResult::Running,
                BehaviorResult::Success => {
                    child.stop(ctx);
                    return self.finish(BehaviorResult::Success, ctx);
                }
                BehaviorResult::Fail => {
                    child.stop(ctx);
                    self.current += 1;
                }
            }
        }
        self.finish(BehaviorResult::Fail, ctx)
    }

    fn stop(&mut self, ctx: &mut Context<A>) {
        if self.status == Status::Inactive {
            return;
        }
        if let Some(child) = self.children.get_mut(self.current) {
            child.stop(ctx);
        }
        self.status = Status::Inactive;
    }

    fn release(&mut self, ctx: &mut Context<A>) {
        self.stop(ctx);
        for child in &mut self.children {
            child.release(ctx);
        }
    }

    fn fire_timer(&mut self, timer: TimerId, ctx: &mut Context<A>) -> bool {
        self.status == Status::Running
            && self
                .children
                .get_mut(self.current)
                .map_or(false, |child| child.fire_timer(timer, ctx))
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.children.iter().try_for_each(|child| child.validate())
    }
}

/// How a pre-empting condition takes over from a lower priority sibling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preemption {
    /// The selector restarts right at the pre-empting child in the same tick.
    Immediate,
    /// The selector fails, leaving the re-evaluation to its parent.
    Deferred,
}

/// How a [`BlackboardCondition`] reacts when its key changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    None,
    ImmediateRestart,
    LowerPriority,
    Both,
}

impl RestartPolicy {
    /// Whether a guard that stops holding aborts the guarded branch.
    pub fn aborts_self(self) -> bool {
        matches!(self, Self::ImmediateRestart | Self::Both)
    }

    pub fn preemption(self) -> Option<Preemption> {
        match self {
            Self::None => None,
            Self::ImmediateRestart => Some(Preemption::Immediate),
            Self::LowerPriority | Self::Both => Some(Preemption::Deferred),
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "none" => Self::None,
            "immediate_restart" => Self::ImmediateRestart,
            "lower_priority" => Self::LowerPriority,
            "both" => Self::Both,
            _ => return Err(()),
        })
    }
}

/// Comparison applied by a [`BlackboardCondition`] between the value at its key
/// and its threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "is_set")]
    IsSet,
    #[serde(rename = "is_not_set")]
    IsNotSet,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::IsSet => "is_set",
            Self::IsNotSet => "is_not_set",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual
        )
    }

    /// Compares two values of the same kind. `None` means the values cannot be
    /// compared with this operator.
    pub fn compare(self, value: &BlackboardValue, threshold: &BlackboardValue) -> Option<bool> {
        if value.kind() != threshold.kind() {
            return None;
        }
        match self {
            Self::Equal => Some(value == threshold),
            Self::NotEqual => Some(value != threshold),
            Self::IsSet => Some(true),
            Self::IsNotSet => Some(false),
            _ => {
                let ord = value.as_number()?.partial_cmp(&threshold.as_number()?)?;
                Some(match self {
                    Self::Less => ord == Ordering::Less,
                    Self::LessOrEqual => ord != Ordering::Greater,
                    Self::Greater => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                })
            }
        }
    }
}

impl Display for Operator {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            "is_set" => Self::IsSet,
            "is_not_set" => Self::IsNotSet,
            _ => return Err(()),
        })
    }
}

/// Guards one child with a predicate over a blackboard value.
///
/// The condition subscribes to its key while started. Notifications only raise a
/// flag; the flag is acted upon the next time the tree reaches this node, either
/// through `tick` (aborting its own branch) or through `preempts` (taking over
/// from a lower priority sibling).
pub struct BlackboardCondition<A> {
    key: Symbol,
    operator: Operator,
    threshold: BlackboardValue,
    policy: RestartPolicy,
    child: Option<Box<dyn BehaviorNode<A>>>,
    status: Status,
    changed: Rc<Cell<bool>>,
    observer: Option<ObserverId>,
}

impl<A> BlackboardCondition<A> {
    pub fn new(
        key: impl Into<Symbol>,
        operator: Operator,
        threshold: impl Into<BlackboardValue>,
        policy: RestartPolicy,
        child: Box<dyn BehaviorNode<A>>,
    ) -> Self {
        let mut ret = Self::detached(key, operator, threshold, policy);
        ret.child = Some(child);
        ret
    }

    /// A condition whose child is supplied later with `add_child`.
    pub fn detached(
        key: impl Into<Symbol>,
        operator: Operator,
        threshold: impl Into<BlackboardValue>,
        policy: RestartPolicy,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            threshold: threshold.into(),
            policy,
            child: None,
            status: Status::Inactive,
            changed: Rc::new(Cell::new(false)),
            observer: None,
        }
    }

    pub fn add_child(&mut self, node: Box<dyn BehaviorNode<A>>) -> AddChildResult {
        if self.child.is_some() {
            return Err(AddChildError::TooManyNodes);
        }
        self.child = Some(node);
        Ok(())
    }

    pub fn key(&self) -> Symbol {
        self.key
    }

    pub fn policy(&self) -> RestartPolicy {
        self.policy
    }

    /// Applies the operator to the current value. Unset keys and values of
    /// another kind make the predicate false.
    pub fn evaluate(&self, blackboard: &Blackboard) -> bool {
        let value = blackboard.get(self.key);
        match (self.operator, value) {
            (Operator::IsSet, value) => value.is_some(),
            (Operator::IsNotSet, value) => value.is_none(),
            (_, None) => {
                blackboard.note_missing(self.key, self.threshold.kind());
                false
            }
            (operator, Some(value)) => operator
                .compare(value, &self.threshold)
                .unwrap_or_else(|| {
                    blackboard.note_missing(self.key, self.threshold.kind());
                    false
                }),
        }
    }

    fn observe(&mut self, ctx: &mut Context<A>) {
        if self.observer.is_none() {
            let changed = Rc::clone(&self.changed);
            self.observer = Some(ctx.blackboard.subscribe(self.key, move |_| changed.set(true)));
        }
    }

    fn unobserve(&mut self, ctx: &mut Context<A>) {
        if let Some(id) = self.observer.take() {
            ctx.blackboard.unsubscribe(id);
        }
    }
}

impl<A> BehaviorNode<A> for BlackboardCondition<A> {
    fn name(&self) -> &str {
        "BlackboardCondition"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            return;
        }
        self.observe(ctx);
        self.changed.set(false);
        let holds = self.child.is_some() && self.evaluate(ctx.blackboard);
        match self.child.as_mut() {
            Some(child) if holds => {
                trace!(key = %self.key, "guard holds");
                self.status = Status::Running;
                child.start(ctx);
            }
            _ => self.status = Status::Failed,
        }
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if let Some(res) = self.status.terminal_result() {
            return res;
        }
        if self.policy.aborts_self()
            && self.changed.replace(false)
            && !self.evaluate(ctx.blackboard)
        {
            debug!(key = %self.key, "guard no longer holds, aborting branch");
            if let Some(child) = self.child.as_mut() {
                child.stop(ctx);
            }
            self.status = Status::Failed;
            return BehaviorResult::Fail;
        }
        let Some(child) = self.child.as_mut() else {
            self.status = Status::Failed;
            return BehaviorResult::Fail;
        };
        let res = child.tick(ctx);
        self.status = res.into();
        res
    }

    fn stop(&mut self, ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            if let Some(child) = self.child.as_mut() {
                child.stop(ctx);
            }
            self.status = Status::Inactive;
        }
        self.changed.set(false);
        if self.policy.preemption().is_none() {
            self.unobserve(ctx);
        }
    }

    fn release(&mut self, ctx: &mut Context<A>) {
        self.stop(ctx);
        if let Some(child) = self.child.as_mut() {
            child.release(ctx);
        }
        self.unobserve(ctx);
    }

    fn preempts(&mut self, ctx: &mut Context<A>) -> Option<Preemption> {
        let preemption = self.policy.preemption()?;
        if self.status != Status::Inactive || self.observer.is_none() {
            return None;
        }
        if !self.changed.replace(false) || !self.evaluate(ctx.blackboard) {
            return None;
        }
        debug!(key = %self.key, "guard started holding");
        Some(preemption)
    }

    fn fire_timer(&mut self, timer: TimerId, ctx: &mut Context<A>) -> bool {
        self.status.is_active()
            && self
                .child
                .as_mut()
                .map_or(false, |child| child.fire_timer(timer, ctx))
    }

    fn selector_only_policy(&self) -> Option<RestartPolicy> {
        (self.policy == RestartPolicy::LowerPriority).then_some(self.policy)
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.key.is_empty() {
            return Err(BuildError::EmptyKey);
        }
        if self.operator.is_ordering() && self.threshold.kind() != ValueKind::Number {
            return Err(BuildError::OperatorMismatch {
                key: self.key,
                operator: self.operator,
                threshold: self.threshold.clone(),
            });
        }
        let child = self.child.as_ref().ok_or_else(|| BuildError::MissingChild {
            node: format!("BlackboardCondition({})", self.key),
        })?;
        if let Some(policy) = child.selector_only_policy() {
            return Err(BuildError::PreemptionOutsideSelector {
                node: child.name().to_owned(),
                policy,
            });
        }
        child.validate()
    }
}

pub type ServiceCallback<A> = Box<dyn FnMut(&mut A, &mut Blackboard)>;

/// Runs a callback on a fixed cadence of simulated time until it is stopped,
/// typically to refresh perception values on the blackboard.
///
/// The cadence does not depend on the child: a Service whose child finished
/// keeps its timer until the parent stops it.
pub struct Service<A> {
    label: String,
    interval: Duration,
    callback: ServiceCallback<A>,
    child: Option<Box<dyn BehaviorNode<A>>>,
    timer: Option<TimerId>,
    status: Status,
}

impl<A> Service<A> {
    pub fn new(
        interval: Duration,
        callback: impl FnMut(&mut A, &mut Blackboard) + 'static,
        child: Box<dyn BehaviorNode<A>>,
    ) -> Self {
        let mut ret = Self::detached(interval, callback);
        ret.child = Some(child);
        ret
    }

    pub fn detached(
        interval: Duration,
        callback: impl FnMut(&mut A, &mut Blackboard) + 'static,
    ) -> Self {
        Self {
            label: "Service".to_owned(),
            interval,
            callback: Box::new(callback),
            child: None,
            timer: None,
            status: Status::Inactive,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn add_child(&mut self, node: Box<dyn BehaviorNode<A>>) -> AddChildResult {
        if self.child.is_some() {
            return Err(AddChildError::TooManyNodes);
        }
        self.child = Some(node);
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn cancel_timer(&mut self, ctx: &mut Context<A>) {
        if let Some(timer) = self.timer.take() {
            ctx.clock.cancel(timer);
        }
    }
}

impl<A> BehaviorNode<A> for Service<A> {
    fn name(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            return;
        }
        self.status = Status::Running;
        (self.callback)(ctx.agent, ctx.blackboard);
        self.timer = Some(ctx.clock.add_timer(self.interval));
        debug!(service = %self.label, interval = ?self.interval, "started");
        if let Some(child) = self.child.as_mut() {
            child.start(ctx);
        }
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if let Some(res) = self.status.terminal_result() {
            return res;
        }
        let res = self
            .child
            .as_mut()
            .map_or(BehaviorResult::Fail, |child| child.tick(ctx));
        self.status = res.into();
        res
    }

    fn stop(&mut self, ctx: &mut Context<A>) {
        self.cancel_timer(ctx);
        if self.status == Status::Inactive {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            child.stop(ctx);
        }
        self.status = Status::Inactive;
        debug!(service = %self.label, "stopped");
    }

    fn release(&mut self, ctx: &mut Context<A>) {
        self.stop(ctx);
        if let Some(child) = self.child.as_mut() {
            child.release(ctx);
        }
    }

    fn preempts(&mut self, ctx: &mut Context<A>) -> Option<Preemption> {
        self.child.as_mut()?.preempts(ctx)
    }

    fn fire_timer(&mut self, timer: TimerId, ctx: &mut Context<A>) -> bool {
        if !self.status.is_active() {
            return false;
        }
        if self.timer == Some(timer) {
            trace!(service = %self.label, now = ?ctx.clock.now(), "fire");
            (self.callback)(ctx.agent, ctx.blackboard);
            return true;
        }
        self.child
            .as_mut()
            .map_or(false, |child| child.fire_timer(timer, ctx))
    }

    fn selector_only_policy(&self) -> Option<RestartPolicy> {
        self.child.as_ref()?.selector_only_policy()
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.interval.is_zero() {
            return Err(BuildError::ZeroInterval {
                node: self.label.clone(),
            });
        }
        self.child
            .as_ref()
            .ok_or_else(|| BuildError::MissingChild {
                node: self.label.clone(),
            })?
            .validate()
    }
}

/// Succeeds once a fixed amount of simulated time has passed since it started.
pub struct Wait {
    duration: Duration,
    variance: Duration,
    target: Duration,
    started_at: Duration,
    status: Status,
}

impl Wait {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            variance: Duration::ZERO,
            target: duration,
            started_at: Duration::ZERO,
            status: Status::Inactive,
        }
    }

    /// Every start picks a wait time uniformly within `duration ± variance`,
    /// never below zero.
    pub fn with_variance(mut self, variance: Duration) -> Self {
        self.variance = variance;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<A> BehaviorNode<A> for Wait {
    fn name(&self) -> &str {
        "Wait"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, ctx: &mut Context<A>) {
        if self.status != Status::Inactive {
            return;
        }
        self.started_at = ctx.now();
        self.target = if self.variance.is_zero() {
            self.duration
        } else {
            let spread = self.variance.as_secs_f64();
            let secs = self.duration.as_secs_f64() + rand::thread_rng().gen_range(-spread..=spread);
            Duration::from_secs_f64(secs.max(0.))
        };
        self.status = Status::Running;
    }

    fn tick(&mut self, ctx: &mut Context<A>) -> BehaviorResult {
        self.start(ctx);
        if self.status == Status::Succeeded {
            return BehaviorResult::Success;
        }
        if ctx.now().saturating_sub(self.started_at) < self.target {
            return BehaviorResult::Running;
        }
        self.status = Status::Succeeded;
        BehaviorResult::Success
    }

    fn stop(&mut self, ctx: &mut Context<A>) {
        if self.status == Status::Running {
            trace!(waited = ?ctx.now().saturating_sub(self.started_at), "wait interrupted");
        }
        self.status = Status::Inactive;
    }
}
