use crate::{
    error::{AddChildError, LoadError},
    nodes::Children,
    Action, BehaviorNode, Blackboard, BlackboardCondition, BlackboardValue, BuildError, NodeArgs,
    Operator, RestartPolicy, Selector, Sequence, Service, Wait,
};
use std::{collections::HashMap, rc::Rc, time::Duration};

/// Builds a node of one type from its arguments and its already built children.
/// The registry is passed along so that a node can look up named callbacks.
pub type NodeConstructor<A> = Box<dyn Fn(&NodeArgs, Children<A>, &Registry<A>) -> NodeResult<A>>;

pub type NodeResult<A> = Result<Box<dyn BehaviorNode<A>>, LoadError>;

/// A perception callback that any number of `Service` nodes may share.
pub type SharedServiceCallback<A> = Rc<dyn Fn(&mut A, &mut Blackboard)>;

struct Entry<A> {
    args: &'static [&'static str],
    build: NodeConstructor<A>,
}

/// Node types and service callbacks a tree source may refer to by name.
pub struct Registry<A> {
    node_types: HashMap<String, Entry<A>>,
    services: HashMap<String, SharedServiceCallback<A>>,
}

impl<A: 'static> Default for Registry<A> {
    fn default() -> Self {
        let mut ret = Self::empty();
        ret.register("Sequence", &[], |_, children, _| {
            Ok(Sequence::new(children).boxed())
        });
        ret.register("Selector", &[], |_, children, _| {
            Ok(Selector::new(children).boxed())
        });
        ret.register("Condition", &["key", "op", "value", "restart"], condition);
        ret.register("Service", &["interval", "callback"], service);
        ret.register("Wait", &["duration", "variance"], |args, children, _| {
            no_children(args, &children)?;
            Ok(Wait::new(args.seconds("duration")?)
                .with_variance(args.seconds_or("variance", Duration::ZERO)?)
                .boxed())
        });
        ret
    }
}

impl<A> Registry<A> {
    /// A registry without even the built-in node types.
    pub fn empty() -> Self {
        Self {
            node_types: HashMap::new(),
            services: HashMap::new(),
        }
    }

    /// Registers a node type accepting the arguments named in `args`.
    pub fn register<F>(
        &mut self,
        type_name: impl ToString,
        args: &'static [&'static str],
        constructor: F,
    ) where
        F: Fn(&NodeArgs, Children<A>, &Registry<A>) -> NodeResult<A> + 'static,
    {
        self.node_types.insert(
            type_name.to_string(),
            Entry {
                args,
                build: Box::new(constructor),
            },
        );
    }

    /// Registers a leaf running the command `make` returns for the given
    /// arguments.
    pub fn register_action<F>(
        &mut self,
        type_name: impl ToString,
        args: &'static [&'static str],
        make: impl Fn(&NodeArgs) -> Result<F, LoadError> + 'static,
    ) where
        A: 'static,
        F: FnMut(&mut A) + 'static,
    {
        self.register(type_name, args, move |node_args, children, _| {
            no_children(node_args, &children)?;
            Ok(Action::new(node_args.node(), make(node_args)?).boxed())
        });
    }

    /// Registers a callback that `Service` nodes refer to with `callback <- name`.
    pub fn register_service(
        &mut self,
        name: impl ToString,
        callback: impl Fn(&mut A, &mut Blackboard) + 'static,
    ) {
        self.services.insert(name.to_string(), Rc::new(callback));
    }

    pub fn service(&self, name: &str) -> Option<SharedServiceCallback<A>> {
        self.services.get(name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.node_types.contains_key(type_name)
    }

    pub(crate) fn build(
        &self,
        args: &NodeArgs,
        children: Children<A>,
    ) -> NodeResult<A> {
        let entry = self
            .node_types
            .get(args.node())
            .ok_or_else(|| LoadError::MissingNode(args.node().to_owned()))?;
        args.check_accepted(entry.args)?;
        (entry.build)(args, children, self)
    }
}

fn no_children<A>(args: &NodeArgs, children: &Children<A>) -> Result<(), LoadError> {
    if children.is_empty() {
        Ok(())
    } else {
        Err(LoadError::AddChildError(
            AddChildError::TooManyNodes,
            args.node().to_owned(),
        ))
    }
}

fn single_child<A>(
    args: &NodeArgs,
    mut children: Children<A>,
) -> NodeResult<A> {
    if children.len() > 1 {
        return Err(LoadError::AddChildError(
            AddChildError::TooManyNodes,
            args.node().to_owned(),
        ));
    }
    children.pop().ok_or_else(|| {
        BuildError::MissingChild {
            node: args.node().to_owned(),
        }
        .into()
    })
}

fn condition<A: 'static>(
    args: &NodeArgs,
    children: Children<A>,
    _: &Registry<A>,
) -> NodeResult<A> {
    let operator = args.parse_or("op", Operator::Equal)?;
    let threshold = match operator {
        Operator::IsSet | Operator::IsNotSet => BlackboardValue::Bool(true),
        _ => args.value("value")?,
    };
    Ok(BlackboardCondition::new(
        args.required("key")?,
        operator,
        threshold,
        args.parse_or("restart", RestartPolicy::None)?,
        single_child(args, children)?,
    )
    .boxed())
}

fn service<A: 'static>(
    args: &NodeArgs,
    children: Children<A>,
    registry: &Registry<A>,
) -> NodeResult<A> {
    let name = args.required("callback")?;
    let callback = registry
        .service(name)
        .ok_or_else(|| LoadError::MissingService {
            node: args.node().to_owned(),
            service: name.to_owned(),
        })?;
    Ok(Service::new(
        args.seconds("interval")?,
        move |agent: &mut A, blackboard: &mut Blackboard| callback(agent, blackboard),
        single_child(args, children)?,
    )
    .with_label(format!("Service({})", name))
    .boxed())
}
