use crate::{BlackboardValue, Operator, RestartPolicy, Symbol};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddChildError {
    #[error("Attempted to add too many nodes")]
    TooManyNodes,
}

pub type AddChildResult = Result<(), AddChildError>;

/// A tree that must not be started.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("{node} needs exactly one child")]
    MissingChild { node: String },
    #[error("{node} uses restart policy {policy:?}, which needs a Selector as its parent")]
    PreemptionOutsideSelector { node: String, policy: RestartPolicy },
    #[error("operator {operator} cannot compare {key} against {threshold}")]
    OperatorMismatch {
        key: Symbol,
        operator: Operator,
        threshold: BlackboardValue,
    },
    #[error("{node} has a zero interval")]
    ZeroInterval { node: String },
    #[error("blackboard condition has an empty key")]
    EmptyKey,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("Parse error at line {line}: {snippet:?}")]
    Parse { line: usize, snippet: String },
    #[error("The tree {0:?} does not exist")]
    MissingTree(String),
    #[error("Node type or subtree name not found {0:?}")]
    MissingNode(String),
    #[error("Service callback {service:?} used by {node} is not registered")]
    MissingService { node: String, service: String },
    #[error("{node} requires argument {arg:?}")]
    MissingArgument { node: String, arg: String },
    #[error("{node} does not take argument {arg:?}")]
    UnknownArgument { node: String, arg: String },
    #[error("{node} cannot use {value:?} as argument {arg:?}")]
    BadArgument {
        node: String,
        arg: String,
        value: String,
    },
    #[error("Subtree {node} takes neither arguments nor children")]
    SubtreeWithChildren { node: String },
    #[error("Infinite recursion detected in subtree {node}")]
    InfiniteRecursion { node: String },
    #[error("{0} to {1}")]
    AddChildError(AddChildError, String),
    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unknown behaviour recipe {0:?}")]
    UnknownRecipe(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Build(#[from] BuildError),
}
