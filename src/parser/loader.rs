use super::nom_parser::{TreeDef, TreeSource};
use crate::{error::LoadError, BehaviorNode, NodeArgs, Registry};
use tracing::debug;

/// Instantiate the tree called `name` from a parsed source.
///
/// Node types are looked up in `registry` first. A type that is not registered
/// but names another tree in the same source is a subtree reference, which is
/// expanded in place.
///
/// The result is not validated yet; wrap it in a [`crate::Root`] to check it.
pub fn load<A: 'static>(
    tree_source: &TreeSource,
    registry: &Registry<A>,
    name: &str,
) -> Result<Box<dyn BehaviorNode<A>>, LoadError> {
    let tree = tree_source
        .tree(name)
        .ok_or_else(|| LoadError::MissingTree(name.to_owned()))?;

    let top = TreeStack { name, parent: None };

    debug!(tree = name, "loading");
    load_recurse(&tree.root, registry, tree_source, &top)
}

/// A mechanism to detect infinite recursion. It is a linked list in call stack.
/// You can traverse the link back to enumerate all the subtree names being
/// expanded and check if a subtree name to be inserted is already there.
///
/// Subtrees are expanded eagerly, so a recursive reference would never end.
/// We make it an error instead.
struct TreeStack<'a, 'src> {
    name: &'src str,
    parent: Option<&'a TreeStack<'a, 'src>>,
}

impl<'a, 'src> TreeStack<'a, 'src> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

fn load_recurse<A: 'static>(
    parent: &TreeDef,
    registry: &Registry<A>,
    tree_source: &TreeSource,
    parent_stack: &TreeStack,
) -> Result<Box<dyn BehaviorNode<A>>, LoadError> {
    if registry.contains(parent.ty) {
        let children = parent
            .children
            .iter()
            .map(|child| load_recurse(child, registry, tree_source, parent_stack))
            .collect::<Result<Vec<_>, _>>()?;
        let args = NodeArgs::new(
            parent.ty,
            parent
                .args
                .iter()
                .map(|arg| (arg.name, arg.value.as_str()))
                .collect(),
        );
        return registry.build(&args, children);
    }

    let tree = tree_source
        .tree(parent.ty)
        .ok_or_else(|| LoadError::MissingNode(parent.ty.to_owned()))?;

    if !parent.args.is_empty() || !parent.children.is_empty() {
        return Err(LoadError::SubtreeWithChildren {
            node: parent.ty.to_owned(),
        });
    }

    // Prevent infinite recursion
    if parent_stack.find(parent.ty) {
        return Err(LoadError::InfiniteRecursion {
            node: parent.ty.to_owned(),
        });
    }
    let tree_stack = TreeStack {
        name: parent.ty,
        parent: Some(parent_stack),
    };
    load_recurse(&tree.root, registry, tree_source, &tree_stack)
}

#[cfg(test)]
mod test;
