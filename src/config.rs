//! Per-agent configuration, usually read from YAML.
//!
//! ```yaml
//! behaviour: track        # or an index, 5 selects the same recipe
//! seed: 42
//! params:
//!   perception_interval: 0.2
//!   aim: { key: targetOffCentre, op: "<=", value: 0.05 }
//! blackboard:
//!   targetOnRight: false
//! ```
//!
//! With `trees` set, the tree named by `tree` is loaded from that text source
//! instead of a library recipe, using the actions of [`BehaviorLibrary::registry`].

use crate::{
    error::ConfigError,
    library::{BehaviorLibrary, Recipe, RecipeParams},
    load, Blackboard, BlackboardValue, Root, Tank, TreeSource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Which recipe to run, by name or by the numeric behaviour setting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeSelector {
    Index(i64),
    Name(String),
}

impl Default for RecipeSelector {
    fn default() -> Self {
        Self::Name(Recipe::Idle.name().to_owned())
    }
}

impl RecipeSelector {
    /// Unknown indices fall back to the idle recipe, unknown names are errors.
    pub fn recipe(&self) -> Result<Recipe, ConfigError> {
        match self {
            Self::Index(index) => Ok(Recipe::from_index(*index)),
            Self::Name(name) => name.parse(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub behaviour: RecipeSelector,
    /// Seed of the random actions. Without one every run differs.
    pub seed: Option<u64>,
    pub params: RecipeParams,
    /// Values written to the blackboard before the tree starts.
    pub blackboard: BTreeMap<String, BlackboardValue>,
    /// A tree source in the text format.
    pub trees: Option<String>,
    /// Tree of `trees` to run, `main` if unset.
    pub tree: Option<String>,
}

impl AgentConfig {
    pub fn from_yaml(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn library(&self) -> BehaviorLibrary {
        match self.seed {
            Some(seed) => BehaviorLibrary::with_seed(self.params.clone(), seed),
            None => BehaviorLibrary::new(self.params.clone()),
        }
    }

    /// Builds the configured tree with the initial blackboard values in place.
    pub fn build_root<A: Tank + 'static>(&self) -> Result<Root<A>, ConfigError> {
        let mut library = self.library();
        let node = match &self.trees {
            Some(src) => {
                let name = self.tree.as_deref().unwrap_or("main");
                info!(tree = name, "loading behaviour from tree source");
                let source = TreeSource::parse(src)?;
                load(&source, &library.registry::<A>(), name)?
            }
            None => {
                let recipe = self.behaviour.recipe()?;
                info!(%recipe, "using library behaviour");
                library.tree(recipe)
            }
        };
        let mut blackboard = Blackboard::new();
        for (key, value) in &self.blackboard {
            blackboard.set(key.as_str(), value.clone());
        }
        Ok(Root::with_blackboard(node, blackboard)?)
    }
}
