//! Ready made trees for a tank that tracks and shoots at a target.
//!
//! Every recipe is built from the same engine nodes a user would compose by
//! hand. The tracking recipes share one skeleton: a perception service around a
//! selector that turns toward the target until an aiming guard holds, and then
//! runs the recipe specific branch.

use crate::{
    error::ConfigError, update_perception, Action, Actuator, BehaviorNode, BlackboardCondition,
    BlackboardValue, BuildError, Operator, Registry, RestartPolicy, Root, Selector, Sequence,
    Service, Symbol, Tank, Wait, TARGET_OFF_CENTRE, TARGET_ON_RIGHT,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    fmt::{self, Display, Formatter},
    rc::Rc,
    str::FromStr,
    time::Duration,
};
use tracing::debug;

/// Name of the perception callback in [`BehaviorLibrary::registry`].
pub const PERCEPTION_SERVICE: &str = "perception";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    /// Spin, move and fire all the time.
    Fun,
    /// Track the target, charge at it and fire.
    Deadly,
    /// Track the target, then back away from it without firing.
    Frightened,
    /// Track the target, pause, then move and fire at random.
    Unpredictable,
    /// Spin on the spot and fire.
    Spin,
    /// Turn to face the target, pause, then fire.
    Track,
    MoveOnly,
    FireOnly,
    /// Turn slowly and do nothing else.
    Idle,
}

impl Recipe {
    pub const ALL: [Recipe; 9] = [
        Recipe::Fun,
        Recipe::Deadly,
        Recipe::Frightened,
        Recipe::Unpredictable,
        Recipe::Spin,
        Recipe::Track,
        Recipe::MoveOnly,
        Recipe::FireOnly,
        Recipe::Idle,
    ];

    /// Maps the numeric behaviour setting of a tank to a recipe. Numbers
    /// without a recipe select [`Recipe::Idle`].
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => Self::Fun,
            1 => Self::Deadly,
            2 => Self::Frightened,
            3 => Self::Unpredictable,
            4 => Self::Spin,
            5 => Self::Track,
            6 => Self::MoveOnly,
            7 => Self::FireOnly,
            _ => Self::Idle,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fun => "fun",
            Self::Deadly => "deadly",
            Self::Frightened => "frightened",
            Self::Unpredictable => "unpredictable",
            Self::Spin => "spin",
            Self::Track => "track",
            Self::MoveOnly => "move_only",
            Self::FireOnly => "fire_only",
            Self::Idle => "idle",
        }
    }

    /// Whether the recipe steers with perception, and so needs a target.
    pub fn is_tracking(self) -> bool {
        matches!(
            self,
            Self::Deadly | Self::Frightened | Self::Unpredictable | Self::Track
        )
    }
}

impl Display for Recipe {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for Recipe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|recipe| recipe.name() == s)
            .ok_or_else(|| ConfigError::UnknownRecipe(s.to_owned()))
    }
}

/// The predicate deciding that the target is lined up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub key: Symbol,
    #[serde(rename = "op")]
    pub operator: Operator,
    #[serde(rename = "value")]
    pub threshold: BlackboardValue,
}

impl Guard {
    pub fn new(
        key: impl Into<Symbol>,
        operator: Operator,
        threshold: impl Into<BlackboardValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            threshold: threshold.into(),
        }
    }

    pub fn condition<A>(
        &self,
        policy: RestartPolicy,
        child: Box<dyn BehaviorNode<A>>,
    ) -> BlackboardCondition<A> {
        BlackboardCondition::new(self.key, self.operator, self.threshold.clone(), policy, child)
    }
}

impl Default for Guard {
    /// The target is within about six degrees of straight ahead.
    fn default() -> Self {
        Self::new(*TARGET_OFF_CENTRE, Operator::LessOrEqual, 0.1)
    }
}

/// Tunable numbers of the recipes. Durations are written in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeParams {
    #[serde(with = "seconds")]
    pub perception_interval: Duration,
    pub aim: Guard,
    pub turn_rate: f32,
    #[serde(with = "seconds")]
    pub track_wait: Duration,
    #[serde(with = "seconds")]
    pub unpredictable_wait: Duration,
    pub spin_turn: f32,
    pub spin_fire: f32,
    pub fun_move: f32,
    pub fun_turn: f32,
    pub fun_fire: f32,
    pub deadly_move: f32,
    pub deadly_turn: f32,
    pub deadly_fire: f32,
    pub frightened_turn: f32,
    pub frightened_move: f32,
    pub move_only: f32,
    pub fire_only: f32,
    pub idle_turn: f32,
}

impl Default for RecipeParams {
    fn default() -> Self {
        Self {
            perception_interval: Duration::from_millis(200),
            aim: Guard::default(),
            turn_rate: 1.,
            track_wait: Duration::from_secs(2),
            unpredictable_wait: Duration::from_secs(3),
            spin_turn: -0.05,
            spin_fire: 1.,
            fun_move: 1.,
            fun_turn: 1.,
            fun_fire: 1.,
            deadly_move: 0.4,
            deadly_turn: 1.,
            deadly_fire: -1.,
            frightened_turn: 1.,
            frightened_move: -0.5,
            move_only: 1.,
            fire_only: 1.,
            idle_turn: 0.1,
        }
    }
}

mod seconds {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0. {
            return Err(D::Error::custom(format!("invalid number of seconds {}", secs)));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Builds the recipes for any agent implementing [`Tank`].
///
/// The random actions draw from generators seeded by the library, so a library
/// created with [`BehaviorLibrary::with_seed`] builds trees that behave the same
/// on every run.
pub struct BehaviorLibrary {
    params: RecipeParams,
    rng: StdRng,
}

impl BehaviorLibrary {
    pub fn new(params: RecipeParams) -> Self {
        Self {
            params,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(params: RecipeParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn params(&self) -> &RecipeParams {
        &self.params
    }

    /// Builds `recipe` and wraps it in a validated [`Root`].
    pub fn build<A: Tank + 'static>(&mut self, recipe: Recipe) -> Result<Root<A>, BuildError> {
        debug!(%recipe, "building behaviour");
        Root::new(self.tree(recipe))
    }

    pub fn tree<A: Tank + 'static>(&mut self, recipe: Recipe) -> Box<dyn BehaviorNode<A>> {
        let p = &self.params;
        match recipe {
            Recipe::Spin => Sequence::new(vec![turn(p.spin_turn), fire(p.spin_fire)]).boxed(),
            Recipe::Fun => Sequence::new(vec![
                move_by(p.fun_move),
                turn(p.fun_turn),
                fire(p.fun_fire),
            ])
            .boxed(),
            Recipe::MoveOnly => Sequence::new(vec![move_by(p.move_only)]).boxed(),
            Recipe::FireOnly => Sequence::new(vec![fire(p.fire_only)]).boxed(),
            Recipe::Idle => turn(p.idle_turn),
            Recipe::Track => {
                let aimed: Sequence<A> = Sequence::new(vec![
                    turn(0.),
                    Wait::new(p.track_wait).boxed(),
                    random_fire(fork(&mut self.rng)),
                ]);
                self.tracking(aimed.boxed())
            }
            Recipe::Deadly => {
                let aimed: Sequence<A> = Sequence::new(vec![
                    move_by(p.deadly_move),
                    turn(p.deadly_turn),
                    fire(p.deadly_fire),
                ]);
                self.tracking(aimed.boxed())
            }
            Recipe::Frightened => {
                let aimed: Sequence<A> = Sequence::new(vec![
                    turn(p.frightened_turn),
                    move_by(p.frightened_move),
                ]);
                self.tracking(aimed.boxed())
            }
            Recipe::Unpredictable => {
                let aimed: Sequence<A> = Sequence::new(vec![
                    turn(0.),
                    Wait::new(p.unpredictable_wait).boxed(),
                    random_move(fork(&mut self.rng)),
                    random_fire(fork(&mut self.rng)),
                ]);
                self.tracking(aimed.boxed())
            }
        }
    }

    /// A registry with the tank actions and the perception service, for trees
    /// written in the text format.
    ///
    /// | Type         | Arguments |
    /// |--------------|-----------|
    /// | `Turn`       | `amount`  |
    /// | `Move`       | `amount`  |
    /// | `Fire`       | `amount`  |
    /// | `RandomMove` |           |
    /// | `RandomFire` |           |
    pub fn registry<A: Tank + 'static>(&mut self) -> Registry<A> {
        let mut registry = Registry::default();
        registry.register_action("Turn", &["amount"], |args| {
            let amount: f32 = args.parse("amount")?;
            Ok(move |agent: &mut A| agent.turn(amount))
        });
        registry.register_action("Move", &["amount"], |args| {
            let amount: f32 = args.parse("amount")?;
            Ok(move |agent: &mut A| agent.move_by(amount))
        });
        registry.register_action("Fire", &["amount"], |args| {
            let amount: f32 = args.parse("amount")?;
            Ok(move |agent: &mut A| agent.fire(amount))
        });
        let rng = Rc::new(RefCell::new(fork(&mut self.rng)));
        let move_rng = Rc::clone(&rng);
        registry.register_action("RandomMove", &[], move |_| {
            let mut rng = StdRng::seed_from_u64(move_rng.borrow_mut().gen());
            Ok(move |agent: &mut A| agent.move_by(rng.gen_range(-1.0..=1.0)))
        });
        registry.register_action("RandomFire", &[], move |_| {
            let mut rng = StdRng::seed_from_u64(rng.borrow_mut().gen());
            Ok(move |agent: &mut A| agent.fire(rng.gen_range(0.0..=1.0)))
        });
        registry.register_service(PERCEPTION_SERVICE, |agent: &mut A, blackboard| {
            update_perception(&*agent, blackboard)
        });
        registry
    }

    /// Perception service around a selector: act when aimed, otherwise turn
    /// toward the side the target is on.
    fn tracking<A: Tank + 'static>(
        &self,
        aimed: Box<dyn BehaviorNode<A>>,
    ) -> Box<dyn BehaviorNode<A>> {
        let p = &self.params;
        let selector = Selector::new(vec![
            p.aim.condition(RestartPolicy::ImmediateRestart, aimed).boxed(),
            BlackboardCondition::new(
                *TARGET_ON_RIGHT,
                Operator::Equal,
                true,
                RestartPolicy::ImmediateRestart,
                turn(p.turn_rate),
            )
            .boxed(),
            turn(-p.turn_rate),
        ]);
        Service::new(
            p.perception_interval,
            |agent: &mut A, blackboard| update_perception(&*agent, blackboard),
            selector.boxed(),
        )
        .with_label("Service(perception)")
        .boxed()
    }
}

/// A generator of its own for every random action, so that building more trees
/// does not change what the existing ones draw.
fn fork(rng: &mut StdRng) -> StdRng {
    StdRng::seed_from_u64(rng.gen())
}

fn turn<A: Actuator + 'static>(amount: f32) -> Box<dyn BehaviorNode<A>> {
    Action::new("Turn", move |agent: &mut A| agent.turn(amount)).boxed()
}

fn move_by<A: Actuator + 'static>(amount: f32) -> Box<dyn BehaviorNode<A>> {
    Action::new("Move", move |agent: &mut A| agent.move_by(amount)).boxed()
}

fn fire<A: Actuator + 'static>(amount: f32) -> Box<dyn BehaviorNode<A>> {
    Action::new("Fire", move |agent: &mut A| agent.fire(amount)).boxed()
}

fn random_move<A: Actuator + 'static>(mut rng: StdRng) -> Box<dyn BehaviorNode<A>> {
    Action::new("RandomMove", move |agent: &mut A| {
        agent.move_by(rng.gen_range(-1.0..=1.0))
    })
    .boxed()
}

fn random_fire<A: Actuator + 'static>(mut rng: StdRng) -> Box<dyn BehaviorNode<A>> {
    Action::new("RandomFire", move |agent: &mut A| {
        agent.fire(rng.gen_range(0.0..=1.0))
    })
    .boxed()
}
