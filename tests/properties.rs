use proptest::prelude::*;
use reactive_behavior_tree::{
    BehaviorNode, BehaviorResult, Blackboard, BlackboardValue, Context, Root, Selector, Sequence,
    Service, Status, Wait,
};
use std::time::Duration;

/// Which children were started and ticked, by index.
#[derive(Default)]
struct Trace {
    started: Vec<usize>,
    ticked: Vec<usize>,
    service_calls: u64,
}

struct Scripted {
    index: usize,
    result: BehaviorResult,
    status: Status,
}

impl Scripted {
    fn boxed_all(results: &[BehaviorResult]) -> Vec<Box<dyn BehaviorNode<Trace>>> {
        results
            .iter()
            .enumerate()
            .map(|(index, &result)| {
                Scripted {
                    index,
                    result,
                    status: Status::Inactive,
                }
                .boxed()
            })
            .collect()
    }
}

impl BehaviorNode<Trace> for Scripted {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, ctx: &mut Context<Trace>) {
        if self.status == Status::Inactive {
            ctx.agent.started.push(self.index);
            self.status = Status::Running;
        }
    }

    fn tick(&mut self, ctx: &mut Context<Trace>) -> BehaviorResult {
        self.start(ctx);
        ctx.agent.ticked.push(self.index);
        self.status = self.result.into();
        self.result
    }

    fn stop(&mut self, _ctx: &mut Context<Trace>) {
        self.status = Status::Inactive;
    }
}

fn run_once(node: Box<dyn BehaviorNode<Trace>>) -> (Status, Trace) {
    let mut root = Root::new(node).unwrap();
    let mut trace = Trace::default();
    root.start(&mut trace);
    root.tick(&mut trace);
    (root.status(), trace)
}

fn terminal() -> impl Strategy<Value = BehaviorResult> {
    prop_oneof![Just(BehaviorResult::Success), Just(BehaviorResult::Fail)]
}

proptest! {
    #[test]
    fn sequence_of_successes(n in 0usize..20) {
        let children = Scripted::boxed_all(&vec![BehaviorResult::Success; n]);
        let (status, trace) = run_once(Sequence::new(children).boxed());
        prop_assert_eq!(status, Status::Succeeded);
        prop_assert_eq!(trace.ticked, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn sequence_short_circuits(results in prop::collection::vec(terminal(), 1..20)) {
        let (status, trace) = run_once(Sequence::new(Scripted::boxed_all(&results)).boxed());
        match results.iter().position(|res| *res == BehaviorResult::Fail) {
            Some(k) => {
                prop_assert_eq!(status, Status::Failed);
                prop_assert_eq!(trace.started, (0..=k).collect::<Vec<_>>());
            }
            None => prop_assert_eq!(status, Status::Succeeded),
        }
    }

    #[test]
    fn selector_picks_first_success(results in prop::collection::vec(terminal(), 0..20)) {
        let (status, trace) = run_once(Selector::new(Scripted::boxed_all(&results)).boxed());
        match results.iter().position(|res| *res == BehaviorResult::Success) {
            Some(k) => {
                prop_assert_eq!(status, Status::Succeeded);
                prop_assert_eq!(trace.started, (0..=k).collect::<Vec<_>>());
            }
            None => {
                prop_assert_eq!(status, Status::Failed);
                prop_assert_eq!(trace.started.len(), results.len());
            }
        }
    }

    #[test]
    fn wait_runs_until_elapsed(wait_ms in 0u64..5000, elapsed_ms in 0u64..5000) {
        let mut root = Root::new(Wait::new(Duration::from_millis(wait_ms)).boxed()).unwrap();
        let mut trace = Trace::default();
        root.start(&mut trace);
        root.tick(&mut trace);
        root.advance(&mut trace, Duration::from_millis(elapsed_ms));
        // A zero wait finishes on the first tick and restarts on the next
        if wait_ms > 0 {
            root.tick(&mut trace);
            let expected = if elapsed_ms < wait_ms { Status::Running } else { Status::Succeeded };
            prop_assert_eq!(root.status(), expected);
        }
    }

    #[test]
    fn service_cadence_ignores_ticks(
        interval_ms in 1u64..500,
        total_ms in 0u64..5000,
        ticks in 1u32..50,
    ) {
        let service = Service::new(
            Duration::from_millis(interval_ms),
            |trace: &mut Trace, _: &mut Blackboard| trace.service_calls += 1,
            Wait::new(Duration::from_secs(3600)).boxed(),
        );
        let mut root = Root::new(service.boxed()).unwrap();
        let mut trace = Trace::default();
        root.start(&mut trace);
        let total = Duration::from_millis(total_ms);
        let step = total / ticks;
        for _ in 0..ticks {
            root.update(&mut trace, step);
        }
        let elapsed = step * ticks;
        let interval = Duration::from_millis(interval_ms).as_nanos() as u64;
        let expected = 1 + elapsed.as_nanos() as u64 / interval;
        prop_assert_eq!(trace.service_calls, expected);
    }

    #[test]
    fn blackboard_round_trip(number in -1e9f64..1e9, flag: bool, text in "[a-z]{0,12}") {
        let mut bb = Blackboard::new();
        bb.set("number", number);
        bb.set("flag", flag);
        bb.set("text", text.as_str());
        prop_assert_eq!(bb.get("number"), Some(&BlackboardValue::Number(number)));
        prop_assert_eq!(bb.get_bool("flag"), flag);
        prop_assert_eq!(bb.get_text("text"), Some(text.as_str()));
    }
}
